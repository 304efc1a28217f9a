use std::fmt;

use serde::{Deserialize, Serialize};

pub const BOARD_SIZE: u8 = 8;

/// Side of the board. White moves first and advances toward row 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Self {
        match self {
            Self::White => Self::Black,
            Self::Black => Self::White,
        }
    }

    /// Row on which a man of this color is promoted.
    pub fn promotion_row(self) -> u8 {
        match self {
            Self::White => 0,
            Self::Black => BOARD_SIZE - 1,
        }
    }

    /// Row delta of a forward step.
    pub fn forward(self) -> i32 {
        match self {
            Self::White => -1,
            Self::Black => 1,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::White => 0,
            Self::Black => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::White => write!(f, "white"),
            Self::Black => write!(f, "black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Man,
    King,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub kind: PieceKind,
}

impl Piece {
    pub const WHITE_MAN: Piece = Piece::new(Color::White, PieceKind::Man);
    pub const BLACK_MAN: Piece = Piece::new(Color::Black, PieceKind::Man);
    pub const WHITE_KING: Piece = Piece::new(Color::White, PieceKind::King);
    pub const BLACK_KING: Piece = Piece::new(Color::Black, PieceKind::King);

    pub const fn new(color: Color, kind: PieceKind) -> Self {
        Self { color, kind }
    }

    pub fn is_king(self) -> bool {
        self.kind == PieceKind::King
    }

    /// Cell code used by [`GameState::cells`]: 1 white man, 2 black man,
    /// 3 white king, 4 black king.
    pub fn code(self) -> u8 {
        match (self.color, self.kind) {
            (Color::White, PieceKind::Man) => 1,
            (Color::Black, PieceKind::Man) => 2,
            (Color::White, PieceKind::King) => 3,
            (Color::Black, PieceKind::King) => 4,
        }
    }
}

/// Result of probing a coordinate. Click handlers probe arbitrary input, so
/// out-of-range coordinates map to `OffBoard` instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Square {
    OffBoard,
    Empty,
    Occupied(Piece),
}

impl Square {
    pub fn piece(self) -> Option<Piece> {
        match self {
            Self::Occupied(piece) => Some(piece),
            _ => None,
        }
    }
}

/// A board coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    pub fn is_on_board(self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }

    /// Dark squares are the only ones pieces ever stand on.
    pub fn is_dark(self) -> bool {
        (u16::from(self.row) + u16::from(self.col)) % 2 == 1
    }

    pub(crate) fn index(self) -> usize {
        self.row as usize * BOARD_SIZE as usize + self.col as usize
    }

    pub(crate) fn from_index(idx: usize) -> Self {
        Self::new(
            (idx / BOARD_SIZE as usize) as u8,
            (idx % BOARD_SIZE as usize) as u8,
        )
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One step of a turn. A multi-jump is a sequence of capturing moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: Position,
    pub to: Position,
    pub is_capture: bool,
}

impl Move {
    pub const fn new(from: Position, to: Position, is_capture: bool) -> Self {
        Self {
            from,
            to,
            is_capture,
        }
    }

    pub fn target(&self) -> Target {
        Target {
            to: self.to,
            is_capture: self.is_capture,
        }
    }
}

/// Destination offered to the player after selecting a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub to: Position,
    pub is_capture: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinCause {
    /// The loser has no pieces left.
    Elimination,
    /// The loser is to move and has no legal move.
    NoMoves,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOver {
    pub winner: Color,
    pub cause: WinCause,
}

/// Display token of one grid cell. Overlays (`Selected`, `MoveTarget`,
/// `CaptureTarget`) take priority over what stands on the cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderToken {
    EmptyDark,
    EmptyLight,
    WhiteMan,
    BlackMan,
    WhiteKing,
    BlackKing,
    Selected,
    MoveTarget,
    CaptureTarget,
}

impl RenderToken {
    pub fn for_piece(piece: Piece) -> Self {
        match (piece.color, piece.kind) {
            (Color::White, PieceKind::Man) => Self::WhiteMan,
            (Color::Black, PieceKind::Man) => Self::BlackMan,
            (Color::White, PieceKind::King) => Self::WhiteKing,
            (Color::Black, PieceKind::King) => Self::BlackKing,
        }
    }

    /// The piece a token depicts. Overlays and empty cells depict none.
    pub fn piece(self) -> Option<Piece> {
        match self {
            Self::WhiteMan => Some(Piece::WHITE_MAN),
            Self::BlackMan => Some(Piece::BLACK_MAN),
            Self::WhiteKing => Some(Piece::WHITE_KING),
            Self::BlackKing => Some(Piece::BLACK_KING),
            _ => None,
        }
    }
}

pub type RenderGrid = [[RenderToken; BOARD_SIZE as usize]; BOARD_SIZE as usize];

/// Serialisable board snapshot handed to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameState {
    /// Contract: 64 cells row-major, 0 empty, otherwise [`Piece::code`].
    pub cells: Vec<u8>,
    pub current_player: Color,
    pub white_count: u8,
    pub black_count: u8,
    /// Square that must keep capturing before the turn can pass.
    pub forced_continuation: Option<Position>,
    pub mandatory_captures: bool,
    pub game_over: Option<GameOver>,
}
