use crate::error::BoardError;
use crate::types::{
    BOARD_SIZE, Color, GameOver, GameState, Move, Piece, PieceKind, Position, RenderGrid,
    RenderToken, Square, Target, WinCause,
};

const BOARD_WIDTH: usize = BOARD_SIZE as usize;
const NUM_SQUARES: usize = BOARD_WIDTH * BOARD_WIDTH;
const START_ROWS: u8 = 3;

/// Checkers board state represented by three bitboards.
///
/// Besides occupancy the board carries the turn state: whose move it is and
/// whether a capturing piece must keep jumping before the turn passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Board {
    white: u64,
    black: u64,
    kings: u64,
    current_player: Color,
    forced_continuation: Option<Position>,
    mandatory_captures: bool,
}

impl Board {
    /// Creates the initial board: black men on rows 0-2, white men on rows
    /// 5-7, dark squares only. White moves first and captures are mandatory.
    pub fn new() -> Self {
        let mut white = 0u64;
        let mut black = 0u64;

        for pos in (0..NUM_SQUARES).map(Position::from_index) {
            if !pos.is_dark() {
                continue;
            }
            if pos.row < START_ROWS {
                black |= bit(pos.index());
            } else if pos.row >= BOARD_SIZE - START_ROWS {
                white |= bit(pos.index());
            }
        }

        Self::from_bitboards(white, black, 0, Color::White)
    }

    /// Builds an arbitrary position. `kings` marks which occupied squares
    /// hold kings.
    pub fn from_bitboards(white: u64, black: u64, kings: u64, current_player: Color) -> Self {
        debug_assert_eq!(white & black, 0, "a square cannot hold both colors");
        debug_assert_eq!(kings & !(white | black), 0, "kings must stand on occupied squares");

        Self {
            white,
            black,
            kings,
            current_player,
            forced_continuation: None,
            mandatory_captures: true,
        }
    }

    pub fn with_mandatory_captures(mut self, enabled: bool) -> Self {
        self.mandatory_captures = enabled;
        self
    }

    pub fn current_player(&self) -> Color {
        self.current_player
    }

    pub fn forced_continuation(&self) -> Option<Position> {
        self.forced_continuation
    }

    pub fn mandatory_captures(&self) -> bool {
        self.mandatory_captures
    }

    /// Returns what stands on `pos`, or [`Square::OffBoard`].
    pub fn square(&self, pos: Position) -> Square {
        if !pos.is_on_board() {
            return Square::OffBoard;
        }

        let square = bit(pos.index());
        let kind = if (self.kings & square) != 0 {
            PieceKind::King
        } else {
            PieceKind::Man
        };

        if (self.white & square) != 0 {
            Square::Occupied(Piece::new(Color::White, kind))
        } else if (self.black & square) != 0 {
            Square::Occupied(Piece::new(Color::Black, kind))
        } else {
            Square::Empty
        }
    }

    /// Signed-coordinate probe used while walking diagonals.
    pub(crate) fn probe(&self, row: i32, col: i32) -> Square {
        match to_position(row, col) {
            Some(pos) => self.square(pos),
            None => Square::OffBoard,
        }
    }

    /// Returns `(white_count, black_count)`.
    pub fn count(&self) -> (u8, u8) {
        (self.white.count_ones() as u8, self.black.count_ones() as u8)
    }

    /// Squares holding pieces of `color`, row-major.
    pub fn pieces(&self, color: Color) -> impl Iterator<Item = Position> + use<> {
        let mut bits = match color {
            Color::White => self.white,
            Color::Black => self.black,
        };

        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let idx = bits.trailing_zeros() as usize;
            bits &= bits - 1;
            Some(Position::from_index(idx))
        })
    }

    /// Applies a move the caller already knows to be legal and returns
    /// whether the same piece must keep capturing.
    ///
    /// Relocates the piece, removes the jumped piece, promotes on the far
    /// rank, then either holds the turn for a multi-jump or passes it.
    pub fn apply_move(&mut self, mv: Move) -> bool {
        let Some(piece) = self.square(mv.from).piece() else {
            debug_assert!(false, "apply_move from empty square {}", mv.from);
            return false;
        };

        self.put(mv.from, None);
        if mv.is_capture {
            self.remove_captured(mv, piece.color);
        }

        let landed = if piece.kind == PieceKind::Man && mv.to.row == piece.color.promotion_row() {
            Piece::new(piece.color, PieceKind::King)
        } else {
            piece
        };
        self.put(mv.to, Some(landed));

        if mv.is_capture && self.has_capture_from(mv.to) {
            self.forced_continuation = Some(mv.to);
            return true;
        }

        self.forced_continuation = None;
        self.current_player = self.current_player.opponent();
        false
    }

    /// Checks `mv` against the legal moves of the side to move, then applies it.
    pub fn try_apply(&mut self, mv: Move) -> Result<bool, BoardError> {
        for pos in [mv.from, mv.to] {
            if !pos.is_on_board() {
                return Err(BoardError::OffBoard(pos));
            }
        }
        if !self.all_moves(self.current_player).contains(&mv) {
            return Err(BoardError::IllegalMove(mv));
        }

        Ok(self.apply_move(mv))
    }

    /// Reports the result once a side has no pieces, or once the side to move
    /// has no legal move. The side not on move is never checked for mobility.
    pub fn is_over(&self) -> Option<GameOver> {
        let (white_count, black_count) = self.count();
        if white_count == 0 {
            return Some(GameOver {
                winner: Color::Black,
                cause: WinCause::Elimination,
            });
        }
        if black_count == 0 {
            return Some(GameOver {
                winner: Color::White,
                cause: WinCause::Elimination,
            });
        }

        if self.all_moves(self.current_player).is_empty() {
            return Some(GameOver {
                winner: self.current_player.opponent(),
                cause: WinCause::NoMoves,
            });
        }

        None
    }

    /// Maps every cell to a display token. A selected square and move targets
    /// are drawn over whatever occupies the cell.
    pub fn render_grid(&self, selected: Option<Position>, targets: &[Target]) -> RenderGrid {
        let mut grid = [[RenderToken::EmptyLight; BOARD_WIDTH]; BOARD_WIDTH];

        for (row, cells) in grid.iter_mut().enumerate() {
            for (col, cell) in cells.iter_mut().enumerate() {
                let pos = Position::new(row as u8, col as u8);
                *cell = if selected == Some(pos) {
                    RenderToken::Selected
                } else if let Some(target) = targets.iter().find(|t| t.to == pos) {
                    if target.is_capture {
                        RenderToken::CaptureTarget
                    } else {
                        RenderToken::MoveTarget
                    }
                } else {
                    match self.square(pos) {
                        Square::Occupied(piece) => RenderToken::for_piece(piece),
                        _ if pos.is_dark() => RenderToken::EmptyDark,
                        _ => RenderToken::EmptyLight,
                    }
                };
            }
        }

        grid
    }

    /// Rebuilds occupancy from a render grid. Overlay tokens carry no piece
    /// and read back as empty cells.
    pub fn from_render_grid(grid: &RenderGrid, current_player: Color) -> Self {
        let mut board = Self::from_bitboards(0, 0, 0, current_player);
        for (row, cells) in grid.iter().enumerate() {
            for (col, token) in cells.iter().enumerate() {
                board.put(Position::new(row as u8, col as u8), token.piece());
            }
        }
        board
    }

    /// Converts board to `[u8; 64]` where 0=empty, otherwise [`Piece::code`].
    pub fn to_array(&self) -> [u8; NUM_SQUARES] {
        let mut cells = [0u8; NUM_SQUARES];
        for (idx, cell) in cells.iter_mut().enumerate() {
            if let Some(piece) = self.square(Position::from_index(idx)).piece() {
                *cell = piece.code();
            }
        }
        cells
    }

    pub fn to_game_state(&self) -> GameState {
        let (white_count, black_count) = self.count();
        GameState {
            cells: self.to_array().to_vec(),
            current_player: self.current_player,
            white_count,
            black_count,
            forced_continuation: self.forced_continuation,
            mandatory_captures: self.mandatory_captures,
            game_over: self.is_over(),
        }
    }

    fn put(&mut self, pos: Position, piece: Option<Piece>) {
        let square = bit(pos.index());
        self.white &= !square;
        self.black &= !square;
        self.kings &= !square;

        let Some(piece) = piece else {
            return;
        };
        match piece.color {
            Color::White => self.white |= square,
            Color::Black => self.black |= square,
        }
        if piece.is_king() {
            self.kings |= square;
        }
    }

    /// Clears the single opposing piece strictly between `from` and `to`.
    fn remove_captured(&mut self, mv: Move, mover: Color) {
        let d_row = i32::from(mv.to.row) - i32::from(mv.from.row);
        let d_col = i32::from(mv.to.col) - i32::from(mv.from.col);
        debug_assert_eq!(d_row.abs(), d_col.abs(), "capture must follow a diagonal");

        let (step_row, step_col) = (d_row.signum(), d_col.signum());
        let mut captured = None;

        for step in 1..d_row.abs() {
            let row = i32::from(mv.from.row) + step * step_row;
            let col = i32::from(mv.from.col) + step * step_col;
            if let Square::Occupied(piece) = self.probe(row, col) {
                debug_assert_ne!(piece.color, mover, "capture path crosses an own piece");
                debug_assert!(captured.is_none(), "capture path crosses more than one piece");
                if captured.is_none() {
                    captured = to_position(row, col);
                }
            }
        }

        debug_assert!(captured.is_some(), "capture {} -> {} jumps nothing", mv.from, mv.to);
        if let Some(pos) = captured {
            self.put(pos, None);
        }
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

fn to_position(row: i32, col: i32) -> Option<Position> {
    let in_bounds =
        (0..BOARD_WIDTH as i32).contains(&row) && (0..BOARD_WIDTH as i32).contains(&col);
    in_bounds.then(|| Position::new(row as u8, col as u8))
}

#[cfg(test)]
impl Board {
    /// Parses eight rows of `.` empty, `w`/`b` men, `W`/`B` kings.
    pub(crate) fn from_diagram(rows: [&str; BOARD_WIDTH], current_player: Color) -> Self {
        let mut board = Self::from_bitboards(0, 0, 0, current_player);
        for (row, line) in rows.iter().enumerate() {
            assert_eq!(line.len(), BOARD_WIDTH, "row {row} must have 8 cells");
            for (col, ch) in line.chars().enumerate() {
                let piece = match ch {
                    'w' => Some(Piece::WHITE_MAN),
                    'b' => Some(Piece::BLACK_MAN),
                    'W' => Some(Piece::WHITE_KING),
                    'B' => Some(Piece::BLACK_KING),
                    _ => None,
                };
                board.put(Position::new(row as u8, col as u8), piece);
            }
        }
        board
    }
}
