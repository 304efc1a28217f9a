//! Move generation and the forced-capture policy.

use crate::board::Board;
use crate::types::{Color, Move, Position, Square, Target};

const DIAGONALS: [(i32, i32); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

impl Board {
    /// Returns every geometrically legal move of the piece on `pos`, without
    /// the player-wide forced-capture filter. Empty or off-board squares have
    /// no moves.
    pub fn moves_for(&self, pos: Position) -> Vec<Move> {
        let Some(piece) = self.square(pos).piece() else {
            return Vec::new();
        };

        let mut moves = Vec::new();
        if piece.is_king() {
            self.collect_king_moves(pos, piece.color, &mut moves);
        } else {
            self.collect_man_moves(pos, piece.color, &mut moves);
        }
        moves
    }

    /// Returns the legal moves of `color`.
    ///
    /// During a multi-jump only the captures of the jumping piece are legal,
    /// whatever `color` says. Otherwise, with mandatory captures on, any
    /// available capture hides every quiet move; with it off, captures and
    /// quiet moves are returned together.
    pub fn all_moves(&self, color: Color) -> Vec<Move> {
        if let Some(pos) = self.forced_continuation() {
            return self
                .moves_for(pos)
                .into_iter()
                .filter(|mv| mv.is_capture)
                .collect();
        }

        let moves: Vec<Move> = self
            .pieces(color)
            .flat_map(|pos| self.moves_for(pos))
            .collect();

        if self.mandatory_captures() && moves.iter().any(|mv| mv.is_capture) {
            moves.into_iter().filter(|mv| mv.is_capture).collect()
        } else {
            moves
        }
    }

    /// Targets a player may pick after selecting the piece on `pos`. Empty
    /// when the piece is not the side to move's, or when another piece is in
    /// the middle of a multi-jump.
    pub fn selectable_moves(&self, pos: Position) -> Vec<Target> {
        match self.square(pos) {
            Square::Occupied(piece) if piece.color == self.current_player() => {}
            _ => return Vec::new(),
        }
        if self.forced_continuation().is_some_and(|forced| forced != pos) {
            return Vec::new();
        }

        let legal = self.all_moves(self.current_player());
        self.moves_for(pos)
            .into_iter()
            .filter(|mv| legal.contains(mv))
            .map(|mv| mv.target())
            .collect()
    }

    pub(crate) fn has_capture_from(&self, pos: Position) -> bool {
        self.moves_for(pos).iter().any(|mv| mv.is_capture)
    }

    /// Men step forward one square and capture by jumping an adjacent enemy
    /// in any of the four diagonal directions.
    fn collect_man_moves(&self, from: Position, color: Color, out: &mut Vec<Move>) {
        let (row, col) = (i32::from(from.row), i32::from(from.col));

        for d_col in [-1, 1] {
            let (r, c) = (row + color.forward(), col + d_col);
            if self.probe(r, c) == Square::Empty {
                out.push(Move::new(from, at(r, c), false));
            }
        }

        for (d_row, d_col) in DIAGONALS {
            let jumped = self.probe(row + d_row, col + d_col);
            let (r, c) = (row + 2 * d_row, col + 2 * d_col);
            let is_enemy = matches!(jumped, Square::Occupied(piece) if piece.color != color);
            if is_enemy && self.probe(r, c) == Square::Empty {
                out.push(Move::new(from, at(r, c), true));
            }
        }
    }

    /// Kings slide along empty diagonals. On each ray the first enemy piece
    /// may be jumped, landing on any empty square before the next piece.
    fn collect_king_moves(&self, from: Position, color: Color, out: &mut Vec<Move>) {
        let (row, col) = (i32::from(from.row), i32::from(from.col));

        for (d_row, d_col) in DIAGONALS {
            let (mut r, mut c) = (row + d_row, col + d_col);
            while self.probe(r, c) == Square::Empty {
                out.push(Move::new(from, at(r, c), false));
                r += d_row;
                c += d_col;
            }

            let blocker = self.probe(r, c);
            if !matches!(blocker, Square::Occupied(piece) if piece.color != color) {
                continue;
            }

            let (mut r, mut c) = (r + d_row, c + d_col);
            while self.probe(r, c) == Square::Empty {
                out.push(Move::new(from, at(r, c), true));
                r += d_row;
                c += d_col;
            }
        }
    }
}

/// Converts coordinates already checked by [`Board::probe`].
fn at(row: i32, col: i32) -> Position {
    Position::new(row as u8, col as u8)
}
