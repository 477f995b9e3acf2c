//! The board representation: bitboards, material counts, repetition
//! tracking and the incrementally maintained Zobrist hash, plus
//! make/unmake.

use std::collections::HashMap;

use crate::attack_tables::{bishop_attacks, king_attacks, knight_attacks, pawn_attacks, rook_attacks};
use crate::bitboard::{bb, is_light_square, Bitboard};
use crate::error::EngineError;
use crate::types::{castle, Color, FrozenState, GameResult, Move, MoveKind, Piece, PieceType, Square};
use crate::zobrist;

/// Material counts, split by color and by `{pawn, knight, light-squared
/// bishop, dark-squared bishop, rook, queen}`. Kings are never counted.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub struct Material {
    counts: [[u8; 6]; 2],
}

const SLOT_PAWN: usize = 0;
const SLOT_KNIGHT: usize = 1;
const SLOT_LIGHT_BISHOP: usize = 2;
const SLOT_DARK_BISHOP: usize = 3;
const SLOT_ROOK: usize = 4;
const SLOT_QUEEN: usize = 5;

fn material_slot(kind: PieceType, sq: Square) -> Option<usize> {
    match kind {
        PieceType::Pawn => Some(SLOT_PAWN),
        PieceType::Knight => Some(SLOT_KNIGHT),
        PieceType::Bishop => Some(if is_light_square(sq) {
            SLOT_LIGHT_BISHOP
        } else {
            SLOT_DARK_BISHOP
        }),
        PieceType::Rook => Some(SLOT_ROOK),
        PieceType::Queen => Some(SLOT_QUEEN),
        PieceType::King => None,
    }
}

impl Material {
    pub fn count(&self, color: Color, slot: usize) -> u8 {
        self.counts[color.index()][slot]
    }

    fn add(&mut self, color: Color, kind: PieceType, sq: Square) {
        if let Some(slot) = material_slot(kind, sq) {
            self.counts[color.index()][slot] += 1;
        }
    }

    fn remove(&mut self, color: Color, kind: PieceType, sq: Square) {
        if let Some(slot) = material_slot(kind, sq) {
            self.counts[color.index()][slot] -= 1;
        }
    }

    /// True for the four drawn-by-insufficient-material configurations:
    /// bare kings, king+knight vs king, king+bishop vs king, and
    /// king+bishop vs king+bishop with same-colored bishops.
    pub fn is_insufficient_for_mate(&self) -> bool {
        let w = self.counts[Color::White.index()];
        let b = self.counts[Color::Black.index()];
        let w_minor = w[SLOT_KNIGHT] + w[SLOT_LIGHT_BISHOP] + w[SLOT_DARK_BISHOP];
        let b_minor = b[SLOT_KNIGHT] + b[SLOT_LIGHT_BISHOP] + b[SLOT_DARK_BISHOP];
        let w_major = w[SLOT_PAWN] + w[SLOT_ROOK] + w[SLOT_QUEEN];
        let b_major = b[SLOT_PAWN] + b[SLOT_ROOK] + b[SLOT_QUEEN];
        if w_major > 0 || b_major > 0 {
            return false;
        }
        match (w_minor, b_minor) {
            (0, 0) => true,
            (1, 0) => w[SLOT_KNIGHT] <= 1 && w[SLOT_LIGHT_BISHOP] + w[SLOT_DARK_BISHOP] <= 1,
            (0, 1) => b[SLOT_KNIGHT] <= 1 && b[SLOT_LIGHT_BISHOP] + b[SLOT_DARK_BISHOP] <= 1,
            (1, 1) => {
                (w[SLOT_LIGHT_BISHOP] == 1 && b[SLOT_LIGHT_BISHOP] == 1)
                    || (w[SLOT_DARK_BISHOP] == 1 && b[SLOT_DARK_BISHOP] == 1)
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct Position {
    pieces: [[Bitboard; 6]; 2],
    occ: [Bitboard; 2],
    occ_all: Bitboard,
    board: [Piece; 64],
    side_to_move: Color,
    castling_rights: u8,
    en_passant: Option<Square>,
    halfmove_clock: u16,
    fullmove_number: u32,
    ply: u32,
    hash: u64,
    material: Material,
    repetitions: HashMap<u64, u8>,
    result: GameResult,
}

fn castling_rook_squares(king_dest: Square) -> (Square, Square) {
    match king_dest.index() {
        6 => (Square(7), Square(5)),   // white kingside: h1 -> f1
        2 => (Square(0), Square(3)),   // white queenside: a1 -> d1
        62 => (Square(63), Square(61)), // black kingside: h8 -> f8
        58 => (Square(56), Square(59)), // black queenside: a8 -> d8
        _ => unreachable!("castling move must land on c1/g1/c8/g8"),
    }
}

impl Position {
    pub fn empty() -> Self {
        Position {
            pieces: [[0; 6]; 2],
            occ: [0; 2],
            occ_all: 0,
            board: [Piece::EMPTY; 64],
            side_to_move: Color::White,
            castling_rights: 0,
            en_passant: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            ply: 0,
            hash: 0,
            material: Material::default(),
            repetitions: HashMap::new(),
            result: GameResult::InProgress,
        }
    }

    pub fn startpos() -> Self {
        Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
            .expect("startpos FEN is well-formed")
    }

    pub fn side_to_move(&self) -> Color {
        self.side_to_move
    }

    pub fn castling_rights(&self) -> u8 {
        self.castling_rights
    }

    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    pub fn halfmove_clock(&self) -> u16 {
        self.halfmove_clock
    }

    pub fn fullmove_number(&self) -> u32 {
        self.fullmove_number
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn hash(&self) -> u64 {
        self.hash
    }

    pub fn result(&self) -> GameResult {
        self.result
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn occupied(&self) -> Bitboard {
        self.occ_all
    }

    pub fn color_occupied(&self, color: Color) -> Bitboard {
        self.occ[color.index()]
    }

    pub fn piece_bitboard(&self, color: Color, kind: PieceType) -> Bitboard {
        self.pieces[color.index()][kind.index()]
    }

    pub fn piece_at(&self, sq: Square) -> Piece {
        self.board[sq.index()]
    }

    pub fn king_square(&self, color: Color) -> Square {
        let bb = self.pieces[color.index()][PieceType::King.index()];
        debug_assert_ne!(bb, 0, "every position must have exactly one king per side");
        Square(bb.trailing_zeros() as u8)
    }

    /// Recomputes the hash from scratch. Used to check [`Position::hash`]
    /// stays in sync with incremental updates.
    pub fn compute_hash_from_scratch(&self) -> u64 {
        let mut hash = 0u64;
        for idx in 0..64u8 {
            hash ^= zobrist::piece_key(Square(idx), self.board[idx as usize]);
        }
        if let Some(ep) = self.en_passant {
            hash ^= zobrist::ep_key(ep);
        }
        hash ^= zobrist::castle_rights_key(self.castling_rights);
        hash ^= zobrist::turn_key(self.side_to_move);
        hash
    }

    fn place(&mut self, sq: Square, piece: Piece) {
        debug_assert!(self.board[sq.index()].is_empty(), "placing onto an occupied square");
        if let Some((kind, color)) = piece.0 {
            self.pieces[color.index()][kind.index()] |= bb(sq);
            self.occ[color.index()] |= bb(sq);
            self.occ_all |= bb(sq);
            self.material.add(color, kind, sq);
            self.hash ^= zobrist::piece_key(sq, piece);
        }
        self.board[sq.index()] = piece;
    }

    fn remove(&mut self, sq: Square) -> Piece {
        let piece = self.board[sq.index()];
        if let Some((kind, color)) = piece.0 {
            self.pieces[color.index()][kind.index()] &= !bb(sq);
            self.occ[color.index()] &= !bb(sq);
            self.occ_all &= !bb(sq);
            self.material.remove(color, kind, sq);
            self.hash ^= zobrist::piece_key(sq, piece);
        }
        self.board[sq.index()] = Piece::EMPTY;
        piece
    }

    fn recompute_result(&self) -> GameResult {
        if self.material.is_insufficient_for_mate() {
            GameResult::DrawByMaterial
        } else if self.halfmove_clock >= 50 {
            GameResult::DrawByFiftyMove
        } else if self.repetitions.get(&self.hash).copied().unwrap_or(0) >= 3 {
            GameResult::DrawByRepetition
        } else {
            GameResult::InProgress
        }
    }

    fn turn_toggle() -> u64 {
        zobrist::turn_key(Color::White) ^ zobrist::turn_key(Color::Black)
    }

    fn new_castling_rights(&self, moving: Piece, from: Square, to: Square, is_castle: bool) -> u8 {
        let mut rights = self.castling_rights;
        if is_castle || moving.kind() == Some(PieceType::King) {
            match moving.color() {
                Some(Color::White) => rights &= !(castle::WHITE_KINGSIDE | castle::WHITE_QUEENSIDE),
                Some(Color::Black) => rights &= !(castle::BLACK_KINGSIDE | castle::BLACK_QUEENSIDE),
                None => {}
            }
        }
        for sq in [from, to] {
            match sq.index() {
                0 => rights &= !castle::WHITE_QUEENSIDE,
                7 => rights &= !castle::WHITE_KINGSIDE,
                56 => rights &= !castle::BLACK_QUEENSIDE,
                63 => rights &= !castle::BLACK_KINGSIDE,
                _ => {}
            }
        }
        rights
    }

    /// Applies `mv`, returning the pre-move [`FrozenState`] and the piece
    /// captured by the move (empty if none), both of which `unmake_move`
    /// needs to restore the position exactly.
    pub fn make_move(&mut self, mv: Move) -> (FrozenState, Piece) {
        let old_frozen = FrozenState {
            castling_rights: self.castling_rights,
            en_passant: self.en_passant,
            halfmove_clock: self.halfmove_clock,
        };

        let from = mv.from_sq();
        let to = mv.to_sq();
        let mover_color = self.side_to_move;
        let moving_piece = self.piece_at(from);
        let is_castle = mv.kind() == MoveKind::Castling;

        let captured = match mv.kind() {
            MoveKind::EnPassant => {
                let captured_sq = Square::from_rank_file(from.rank(), to.file());
                self.piece_at(captured_sq)
            }
            MoveKind::Castling => Piece::EMPTY,
            MoveKind::Normal | MoveKind::Promotion => self.piece_at(to),
        };

        let gives_double_push = moving_piece.kind() == Some(PieceType::Pawn)
            && (to.rank() as i8 - from.rank() as i8).abs() == 2;
        let new_ep = gives_double_push
            .then(|| Square::from_rank_file((from.rank() + to.rank()) / 2, from.file()));

        let new_halfmove = if moving_piece.kind() == Some(PieceType::Pawn) || !captured.is_empty() {
            0
        } else {
            old_frozen.halfmove_clock + 1
        };

        let new_rights = self.new_castling_rights(moving_piece, from, to, is_castle);

        match mv.kind() {
            MoveKind::Normal => {
                if !captured.is_empty() {
                    self.remove(to);
                }
                let p = self.remove(from);
                self.place(to, p);
            }
            MoveKind::EnPassant => {
                let captured_sq = Square::from_rank_file(from.rank(), to.file());
                self.remove(captured_sq);
                let p = self.remove(from);
                self.place(to, p);
            }
            MoveKind::Promotion => {
                if !captured.is_empty() {
                    self.remove(to);
                }
                self.remove(from);
                let promoted = mv.promotion().expect("promotion move must carry a promotion piece");
                self.place(to, Piece::new(promoted, mover_color));
            }
            MoveKind::Castling => {
                let p = self.remove(from);
                self.place(to, p);
                let (rook_from, rook_to) = castling_rook_squares(to);
                let rook = self.remove(rook_from);
                self.place(rook_to, rook);
            }
        }

        if let Some(ep) = old_frozen.en_passant {
            self.hash ^= zobrist::ep_key(ep);
        }
        if let Some(ep) = new_ep {
            self.hash ^= zobrist::ep_key(ep);
        }
        self.hash ^= zobrist::castle_rights_key(old_frozen.castling_rights);
        self.hash ^= zobrist::castle_rights_key(new_rights);
        self.hash ^= Self::turn_toggle();

        self.castling_rights = new_rights;
        self.en_passant = new_ep;
        self.halfmove_clock = new_halfmove;
        self.side_to_move = mover_color.other();
        self.ply += 1;
        if mover_color == Color::Black {
            self.fullmove_number += 1;
        }

        *self.repetitions.entry(self.hash).or_insert(0) += 1;
        self.result = self.recompute_result();

        (old_frozen, captured)
    }

    /// Undoes `mv`, given the [`FrozenState`] and captured piece
    /// `make_move` returned for it. Must be called with the same `mv` in
    /// strict LIFO order relative to `make_move` calls.
    pub fn unmake_move(&mut self, mv: Move, frozen: FrozenState, captured: Piece) {
        if let Some(count) = self.repetitions.get_mut(&self.hash) {
            *count -= 1;
            if *count == 0 {
                self.repetitions.remove(&self.hash);
            }
        }

        self.hash ^= Self::turn_toggle();
        self.side_to_move = self.side_to_move.other();
        self.ply -= 1;
        if self.side_to_move == Color::Black {
            self.fullmove_number -= 1;
        }

        let mover_color = self.side_to_move;
        let from = mv.from_sq();
        let to = mv.to_sq();

        match mv.kind() {
            MoveKind::Normal => {
                let p = self.remove(to);
                self.place(from, p);
                if !captured.is_empty() {
                    self.place(to, captured);
                }
            }
            MoveKind::EnPassant => {
                let p = self.remove(to);
                self.place(from, p);
                let captured_sq = Square::from_rank_file(from.rank(), to.file());
                self.place(captured_sq, captured);
            }
            MoveKind::Promotion => {
                self.remove(to);
                self.place(from, Piece::new(PieceType::Pawn, mover_color));
                if !captured.is_empty() {
                    self.place(to, captured);
                }
            }
            MoveKind::Castling => {
                let (rook_from, rook_to) = castling_rook_squares(to);
                let rook = self.remove(rook_to);
                self.place(rook_from, rook);
                let p = self.remove(to);
                self.place(from, p);
            }
        }

        self.hash ^= zobrist::castle_rights_key(self.castling_rights);
        self.hash ^= zobrist::castle_rights_key(frozen.castling_rights);
        if let Some(ep) = self.en_passant {
            self.hash ^= zobrist::ep_key(ep);
        }
        if let Some(ep) = frozen.en_passant {
            self.hash ^= zobrist::ep_key(ep);
        }

        self.castling_rights = frozen.castling_rights;
        self.en_passant = frozen.en_passant;
        self.halfmove_clock = frozen.halfmove_clock;
        self.result = self.recompute_result();
    }

    /// True iff a piece of `attacker_color` attacks `sq` in the current
    /// position.
    pub fn is_square_attacked(&self, attacker_color: Color, sq: Square) -> bool {
        let pawns = self.pieces[attacker_color.index()][PieceType::Pawn.index()];
        if pawn_attacks(attacker_color.other(), sq) & pawns != 0 {
            return true;
        }
        let knights = self.pieces[attacker_color.index()][PieceType::Knight.index()];
        if knight_attacks(sq) & knights != 0 {
            return true;
        }
        let king = self.pieces[attacker_color.index()][PieceType::King.index()];
        if king_attacks(sq) & king != 0 {
            return true;
        }
        let bishops_queens = self.pieces[attacker_color.index()][PieceType::Bishop.index()]
            | self.pieces[attacker_color.index()][PieceType::Queen.index()];
        if bishop_attacks(self.occ_all, sq) & bishops_queens != 0 {
            return true;
        }
        let rooks_queens = self.pieces[attacker_color.index()][PieceType::Rook.index()]
            | self.pieces[attacker_color.index()][PieceType::Queen.index()];
        if rook_attacks(self.occ_all, sq) & rooks_queens != 0 {
            return true;
        }
        false
    }

    pub fn in_check(&self, color: Color) -> bool {
        self.is_square_attacked(color.other(), self.king_square(color))
    }

    pub fn from_fen(fen: &str) -> Result<Position, EngineError> {
        let fields: Vec<&str> = fen.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(EngineError::InvalidFen {
                field: "fen",
                value: fen.to_string(),
            });
        }

        let mut pos = Position::empty();

        let ranks: Vec<&str> = fields[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(EngineError::InvalidFen {
                field: "placement",
                value: fields[0].to_string(),
            });
        }
        for (rank_from_top, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - rank_from_top as u8;
            let mut file = 0u8;
            for c in rank_str.chars() {
                if let Some(skip) = c.to_digit(10) {
                    file += skip as u8;
                } else if let Some((kind, color)) = PieceType::from_char(c) {
                    if file >= 8 {
                        return Err(EngineError::InvalidFen {
                            field: "placement",
                            value: fields[0].to_string(),
                        });
                    }
                    pos.place(Square::from_rank_file(rank, file), Piece::new(kind, color));
                    file += 1;
                } else {
                    return Err(EngineError::InvalidFen {
                        field: "placement",
                        value: fields[0].to_string(),
                    });
                }
            }
        }

        pos.side_to_move = match fields[1] {
            "w" => Color::White,
            "b" => Color::Black,
            other => {
                return Err(EngineError::InvalidFen {
                    field: "side to move",
                    value: other.to_string(),
                })
            }
        };

        let mut rights = 0u8;
        if fields[2] != "-" {
            for c in fields[2].chars() {
                rights |= match c {
                    'K' => castle::WHITE_KINGSIDE,
                    'Q' => castle::WHITE_QUEENSIDE,
                    'k' => castle::BLACK_KINGSIDE,
                    'q' => castle::BLACK_QUEENSIDE,
                    other => {
                        return Err(EngineError::InvalidFen {
                            field: "castle rights",
                            value: other.to_string(),
                        })
                    }
                };
            }
        }
        pos.castling_rights = rights;

        pos.en_passant = if fields[3] == "-" {
            None
        } else {
            Some(Square::from_algebraic(fields[3]).ok_or_else(|| EngineError::InvalidFen {
                field: "en passant",
                value: fields[3].to_string(),
            })?)
        };

        pos.halfmove_clock = fields
            .get(4)
            .unwrap_or(&"0")
            .parse()
            .map_err(|_| EngineError::InvalidFen {
                field: "halfmove clock",
                value: fields.get(4).unwrap_or(&"0").to_string(),
            })?;
        pos.fullmove_number = fields
            .get(5)
            .unwrap_or(&"1")
            .parse()
            .map_err(|_| EngineError::InvalidFen {
                field: "fullmove number",
                value: fields.get(5).unwrap_or(&"1").to_string(),
            })?;
        pos.ply = 2 * pos.fullmove_number.saturating_sub(1)
            + if pos.side_to_move == Color::Black { 1 } else { 0 };

        pos.hash = pos.compute_hash_from_scratch();
        pos.repetitions.insert(pos.hash, 1);
        pos.result = pos.recompute_result();

        Ok(pos)
    }

    pub fn to_fen(&self) -> String {
        let mut placement = String::new();
        for rank_from_top in 0..8u8 {
            let rank = 7 - rank_from_top;
            let mut empty_run = 0u8;
            for file in 0..8u8 {
                let piece = self.piece_at(Square::from_rank_file(rank, file));
                match piece.0 {
                    None => empty_run += 1,
                    Some((kind, color)) => {
                        if empty_run > 0 {
                            placement.push_str(&empty_run.to_string());
                            empty_run = 0;
                        }
                        placement.push(kind.to_char(color));
                    }
                }
            }
            if empty_run > 0 {
                placement.push_str(&empty_run.to_string());
            }
            if rank_from_top != 7 {
                placement.push('/');
            }
        }

        let side = if self.side_to_move == Color::White { "w" } else { "b" };

        let mut rights = String::new();
        if self.castling_rights & castle::WHITE_KINGSIDE != 0 {
            rights.push('K');
        }
        if self.castling_rights & castle::WHITE_QUEENSIDE != 0 {
            rights.push('Q');
        }
        if self.castling_rights & castle::BLACK_KINGSIDE != 0 {
            rights.push('k');
        }
        if self.castling_rights & castle::BLACK_QUEENSIDE != 0 {
            rights.push('q');
        }
        if rights.is_empty() {
            rights.push('-');
        }

        let ep = match self.en_passant {
            Some(sq) => sq.to_string(),
            None => "-".to_string(),
        };

        format!(
            "{placement} {side} {rights} {ep} {} {}",
            self.halfmove_clock, self.fullmove_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_round_trips_through_fen() {
        let pos = Position::startpos();
        assert_eq!(
            pos.to_fen(),
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1"
        );
    }

    #[test]
    fn startpos_hash_matches_scratch_computation() {
        let pos = Position::startpos();
        assert_eq!(pos.hash(), pos.compute_hash_from_scratch());
    }

    #[test]
    fn bare_kings_are_insufficient_material() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/4K3/8 w - - 0 1").unwrap();
        assert_eq!(pos.result(), GameResult::DrawByMaterial);
    }

    #[test]
    fn same_colored_bishops_are_insufficient_material() {
        let pos = Position::from_fen("8/8/8/4k3/2b5/8/4K1B1/8 w - - 0 1").unwrap();
        assert_eq!(pos.result(), GameResult::DrawByMaterial);
    }

    #[test]
    fn opposite_colored_bishops_are_not_insufficient_material() {
        let pos = Position::from_fen("8/8/8/4k3/2b5/8/3K3B/8 w - - 0 1").unwrap();
        assert_eq!(pos.result(), GameResult::InProgress);
    }
}
