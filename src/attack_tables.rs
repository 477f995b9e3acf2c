//! Precomputed attack bitboards, built once at process start.
//!
//! Leaper attacks (pawn, knight, king) are plain per-square lookup tables.
//! Sliding attacks (bishop, rook, queen) are looked up from four per-line
//! tables keyed by a line-local blocker byte, one family per ray direction
//! (rank, file, positive diagonal, negative diagonal) rather than by a full
//! per-square blocker mask. This keeps construction simple at the cost of a
//! little redundant memory; a magic-bitboard table could replace these four
//! families behind [`sliding_attacks`] without touching any caller.

use once_cell::sync::Lazy;

use crate::bitboard::{bb, Bitboard};
use crate::types::{Color, PieceType, Square};

const fn knight_deltas() -> [(i8, i8); 8] {
    [
        (1, 2),
        (2, 1),
        (2, -1),
        (1, -2),
        (-1, -2),
        (-2, -1),
        (-2, 1),
        (-1, 2),
    ]
}

const fn king_deltas() -> [(i8, i8); 8] {
    [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ]
}

fn leaper_attacks(deltas: [(i8, i8); 8]) -> [Bitboard; 64] {
    let mut table = [0u64; 64];
    for sq_idx in 0..64u8 {
        let sq = Square(sq_idx);
        let rank = sq.rank() as i8;
        let file = sq.file() as i8;
        let mut attacks = 0u64;
        for (dr, df) in deltas {
            let r = rank + dr;
            let f = file + df;
            if (0..8).contains(&r) && (0..8).contains(&f) {
                attacks |= bb(Square::from_rank_file(r as u8, f as u8));
            }
        }
        table[sq_idx as usize] = attacks;
    }
    table
}

fn pawn_attacks_for(color: Color) -> [Bitboard; 64] {
    let mut table = [0u64; 64];
    let dr: i8 = match color {
        Color::White => 1,
        Color::Black => -1,
    };
    for sq_idx in 0..64u8 {
        let sq = Square(sq_idx);
        let rank = sq.rank() as i8;
        let file = sq.file() as i8;
        let mut attacks = 0u64;
        for df in [-1i8, 1i8] {
            let r = rank + dr;
            let f = file + df;
            if (0..8).contains(&r) && (0..8).contains(&f) {
                attacks |= bb(Square::from_rank_file(r as u8, f as u8));
            }
        }
        table[sq_idx as usize] = attacks;
    }
    table
}

pub static KNIGHT_ATTACKS: Lazy<[Bitboard; 64]> = Lazy::new(|| leaper_attacks(knight_deltas()));
pub static KING_ATTACKS: Lazy<[Bitboard; 64]> = Lazy::new(|| leaper_attacks(king_deltas()));
pub static PAWN_ATTACKS: Lazy<[[Bitboard; 64]; 2]> = Lazy::new(|| {
    [
        pawn_attacks_for(Color::White),
        pawn_attacks_for(Color::Black),
    ]
});

#[inline]
pub fn knight_attacks(sq: Square) -> Bitboard {
    KNIGHT_ATTACKS[sq.index()]
}

#[inline]
pub fn king_attacks(sq: Square) -> Bitboard {
    KING_ATTACKS[sq.index()]
}

#[inline]
pub fn pawn_attacks(color: Color, sq: Square) -> Bitboard {
    PAWN_ATTACKS[color.index()][sq.index()]
}

/// Attack bitboard for a slider standing at local position `i` on `line`
/// (squares in ascending order) given a blocker byte where bit `j` means
/// `line[j]` is occupied. Walks outward in both directions from `i`,
/// stopping at (and including) the first blocker on each side.
fn line_attacks_from_occ(line: &[Square], i: usize, occ_byte: u8) -> Bitboard {
    let len = line.len();
    let mut result = 0u64;
    for j in (i + 1)..len {
        result |= bb(line[j]);
        if occ_byte & (1 << j) != 0 {
            break;
        }
    }
    for j in (0..i).rev() {
        result |= bb(line[j]);
        if occ_byte & (1 << j) != 0 {
            break;
        }
    }
    result
}

fn rank_line(rank: u8) -> [Square; 8] {
    core::array::from_fn(|f| Square::from_rank_file(rank, f as u8))
}

fn file_line(file: u8) -> [Square; 8] {
    core::array::from_fn(|r| Square::from_rank_file(r as u8, file))
}

/// Squares on positive-diagonal `diag` (see [`Square::pos_diag_idx`]),
/// ordered by ascending file.
fn pos_diag_line(diag: u8) -> Vec<Square> {
    let d = diag as i32;
    (0..8i32)
        .filter_map(|f| {
            let r = f + d - 7;
            (0..8).contains(&r).then(|| Square::from_rank_file(r as u8, f as u8))
        })
        .collect()
}

/// Squares on negative-diagonal `diag` (see [`Square::neg_diag_idx`]),
/// ordered by ascending file.
fn neg_diag_line(diag: u8) -> Vec<Square> {
    let d = diag as i32;
    (0..8i32)
        .filter_map(|f| {
            let r = d - f;
            (0..8).contains(&r).then(|| Square::from_rank_file(r as u8, f as u8))
        })
        .collect()
}

fn pos_diag_min_file(diag: u8) -> u8 {
    0i32.max(7 - diag as i32) as u8
}

fn neg_diag_min_file(diag: u8) -> u8 {
    0i32.max(diag as i32 - 7) as u8
}

const RANK_TABLE_LEN: usize = 8 * 8 * 256;
const DIAG_TABLE_LEN: usize = 15 * 8 * 256;

pub static RANK_ATTACKS: Lazy<Vec<Bitboard>> = Lazy::new(|| {
    let mut table = vec![0u64; RANK_TABLE_LEN];
    for rank in 0..8u8 {
        let line = rank_line(rank);
        for file in 0..8usize {
            for occ in 0..256usize {
                table[rank as usize * 8 * 256 + file * 256 + occ] =
                    line_attacks_from_occ(&line, file, occ as u8);
            }
        }
    }
    table
});

pub static FILE_ATTACKS: Lazy<Vec<Bitboard>> = Lazy::new(|| {
    let mut table = vec![0u64; RANK_TABLE_LEN];
    for file in 0..8u8 {
        let line = file_line(file);
        for rank in 0..8usize {
            for occ in 0..256usize {
                table[file as usize * 8 * 256 + rank * 256 + occ] =
                    line_attacks_from_occ(&line, rank, occ as u8);
            }
        }
    }
    table
});

pub static POS_DIAG_ATTACKS: Lazy<Vec<Bitboard>> = Lazy::new(|| {
    let mut table = vec![0u64; DIAG_TABLE_LEN];
    for diag in 0..15u8 {
        let line = pos_diag_line(diag);
        for local_pos in 0..line.len() {
            for occ in 0..256usize {
                table[diag as usize * 8 * 256 + local_pos * 256 + occ] =
                    line_attacks_from_occ(&line, local_pos, occ as u8);
            }
        }
    }
    table
});

pub static NEG_DIAG_ATTACKS: Lazy<Vec<Bitboard>> = Lazy::new(|| {
    let mut table = vec![0u64; DIAG_TABLE_LEN];
    for diag in 0..15u8 {
        let line = neg_diag_line(diag);
        for local_pos in 0..line.len() {
            for occ in 0..256usize {
                table[diag as usize * 8 * 256 + local_pos * 256 + occ] =
                    line_attacks_from_occ(&line, local_pos, occ as u8);
            }
        }
    }
    table
});

#[inline]
fn rank_occ_byte(rank: u8, occupied: Bitboard) -> u8 {
    ((occupied >> (rank * 8)) & 0xff) as u8
}

#[inline]
fn file_occ_byte(file: u8, occupied: Bitboard) -> u8 {
    let mut byte = 0u8;
    for rank in 0..8u8 {
        if occupied & bb(Square::from_rank_file(rank, file)) != 0 {
            byte |= 1 << rank;
        }
    }
    byte
}

#[inline]
fn diag_occ_byte(line: &[Square], occupied: Bitboard) -> u8 {
    let mut byte = 0u8;
    for (j, &sq) in line.iter().enumerate() {
        if occupied & bb(sq) != 0 {
            byte |= 1 << j;
        }
    }
    byte
}

pub fn rook_attacks(occupied: Bitboard, sq: Square) -> Bitboard {
    let rank = sq.rank();
    let file = sq.file();
    let rank_att =
        RANK_ATTACKS[rank as usize * 8 * 256 + file as usize * 256 + rank_occ_byte(rank, occupied) as usize];
    let file_att =
        FILE_ATTACKS[file as usize * 8 * 256 + rank as usize * 256 + file_occ_byte(file, occupied) as usize];
    rank_att | file_att
}

pub fn bishop_attacks(occupied: Bitboard, sq: Square) -> Bitboard {
    let pos_diag = sq.pos_diag_idx();
    let neg_diag = sq.neg_diag_idx();
    let pos_line = pos_diag_line(pos_diag);
    let neg_line = neg_diag_line(neg_diag);
    let pos_local = (sq.file() - pos_diag_min_file(pos_diag)) as usize;
    let neg_local = (sq.file() - neg_diag_min_file(neg_diag)) as usize;
    let pos_att = POS_DIAG_ATTACKS[pos_diag as usize * 8 * 256
        + pos_local * 256
        + diag_occ_byte(&pos_line, occupied) as usize];
    let neg_att = NEG_DIAG_ATTACKS[neg_diag as usize * 8 * 256
        + neg_local * 256
        + diag_occ_byte(&neg_line, occupied) as usize];
    pos_att | neg_att
}

/// Attack bitboard for a rook, bishop or queen at `sq` given the full board
/// occupancy. Not meaningful for other piece types (returns an empty set).
pub fn sliding_attacks(occupied: Bitboard, sq: Square, piece: PieceType) -> Bitboard {
    match piece {
        PieceType::Rook => rook_attacks(occupied, sq),
        PieceType::Bishop => bishop_attacks(occupied, sq),
        PieceType::Queen => rook_attacks(occupied, sq) | bishop_attacks(occupied, sq),
        _ => 0,
    }
}
