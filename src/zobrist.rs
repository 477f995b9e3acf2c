//! Zobrist hashing: a 64-bit position fingerprint maintained incrementally
//! by XOR-ing independent random keys as the position changes.
//!
//! All keys are generated once, at first use, from a fixed seed so hashes
//! are reproducible across runs and test fixtures.

use once_cell::sync::Lazy;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::types::{Color, Piece, PieceType, Square};

/// Fixed seed so every process run (and every test) agrees on the same
/// key tables. The exact value is arbitrary; only its fixedness matters.
const ZOBRIST_SEED: u64 = 0x5555_5555_5555_5555;

pub struct ZobristKeys {
    /// Indexed `[square][color_index * 6 + piece_index]`.
    piece_keys: [[u64; 12]; 64],
    ep_keys: [u64; 64],
    castle_keys: [u64; 4],
    turn_keys: [u64; 2],
}

impl ZobristKeys {
    fn generate() -> Self {
        let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);
        let mut piece_keys = [[0u64; 12]; 64];
        let mut ep_keys = [0u64; 64];
        for sq in 0..64 {
            for p in 0..12 {
                piece_keys[sq][p] = rng.next_u64();
            }
            ep_keys[sq] = rng.next_u64();
        }
        let castle_keys = [rng.next_u64(), rng.next_u64(), rng.next_u64(), rng.next_u64()];
        let turn_keys = [rng.next_u64(), rng.next_u64()];
        ZobristKeys {
            piece_keys,
            ep_keys,
            castle_keys,
            turn_keys,
        }
    }
}

pub static KEYS: Lazy<ZobristKeys> = Lazy::new(ZobristKeys::generate);

fn dense_piece_index(kind: PieceType, color: Color) -> usize {
    color.index() * 6 + kind.index()
}

/// Key for `piece` sitting on `sq`; zero (a no-op XOR) for the empty piece.
pub fn piece_key(sq: Square, piece: Piece) -> u64 {
    match piece.0 {
        Some((kind, color)) => KEYS.piece_keys[sq.index()][dense_piece_index(kind, color)],
        None => 0,
    }
}

pub fn ep_key(sq: Square) -> u64 {
    KEYS.ep_keys[sq.index()]
}

/// `right` is one of the four `crate::types::castle` bit flags; only one
/// bit of `right` may be set.
pub fn castle_key(right: u8) -> u64 {
    debug_assert!(right.count_ones() <= 1);
    match right {
        crate::types::castle::WHITE_KINGSIDE => KEYS.castle_keys[0],
        crate::types::castle::WHITE_QUEENSIDE => KEYS.castle_keys[1],
        crate::types::castle::BLACK_KINGSIDE => KEYS.castle_keys[2],
        crate::types::castle::BLACK_QUEENSIDE => KEYS.castle_keys[3],
        _ => 0,
    }
}

pub fn turn_key(color: Color) -> u64 {
    KEYS.turn_keys[color.index()]
}

/// XOR of the keys for every set bit of `rights` (a combination of the
/// four `crate::types::castle` flags).
pub fn castle_rights_key(rights: u8) -> u64 {
    use crate::types::castle::{BLACK_KINGSIDE, BLACK_QUEENSIDE, WHITE_KINGSIDE, WHITE_QUEENSIDE};
    let mut key = 0u64;
    for flag in [WHITE_KINGSIDE, WHITE_QUEENSIDE, BLACK_KINGSIDE, BLACK_QUEENSIDE] {
        if rights & flag != 0 {
            key ^= castle_key(flag);
        }
    }
    key
}
