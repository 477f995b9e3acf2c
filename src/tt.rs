//! Transposition table: a process-wide `hash -> {score, depth, best move}`
//! cache shared by every search, with a replace-on-deeper policy.
//!
//! Zobrist collisions are not resolved: an entry for one position may be
//! read back for another position that happens to share its hash. The
//! search tolerates this (depth-gated return, best-move ordering hint,
//! re-verified by evaluation at leaves), so a single direct-mapped slot
//! per hash is sufficient; no collision chain is kept.

use parking_lot::Mutex;

use crate::types::Move;

/// How a stored score relates to the true minimax value of its position,
/// per the alpha-beta storage rule: exact when the full move list was
/// searched without a fail-high, a lower bound on fail-high, an upper
/// bound when no move raised alpha.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Bound {
    Exact,
    Lower,
    Upper,
}

#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TranspositionEntry {
    pub hash: u64,
    pub score: i16,
    pub depth: u8,
    pub bound: Bound,
    pub best_move: Move,
}

struct Table {
    slots: Vec<Option<TranspositionEntry>>,
    mask: usize,
}

impl Table {
    fn new(size_mb: usize) -> Self {
        let entry_bytes = std::mem::size_of::<Option<TranspositionEntry>>();
        let mut n = (size_mb * 1024 * 1024 / entry_bytes).next_power_of_two();
        if n == 0 {
            n = 1024;
        }
        Table {
            slots: vec![None; n],
            mask: n - 1,
        }
    }

    fn index(&self, hash: u64) -> usize {
        (hash as usize) & self.mask
    }
}

/// Concurrency-safe `hash -> entry` store. Within a single search it is
/// read and written only by the searcher thread; the timer thread never
/// touches it. A single lock over the whole table is adequate because
/// searches are single-threaded (§5 of the design notes) and contention
/// is limited to the rare case of two processes sharing a table.
pub struct TranspositionTable {
    inner: Mutex<Table>,
}

impl TranspositionTable {
    #[must_use]
    pub fn new(size_mb: usize) -> Self {
        TranspositionTable {
            inner: Mutex::new(Table::new(size_mb)),
        }
    }

    /// Read-only lookup. Returns `None` if no entry is stored for `hash`.
    pub fn get(&self, hash: u64) -> Option<TranspositionEntry> {
        let table = self.inner.lock();
        let slot = &table.slots[table.index(hash)];
        slot.filter(|e| e.hash == hash).copied()
    }

    /// Stores an entry for `hash`, unless an existing entry at the same
    /// slot already has `hash` and a depth at least as deep (ties keep
    /// the existing entry).
    pub fn post(&self, hash: u64, score: i16, depth: u8, bound: Bound, best_move: Move) {
        let mut table = self.inner.lock();
        let idx = table.index(hash);
        let replace = match &table.slots[idx] {
            Some(existing) => existing.hash != hash || depth > existing.depth,
            None => true,
        };
        if replace {
            table.slots[idx] = Some(TranspositionEntry {
                hash,
                score,
                depth,
                bound,
                best_move,
            });
        }
    }

    /// Clears every entry. Called on `ucinewgame` so a new game never
    /// reads stale best-moves from a previous one.
    pub fn clear(&self) {
        let mut table = self.inner.lock();
        for slot in &mut table.slots {
            *slot = None;
        }
    }

    /// Follows `best_move` pointers from `pos` on a scratch working copy,
    /// stopping when no entry exists for the current hash, the stored
    /// move is null, the move is no longer legal (a stale or colliding
    /// entry), or `depth` moves have been collected. Restores `pos`
    /// before returning.
    pub fn principal_variation(&self, pos: &mut crate::position::Position, depth: usize) -> Vec<Move> {
        let mut pv = Vec::with_capacity(depth);
        let mut undo = Vec::with_capacity(depth);

        for _ in 0..depth {
            let Some(entry) = self.get(pos.hash()) else {
                break;
            };
            if entry.best_move.is_null() {
                break;
            }
            if !crate::movegen::generate_legal_moves(pos).contains(&entry.best_move) {
                break;
            }
            let (frozen, captured) = pos.make_move(entry.best_move);
            undo.push((entry.best_move, frozen, captured));
            pv.push(entry.best_move);
        }

        for (mv, frozen, captured) in undo.into_iter().rev() {
            pos.unmake_move(mv, frozen, captured);
        }

        pv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MoveKind, Square};

    fn mv(from: u8, to: u8) -> Move {
        Move::new(Square(from), Square(to), MoveKind::Normal, None)
    }

    #[test]
    fn round_trips_a_stored_entry() {
        let tt = TranspositionTable::new(1);
        tt.post(42, 100, 5, Bound::Exact, mv(12, 28));
        let entry = tt.get(42).unwrap();
        assert_eq!(entry.score, 100);
        assert_eq!(entry.depth, 5);
        assert_eq!(entry.best_move, mv(12, 28));
    }

    #[test]
    fn shallower_store_does_not_overwrite_deeper_entry() {
        let tt = TranspositionTable::new(1);
        tt.post(7, 10, 8, Bound::Exact, mv(0, 1));
        tt.post(7, 20, 3, Bound::Exact, mv(2, 3));
        assert_eq!(tt.get(7).unwrap().depth, 8);
    }

    #[test]
    fn deeper_store_overwrites() {
        let tt = TranspositionTable::new(1);
        tt.post(7, 10, 3, Bound::Exact, mv(0, 1));
        tt.post(7, 20, 8, Bound::Exact, mv(2, 3));
        assert_eq!(tt.get(7).unwrap().depth, 8);
    }

    #[test]
    fn clear_removes_all_entries() {
        let tt = TranspositionTable::new(1);
        tt.post(7, 10, 3, Bound::Exact, mv(0, 1));
        tt.clear();
        assert!(tt.get(7).is_none());
    }

    #[test]
    fn missing_hash_returns_none() {
        let tt = TranspositionTable::new(1);
        assert!(tt.get(999).is_none());
    }
}
