//! Iterative-deepening negamax with alpha-beta pruning, move ordering
//! from the shared transposition table, draw/mate detection, and
//! time/node/depth budget enforcement.

use log::debug;

use crate::config::EngineConfig;
use crate::eval::{self, DRAW_VALUE, MATE_VALUE};
use crate::movegen::generate_legal_moves;
use crate::ordering::order_moves;
use crate::position::Position;
use crate::sync::StopFlag;
use crate::tt::{Bound, TranspositionTable};
use crate::types::{Color, Move};

/// A score magnitude this far beyond [`MATE_VALUE`] is an alpha-beta
/// "infinity": wide enough that no real evaluation or mate score clips
/// against it, narrow enough to stay well inside `i16`.
const INF: i16 = MATE_VALUE + 1;

/// What the client asked `go` for (§6): zero or more of a root move
/// restriction, a clock/increment pair, and hard depth/node/time caps.
#[derive(Clone, Debug, Default)]
pub struct SearchLimits {
    pub search_moves: Option<Vec<Move>>,
    pub wtime_ms: Option<u64>,
    pub btime_ms: Option<u64>,
    pub winc_ms: u64,
    pub binc_ms: u64,
    pub depth: Option<u8>,
    pub nodes: Option<u64>,
    pub movetime_ms: Option<u64>,
}

/// Computes the per-move time budget (§6): the minimum of whichever of
/// `movetime`, the clock-derived budget (`incr + bank / expected_remaining_moves`)
/// and the engine's fallback default are applicable; `movetime` and the
/// clock budget are each only in play when the corresponding input was
/// supplied, so a single supplied bound is simply used as-is.
pub fn compute_time_budget_ms(limits: &SearchLimits, side: Color, fullmove: u32, config: &EngineConfig) -> u64 {
    let (bank, incr) = match side {
        Color::White => (limits.wtime_ms, limits.winc_ms),
        Color::Black => (limits.btime_ms, limits.binc_ms),
    };
    let clock_budget = bank.map(|bank| {
        let expected_remaining_moves = (80u64.saturating_sub(u64::from(fullmove))).max(30);
        incr + bank / expected_remaining_moves
    });

    match (limits.movetime_ms, clock_budget) {
        (Some(movetime), Some(clock)) => movetime.min(clock),
        (Some(movetime), None) => movetime,
        (None, Some(clock)) => clock,
        (None, None) => config.fallback_move_time_ms,
    }
}

/// The iterative-deepening depth ceiling: the explicit `depth` limit if
/// given, else the engine's configured cap; never above that cap.
pub fn compute_depth_cap(limits: &SearchLimits, config: &EngineConfig) -> u8 {
    limits.depth.unwrap_or(config.max_depth).min(config.max_depth)
}

/// Snapshot emitted once per completed iterative-deepening depth.
#[derive(Clone, Debug)]
pub struct IterationInfo {
    pub depth: u8,
    pub score: i16,
    /// Moves to mate if `score`'s magnitude reached [`MATE_VALUE`];
    /// positive if the side to move delivers it, negative if it suffers it.
    pub mate_in: Option<i32>,
    pub pv: Vec<Move>,
    pub nodes: u64,
    pub tt_hits: u64,
    /// Fail-high prune count, indexed by the remaining depth at which the
    /// cutoff happened.
    pub pruned_by_depth: Vec<u64>,
    pub time_ms: u64,
}

/// What the search returned: the move to play (`None` only if the root
/// has no legal moves), its score, and the principal variation.
#[derive(Clone, Debug, Default)]
pub struct SearchOutcome {
    pub best_move: Option<Move>,
    pub score: i16,
    pub pv: Vec<Move>,
}

struct Searcher<'a> {
    tt: &'a TranspositionTable,
    stop: StopFlag,
    node_budget: u64,
    nodes: u64,
    tt_hits: u64,
    pruned_by_depth: Vec<u64>,
    root_restrict: Option<&'a [Move]>,
}

impl<'a> Searcher<'a> {
    fn negamax(&mut self, pos: &mut Position, depth: u8, mut alpha: i16, beta: i16, ply: u8) -> i16 {
        if self.stop.is_stopped() {
            return alpha;
        }
        if pos.result().is_draw() {
            return DRAW_VALUE;
        }

        let hash = pos.hash();
        let mut anticipated = None;
        if let Some(entry) = self.tt.get(hash) {
            self.tt_hits += 1;
            if entry.depth >= depth {
                match entry.bound {
                    Bound::Exact => return entry.score,
                    Bound::Lower if entry.score >= beta => return entry.score,
                    Bound::Upper if entry.score <= alpha => return entry.score,
                    _ => {}
                }
            }
            if !entry.best_move.is_null() {
                anticipated = Some(entry.best_move);
            }
        }

        let mut moves = generate_legal_moves(pos);

        if moves.is_empty() {
            self.nodes += 1;
            return if pos.in_check(pos.side_to_move()) {
                -MATE_VALUE
            } else {
                DRAW_VALUE
            };
        }

        if depth == 0 {
            self.nodes += 1;
            return eval::evaluate(pos);
        }

        if ply == 0 {
            if let Some(restrict) = self.root_restrict {
                moves.retain(|m| restrict.contains(m));
            }
        }

        order_moves(pos, &mut moves, anticipated);

        let alpha_orig = alpha;
        let mut best_score = -INF;
        let mut best_move = Move::NULL;

        for mv in moves {
            let (frozen, captured) = pos.make_move(mv);
            let score = -self.negamax(pos, depth - 1, -beta, -alpha, ply + 1);
            pos.unmake_move(mv, frozen, captured);

            if self.nodes >= self.node_budget {
                self.stop.stop();
            }
            if self.stop.is_stopped() {
                return best_score.max(alpha_orig);
            }

            if score >= beta {
                self.tt.post(hash, score, depth, Bound::Lower, mv);
                self.pruned_by_depth[depth as usize] += 1;
                return score;
            }
            if score > best_score {
                best_score = score;
                best_move = mv;
                if score > alpha {
                    alpha = score;
                }
            }
        }

        let bound = if alpha > alpha_orig { Bound::Exact } else { Bound::Upper };
        self.tt.post(hash, best_score, depth, bound, best_move);
        best_score
    }
}

/// Runs iterative deepening from depth 1 up to `compute_depth_cap`'s
/// ceiling, calling `on_iteration` after every depth that completed
/// without being halted. Stops when the halt flag is set, the depth cap
/// is reached, the node budget is exceeded (checked synchronously inside
/// the searcher), or a mate score is proven at the root.
pub fn run(
    pos: &mut Position,
    tt: &TranspositionTable,
    limits: &SearchLimits,
    config: &EngineConfig,
    stop: StopFlag,
    start: std::time::Instant,
    mut on_iteration: impl FnMut(&IterationInfo),
) -> SearchOutcome {
    let mut outcome = SearchOutcome::default();

    // A root that is already a draw or already has no legal moves never
    // enters the negamax loop (it would return its terminal score without
    // ever posting a root TT entry to read back); report it directly.
    if pos.result().is_draw() {
        outcome.score = DRAW_VALUE;
        return outcome;
    }
    if generate_legal_moves(pos).is_empty() {
        outcome.score = if pos.in_check(pos.side_to_move()) {
            -MATE_VALUE
        } else {
            DRAW_VALUE
        };
        return outcome;
    }

    let max_depth = compute_depth_cap(limits, config);
    let node_budget = limits.nodes.unwrap_or(u64::MAX);

    for depth in 1..=max_depth {
        if stop.is_stopped() {
            break;
        }

        let mut searcher = Searcher {
            tt,
            stop: stop.clone(),
            node_budget,
            nodes: 0,
            tt_hits: 0,
            pruned_by_depth: vec![0u64; depth as usize + 1],
            root_restrict: limits.search_moves.as_deref(),
        };

        let score = searcher.negamax(pos, depth, -INF, INF, 0);

        if stop.is_stopped() {
            break;
        }

        let best_move = tt.get(pos.hash()).map(|e| e.best_move).filter(|m| !m.is_null());
        if best_move.is_none() {
            break;
        }
        outcome.best_move = best_move;
        outcome.score = score;
        outcome.pv = tt.principal_variation(pos, depth as usize);

        let mate_in = (score.unsigned_abs() >= MATE_VALUE as u16).then(|| {
            let moves_to_mate = (outcome.pv.len() as i32 + 1) / 2;
            if score > 0 {
                moves_to_mate
            } else {
                -moves_to_mate
            }
        });

        debug!(
            "depth {depth} complete: score {score} nodes {}",
            searcher.nodes
        );

        on_iteration(&IterationInfo {
            depth,
            score,
            mate_in,
            pv: outcome.pv.clone(),
            nodes: searcher.nodes,
            tt_hits: searcher.tt_hits,
            pruned_by_depth: searcher.pruned_by_depth,
            time_ms: start.elapsed().as_millis() as u64,
        });

        if score.unsigned_abs() >= MATE_VALUE as u16 {
            break;
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Position;

    fn run_to_depth(fen: &str, depth: u8) -> SearchOutcome {
        let mut pos = Position::from_fen(fen).unwrap();
        let tt = TranspositionTable::new(4);
        let limits = SearchLimits {
            depth: Some(depth),
            ..Default::default()
        };
        let config = EngineConfig::default();
        run(
            &mut pos,
            &tt,
            &limits,
            &config,
            StopFlag::new(),
            std::time::Instant::now(),
            |_| {},
        )
    }

    #[test]
    fn finds_a_legal_move_from_the_start_position() {
        let outcome = run_to_depth(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
            3,
        );
        assert!(outcome.best_move.is_some());
    }

    #[test]
    fn finds_mate_in_one() {
        // Black king boxed in on g8 by its own pawns; Ra1-a8 is back-rank mate.
        let outcome = run_to_depth("6k1/5ppp/8/8/8/8/8/R6K w - - 0 1", 3);
        let mv = outcome.best_move.unwrap();
        assert_eq!(mv.to_string(), "a1a8");
        assert_eq!(outcome.score, MATE_VALUE);
    }

    #[test]
    fn losing_king_reports_negative_mate_score() {
        let outcome = run_to_depth("8/8/8/8/8/4k3/4q3/4K3 w - - 0 1", 4);
        assert_eq!(outcome.score, -MATE_VALUE);
    }

    #[test]
    fn repeating_into_a_draw_is_scored_at_the_draw_sentinel() {
        // Two kings, white to move, nothing but shuffling available.
        let outcome = run_to_depth("7k/8/8/8/8/8/8/K7 w - - 0 1", 2);
        assert_eq!(outcome.score, DRAW_VALUE);
    }

    #[test]
    fn does_not_exceed_the_requested_node_budget_by_much() {
        let mut pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1",
        )
        .unwrap();
        let tt = TranspositionTable::new(4);
        let limits = SearchLimits {
            depth: Some(10),
            nodes: Some(500),
            ..Default::default()
        };
        let config = EngineConfig::default();
        let outcome = run(
            &mut pos,
            &tt,
            &limits,
            &config,
            StopFlag::new(),
            std::time::Instant::now(),
            |_| {},
        );
        assert!(outcome.best_move.is_some());
    }
}
