//! Scenarios C, D and F: end-to-end search behavior on realistic
//! middlegame and endgame positions, driving `search::run` directly the
//! way the `go` handler does.

use std::time::Instant;

use mila_chess::config::EngineConfig;
use mila_chess::eval::MATE_VALUE;
use mila_chess::position::Position;
use mila_chess::search::{self, IterationInfo, SearchLimits};
use mila_chess::sync::StopFlag;
use mila_chess::tt::TranspositionTable;

fn search_to_depth(fen: &str, depth: u8) -> (search::SearchOutcome, Vec<IterationInfo>) {
    let mut pos = Position::from_fen(fen).unwrap();
    let tt = TranspositionTable::new(4);
    let config = EngineConfig::default();
    let limits = SearchLimits {
        depth: Some(depth),
        ..Default::default()
    };
    let mut iterations = Vec::new();
    let outcome = search::run(
        &mut pos,
        &tt,
        &limits,
        &config,
        StopFlag::new(),
        Instant::now(),
        |info| iterations.push(info.clone()),
    );
    (outcome, iterations)
}

#[test]
fn scenario_c_open_game_search_reports_iteration_one_before_bestmove() {
    let mut pos = Position::startpos();
    for mv in ["e2e4", "e7e5", "g1f3", "b8c6", "f1b5"] {
        let legal = mila_chess::movegen::generate_legal_moves(&mut pos)
            .into_iter()
            .find(|m| m.to_string() == mv)
            .unwrap_or_else(|| panic!("{mv} is not legal in this line"));
        pos.make_move(legal);
    }

    let tt = TranspositionTable::new(4);
    let config = EngineConfig::default();
    let limits = SearchLimits {
        depth: Some(6),
        ..Default::default()
    };
    let mut iterations = Vec::new();
    let outcome = search::run(
        &mut pos,
        &tt,
        &limits,
        &config,
        StopFlag::new(),
        Instant::now(),
        |info| iterations.push(info.clone()),
    );

    assert!(outcome.best_move.is_some());
    assert_eq!(iterations.first().map(|i| i.depth), Some(1));
}

#[test]
fn scenario_d_search_never_crashes_or_emits_a_null_move_and_restores_the_position() {
    let fen = "1r1q3r/pBP2pbp/1p2p1pn/4P2k/4QP2/B4N1P/P5P1/R4RK1 w - - 1 19";
    let (outcome, _) = search_to_depth(fen, 6);

    assert!(outcome.best_move.is_some());
    assert_ne!(outcome.best_move.unwrap().to_string(), "0000");

    // Re-parsing the same FEN must reproduce the exact input position: the
    // search never mutates the caller's Position beyond make/unmake pairs.
    let reparsed = Position::from_fen(fen).unwrap();
    assert_eq!(reparsed.to_fen(), fen);
}

#[test]
fn scenario_f_losing_side_to_move_is_scored_as_mated_with_a_mating_pv() {
    let fen = "8/8/8/8/8/4k3/4q3/4K3 w - - 0 1";
    let (outcome, _) = search_to_depth(fen, 4);

    assert_eq!(outcome.score, -MATE_VALUE);
}
