//! The engine command protocol (§6): a line-oriented, whitespace-tokenized
//! interpreter on standard input that feeds positions and search
//! constraints into the core and is the sole place `info`/`bestmove`
//! lines are printed.
//!
//! `go` runs the search on a background thread so `stop` can interrupt it
//! and the read loop keeps accepting input; this is plumbing around the
//! single-threaded searcher (§5), not parallel search.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use log::warn;

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::movegen::generate_legal_moves;
use crate::position::Position;
use crate::search::{self, IterationInfo, SearchLimits};
use crate::sync::StopFlag;
use crate::timer::DeadlineTimer;
use crate::tt::TranspositionTable;
use crate::types::{Move, MoveKind, PieceType, Square};

const POSITION_HELP: &str = "position [startpos | fen <6 FEN fields>] [moves <m1> <m2> ...]";
const GO_HELP: &str = "go [searchmoves <m>...] [wtime N] [btime N] [winc N] [binc N] [depth N] [nodes N] [movetime N]";

/// Parses a long-algebraic token (`e2e4`, `e7e8q`) against `pos`'s legal
/// moves so the returned [`Move`] carries the right [`MoveKind`] (the
/// token alone cannot distinguish a normal move from castling or en
/// passant).
fn parse_long_algebraic(pos: &mut Position, token: &str) -> Option<Move> {
    if token.len() < 4 {
        return None;
    }
    let from = Square::from_algebraic(&token[0..2])?;
    let to = Square::from_algebraic(&token[2..4])?;
    let promo = token
        .chars()
        .nth(4)
        .and_then(PieceType::from_char)
        .map(|(kind, _)| kind);

    generate_legal_moves(pos).into_iter().find(|m| {
        m.from_sq() == from
            && m.to_sq() == to
            && (m.kind() != MoveKind::Promotion || m.promotion() == promo)
    })
}

fn format_info_line(info: &IterationInfo) -> String {
    let score_field = match info.mate_in {
        Some(n) => format!("mate {n}"),
        None => info.score.to_string(),
    };
    let moves_field = info
        .pv
        .iter()
        .map(Move::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    let pruned_field = info
        .pruned_by_depth
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "info depth {} score {score_field} moves {moves_field} nodes {} hits {} pruned {pruned_field} time {}",
        info.depth, info.nodes, info.tt_hits, info.time_ms
    )
}

/// Background state for one `go` invocation: the halt flag `stop`
/// terminates it, and `handle` is joined to guarantee its `bestmove`
/// line is printed before the interpreter moves on.
struct InFlightSearch {
    stop: StopFlag,
    handle: JoinHandle<()>,
}

impl InFlightSearch {
    fn halt_and_join(self) {
        self.stop.stop();
        let _ = self.handle.join();
    }
}

pub struct Engine {
    pos: Position,
    tt: Arc<TranspositionTable>,
    config: EngineConfig,
    in_flight: Option<InFlightSearch>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Engine {
            pos: Position::startpos(),
            tt: Arc::new(TranspositionTable::new(config.tt_size_mb)),
            config,
            in_flight: None,
        }
    }

    fn stop_any_in_flight_search(&mut self) {
        if let Some(search) = self.in_flight.take() {
            search.halt_and_join();
        }
    }
}

fn handle_position(engine: &mut Engine, tokens: &[&str], out: &mut impl Write) {
    if tokens.get(1) == Some(&"--help") || tokens.get(1) == Some(&"help") {
        writeln!(out, "{POSITION_HELP}").ok();
        return;
    }

    let mut i = 1;
    let mut new_pos = match tokens.get(i) {
        Some(&"startpos") => {
            i += 1;
            Position::startpos()
        }
        Some(&"fen") => {
            if tokens.len() < i + 7 {
                warn!("position fen: not enough FEN fields");
                writeln!(out, "error: {}", EngineError::InvalidFen {
                    field: "fen",
                    value: tokens[i + 1..].join(" "),
                })
                .ok();
                return;
            }
            let fen = tokens[i + 1..i + 7].join(" ");
            i += 7;
            match Position::from_fen(&fen) {
                Ok(p) => p,
                Err(e) => {
                    warn!("position fen: {e}");
                    writeln!(out, "error: {e}").ok();
                    return;
                }
            }
        }
        _ => {
            warn!("position: expected 'startpos' or 'fen', got {:?}", tokens.get(i));
            writeln!(out, "error: {POSITION_HELP}").ok();
            return;
        }
    };

    if tokens.get(i) == Some(&"moves") {
        i += 1;
        for &token in &tokens[i..] {
            match parse_long_algebraic(&mut new_pos, token) {
                Some(mv) => {
                    new_pos.make_move(mv);
                }
                None => {
                    warn!("position: illegal or malformed move {token:?}");
                    writeln!(out, "error: {}", EngineError::IllegalMove {
                        token: token.to_string(),
                    })
                    .ok();
                    return;
                }
            }
        }
    }

    engine.pos = new_pos;
}

/// Parses the move tokens following `searchmoves`. `None` on a malformed
/// or illegal token, or on an empty token span (`searchmoves` naming no
/// moves would otherwise restrict the root to nothing, which can never
/// be searched).
fn parse_search_moves(pos: &mut Position, tokens: &[&str]) -> Option<Vec<Move>> {
    if tokens.is_empty() {
        return None;
    }
    let mut moves = Vec::new();
    for &token in tokens {
        moves.push(parse_long_algebraic(pos, token)?);
    }
    Some(moves)
}

fn handle_go(engine: &mut Engine, tokens: &[&str], out: &mut impl Write) {
    if tokens.get(1) == Some(&"--help") || tokens.get(1) == Some(&"help") {
        writeln!(out, "{GO_HELP}").ok();
        return;
    }

    engine.stop_any_in_flight_search();

    let mut limits = SearchLimits::default();
    let mut i = 1;
    while i < tokens.len() {
        match tokens[i] {
            "searchmoves" => {
                let start = i + 1;
                let mut end = start;
                while end < tokens.len() && !KNOWN_GO_KEYWORDS.contains(&tokens[end]) {
                    end += 1;
                }
                match parse_search_moves(&mut engine.pos, &tokens[start..end]) {
                    Some(moves) => limits.search_moves = Some(moves),
                    None => {
                        warn!("go searchmoves: malformed or empty move list {:?}", &tokens[start..end]);
                        writeln!(out, "error: {}", EngineError::IllegalMove {
                            token: tokens[start..end].join(" "),
                        })
                        .ok();
                        return;
                    }
                }
                i = end;
            }
            "wtime" => {
                limits.wtime_ms = tokens.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "btime" => {
                limits.btime_ms = tokens.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "winc" => {
                limits.winc_ms = tokens.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                i += 2;
            }
            "binc" => {
                limits.binc_ms = tokens.get(i + 1).and_then(|s| s.parse().ok()).unwrap_or(0);
                i += 2;
            }
            "depth" => {
                limits.depth = tokens.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "nodes" => {
                limits.nodes = tokens.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            "movetime" => {
                limits.movetime_ms = tokens.get(i + 1).and_then(|s| s.parse().ok());
                i += 2;
            }
            other => {
                warn!("go: ignoring unrecognized token {other:?}");
                i += 1;
            }
        }
    }

    let budget_ms = search::compute_time_budget_ms(
        &limits,
        engine.pos.side_to_move(),
        engine.pos.fullmove_number(),
        &engine.config,
    );

    let stop = StopFlag::new();
    let timer = DeadlineTimer::start(std::time::Duration::from_millis(budget_ms), stop.clone());

    let mut pos = engine.pos.clone();
    let tt = Arc::clone(&engine.tt);
    let config = engine.config;
    let search_stop = stop.clone();
    let handle = std::thread::spawn(move || {
        let start = Instant::now();
        let stdout = io::stdout();
        let outcome = search::run(&mut pos, &tt, &limits, &config, search_stop, start, |info| {
            let line = format_info_line(info);
            let mut lock = stdout.lock();
            writeln!(lock, "{line}").ok();
            lock.flush().ok();
        });
        // The timer thread may still be asleep for the rest of its
        // originally-computed budget; `bestmove` follows immediately once
        // the search itself has returned, so the timer is cancelled
        // rather than joined.
        if let Some(timer) = timer {
            timer.cancel();
        }
        let mut lock = stdout.lock();
        match outcome.best_move {
            Some(mv) => writeln!(lock, "bestmove {mv}").ok(),
            None => writeln!(lock, "bestmove 0000").ok(),
        };
        lock.flush().ok();
    });

    engine.in_flight = Some(InFlightSearch { stop, handle });
}

const KNOWN_GO_KEYWORDS: [&str; 7] = [
    "wtime", "btime", "winc", "binc", "depth", "nodes", "movetime",
];

fn handle_line(engine: &mut Engine, line: &str, out: &mut impl Write) -> bool {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some(&cmd) = tokens.first() else {
        return true;
    };

    match cmd {
        "uci" => {
            writeln!(out, "id name mila_chess").ok();
            writeln!(out, "id author the mila_chess authors").ok();
            writeln!(out, "uciok").ok();
        }
        "isready" => {
            writeln!(out, "readyok").ok();
        }
        "ucinewgame" => {
            engine.stop_any_in_flight_search();
            engine.tt.clear();
            engine.pos = Position::startpos();
        }
        "position" => {
            engine.stop_any_in_flight_search();
            handle_position(engine, &tokens, out);
        }
        "go" => handle_go(engine, &tokens, out),
        "stop" => engine.stop_any_in_flight_search(),
        "quit" => {
            engine.stop_any_in_flight_search();
            return false;
        }
        other => {
            warn!("unknown command: {line:?}");
            writeln!(out, "error: unknown command {other:?}").ok();
        }
    }
    true
}

/// Reads commands from standard input until end-of-input or `quit`.
pub fn run(config: EngineConfig) {
    let mut engine = Engine::new(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        if !handle_line(&mut engine, &line, &mut stdout) {
            break;
        }
    }

    engine.stop_any_in_flight_search();
}
