//! Smoke test against the built binary: feeds a short command session on
//! standard input and checks the handshake and final `bestmove` line,
//! the way the teacher's `uci_integration.rs` drives its own binary.

use std::io::Write;
use std::process::{Command, Stdio};

use mila_chess::movegen::generate_legal_moves;
use mila_chess::position::Position;

#[test]
fn uci_smoke_test_returns_legal_move() {
    let exe = env!("CARGO_BIN_EXE_mila_chess");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("failed to spawn engine binary");

    let input = b"uci\nisready\nposition startpos moves e2e4\ngo movetime 50\nquit\n";
    child.stdin.as_mut().unwrap().write_all(input).unwrap();

    let output = child.wait_with_output().expect("failed to read output");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("uciok"));
    assert!(stdout.contains("readyok"));

    let bestmove_line = stdout
        .lines()
        .filter(|line| line.starts_with("bestmove"))
        .last()
        .expect("no bestmove line found");
    let parts: Vec<&str> = bestmove_line.split_whitespace().collect();
    assert!(parts.len() >= 2, "bestmove missing move: {bestmove_line}");
    let mv_token = parts[1];
    assert_ne!(mv_token, "0000", "engine returned a null move");

    let mut pos = Position::from_fen("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .unwrap();
    let e2e4 = generate_legal_moves(&mut pos)
        .into_iter()
        .find(|m| m.to_string() == "e2e4")
        .unwrap();
    pos.make_move(e2e4);

    let legal = generate_legal_moves(&mut pos)
        .into_iter()
        .any(|m| m.to_string() == mv_token);
    assert!(legal, "bestmove {mv_token} is not legal in the resulting position");
}
