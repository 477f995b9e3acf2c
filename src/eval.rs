//! Leaf evaluation: material difference from the side-to-move's
//! perspective, plus the draw and mate sentinels search and the UCI
//! printer key off of.

use crate::position::Position;
use crate::types::{Color, GameResult, PieceType};

/// Score assigned to any drawn position; small and negative so the
/// search mildly prefers a won-but-unclear line over forcing a draw.
pub const DRAW_VALUE: i16 = -50;

/// Magnitude reserved for a proven win or loss. `search` never lets an
/// evaluation term push a score into `[-MATE_VALUE, MATE_VALUE]` other
/// than the sentinel itself.
pub const MATE_VALUE: i16 = 10_000;

fn material_for(pos: &Position, color: Color) -> i32 {
    use PieceType::{Bishop, Knight, Pawn, Queen, Rook};
    let m = pos.material();
    let bishops = i32::from(m.count(color, 2)) + i32::from(m.count(color, 3));
    i32::from(m.count(color, 0)) * Pawn.weight()
        + i32::from(m.count(color, 1)) * Knight.weight()
        + bishops * Bishop.weight()
        + i32::from(m.count(color, 4)) * Rook.weight()
        + i32::from(m.count(color, 5)) * Queen.weight()
}

/// Material-difference score from `pos.side_to_move()`'s perspective, or
/// [`DRAW_VALUE`] for any drawn [`GameResult`]. Kings are never scored.
pub fn evaluate(pos: &Position) -> i16 {
    if pos.result().is_draw() {
        return DRAW_VALUE;
    }
    let side = pos.side_to_move();
    let diff = material_for(pos, side) - material_for(pos, side.other());
    diff.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startpos_is_balanced() {
        let pos = Position::startpos();
        assert_eq!(evaluate(&pos), 0);
    }

    #[test]
    fn missing_queen_scores_against_its_side() {
        // White has no queen; black has a full back rank.
        let pos = Position::from_fen(
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNB1KBNR w KQkq - 0 1",
        )
        .unwrap();
        assert_eq!(evaluate(&pos), -PieceType::Queen.weight() as i16);
    }

    #[test]
    fn drawn_position_returns_draw_sentinel() {
        let pos = Position::from_fen("8/8/8/4k3/8/8/4K3/8 w - - 0 1").unwrap();
        assert_eq!(evaluate(&pos), DRAW_VALUE);
    }
}
