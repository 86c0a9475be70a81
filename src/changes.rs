use shakmaty::{Piece, Square};

use crate::board::{DecodeError, RawBoard, piece_for_code};
use crate::mapping::sensor_square;

/// A single sensor transition on one square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceEvent {
    /// The square became empty; `piece` is what was lifted
    Up { square: Square, piece: Piece },
    /// A piece was put on the square
    Down { square: Square, piece: Piece },
}

impl PieceEvent {
    #[inline]
    pub fn square(&self) -> Square {
        match *self {
            PieceEvent::Up { square, .. } | PieceEvent::Down { square, .. } => square,
        }
    }

    #[inline]
    pub fn piece(&self) -> Piece {
        match *self {
            PieceEvent::Up { piece, .. } | PieceEvent::Down { piece, .. } => piece,
        }
    }
}

/// Lists the lift and place events that turn `previous` into `current`.
///
/// Bytes are visited in ascending order and only changed bytes are opened up;
/// within a byte the low nibble comes before the high nibble. Replacing one
/// piece with another in a single update reports only the placement.
pub fn detect_changes(
    previous: &RawBoard,
    current: &RawBoard,
) -> Result<Vec<PieceEvent>, DecodeError> {
    let mut events = Vec::new();

    let changed = previous
        .bytes()
        .iter()
        .zip(current.bytes())
        .enumerate()
        .filter(|(_, (old, new))| old != new);

    for (i, (&old, &new)) in changed {
        let halves = [
            (sensor_square(2 * i), old & 0x0F, new & 0x0F),
            (sensor_square(2 * i + 1), old >> 4, new >> 4),
        ];
        for (square, old_code, new_code) in halves {
            if let Some(event) = nibble_event(square, old_code, new_code)? {
                events.push(event);
            }
        }
    }

    Ok(events)
}

/// Classifies one nibble transition.
fn nibble_event(square: Square, old: u8, new: u8) -> Result<Option<PieceEvent>, DecodeError> {
    if old == new {
        return Ok(None);
    }

    // Empty squares carry no piece, so the event piece is whichever side is occupied.
    let (code, lifted) = if new == 0 { (old, true) } else { (new, false) };
    let piece = piece_for_code(code)
        .flatten()
        .ok_or(DecodeError::UnknownPieceCode {
            square,
            code,
            count: 1,
        })?;

    Ok(Some(if lifted {
        PieceEvent::Up { square, piece }
    } else {
        PieceEvent::Down { square, piece }
    }))
}
