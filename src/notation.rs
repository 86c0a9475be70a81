//! Board-field notation (the piece placement part of FEN).
//!
//! [`compose_board_fen`] renders a decoded board and [`compare`] checks a
//! decoded board against a target position, e.g. to guide the player while
//! setting up pieces.

use shakmaty::{File, Piece, Square};
use thiserror::Error;

use crate::board::BoardState;
use crate::mapping::NUM_SQUARES;

/// Marker for one expected-empty square in an expanded board field.
const EMPTY_MARKER: char = '1';

/// Errors in a target notation string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotationError {
    /// No board field at all
    #[error("notation is empty")]
    Empty,

    /// A character that is neither a piece, a run length 1-8 nor a separator
    #[error("invalid character '{0}' in board field")]
    InvalidChar(char),

    /// The board field does not have eight ranks
    #[error("expected 8 ranks, found {0}")]
    RankCount(usize),

    /// A rank does not describe exactly eight squares
    #[error("rank {rank} describes {squares} squares, expected 8")]
    RankLength { rank: usize, squares: usize },
}

/// A square whose content differs from the target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mismatch {
    /// What the sensors report
    pub current: Option<Piece>,
    pub square: Square,
    /// What the target position wants
    pub expected: Option<Piece>,
}

/// Renders the board field of `state`, e.g. `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR`.
///
/// Squares are walked in sensor order, so every rank comes out mirrored and
/// is flipped back before joining.
pub fn compose_board_fen(state: &BoardState) -> String {
    let mut raw = String::with_capacity(72);
    let mut empty_run = 0u8;

    for (square, piece) in state.iter_sensor_order() {
        match piece {
            Some(piece) => {
                flush_empty_run(&mut raw, &mut empty_run);
                raw.push(piece.char());
            }
            None => empty_run += 1,
        }
        if square.file() == File::A {
            flush_empty_run(&mut raw, &mut empty_run);
            raw.push('/');
        }
    }

    raw.trim_end_matches('/')
        .split('/')
        .map(|rank| rank.chars().rev().collect::<String>())
        .collect::<Vec<_>>()
        .join("/")
}

fn flush_empty_run(out: &mut String, empty_run: &mut u8) {
    if *empty_run > 0 {
        out.push(char::from(b'0' + *empty_run));
        *empty_run = 0;
    }
}

/// Lists every square where `state` differs from `target`.
///
/// `target` may be a full FEN; only the first space-delimited field is read.
/// Mismatches come in sensor order (h8 first).
pub fn compare(state: &BoardState, target: &str) -> Result<Vec<Mismatch>, NotationError> {
    let expected = expand_board_field(target)?;

    Ok(state
        .iter_sensor_order()
        .filter_map(|(square, current)| {
            let expected = expected[square as usize];
            (current != expected).then_some(Mismatch {
                current,
                square,
                expected,
            })
        })
        .collect())
}

/// Expands a board field into one entry per square, indexed a1 = 0 .. h8 = 63.
fn expand_board_field(target: &str) -> Result<[Option<Piece>; NUM_SQUARES], NotationError> {
    let field = target.split_whitespace().next().ok_or(NotationError::Empty)?;

    let ranks: Vec<&str> = field.split('/').collect();
    if ranks.len() != 8 {
        return Err(NotationError::RankCount(ranks.len()));
    }

    // Notation lists rank 8 first, squares are numbered from rank 1.
    let mut expected = [None; NUM_SQUARES];
    for (i, rank) in ranks.iter().rev().enumerate() {
        let markers = expand_rank(rank, i + 1)?;
        for (slot, marker) in expected[i * 8..(i + 1) * 8].iter_mut().zip(markers) {
            *slot = if marker == EMPTY_MARKER {
                None
            } else {
                Piece::from_char(marker)
            };
        }
    }
    Ok(expected)
}

/// Replaces run lengths with one empty marker per square.
fn expand_rank(rank: &str, rank_number: usize) -> Result<Vec<char>, NotationError> {
    let mut markers = Vec::with_capacity(8);
    for ch in rank.chars() {
        match ch {
            EMPTY_MARKER => markers.push(EMPTY_MARKER),
            '2'..='8' => {
                let run = ch.to_digit(10).unwrap_or(0) as usize;
                markers.extend(std::iter::repeat_n(EMPTY_MARKER, run));
            }
            _ if Piece::from_char(ch).is_some() => markers.push(ch),
            _ => return Err(NotationError::InvalidChar(ch)),
        }
    }

    if markers.len() != 8 {
        return Err(NotationError::RankLength {
            rank: rank_number,
            squares: markers.len(),
        });
    }
    Ok(markers)
}
