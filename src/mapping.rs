use shakmaty::{Bitboard, Square};
use thiserror::Error;

/// Error when a square name cannot be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid square notation: '{0}'")]
pub struct SquareNameError(pub String);

/// Number of squares reported by the sensor grid.
pub const NUM_SQUARES: usize = 64;

/// Files as they appear in sensor order (index 0 is the h-file).
const SENSOR_FILES: &[u8; 8] = b"hgfedcba";

/// Maps a sensor index (0-63, in stream order) to its board square.
///
/// The board reports squares backwards: index 0 is h8, index 63 is a1.
///
/// # Panics
/// Panics if `index >= 64`.
#[inline]
pub fn sensor_square(index: usize) -> Square {
    Square::ALL[NUM_SQUARES - 1 - index]
}

/// Maps a board square back to its position in the sensor stream.
#[inline]
pub fn sensor_index(square: Square) -> usize {
    NUM_SQUARES - 1 - square as usize
}

/// Two-character notation for a sensor index.
///
/// With `reversed` set, rank 1 is the edge the stream starts from, i.e. the
/// board is read from the black side.
pub fn sensor_notation(index: usize, reversed: bool) -> String {
    debug_assert!(index < NUM_SQUARES);
    let file = SENSOR_FILES[index % 8] as char;
    let rank = if reversed { index / 8 + 1 } else { 8 - index / 8 };
    format!("{file}{rank}")
}

/// Collects square names like `["e3", "a4"]` into a [`Bitboard`].
///
/// # Examples
/// ```
/// # use chessnut_link::mapping::parse_squares;
/// # use shakmaty::Square;
/// let squares = parse_squares(["e4", "e5"]).unwrap();
/// assert!(squares.contains(Square::E4));
/// assert_eq!(squares.count(), 2);
/// ```
pub fn parse_squares<I, S>(names: I) -> Result<Bitboard, SquareNameError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| {
            let name = name.as_ref().trim();
            name.parse::<Square>().map_err(|_| SquareNameError(name.to_string()))
        })
        .collect()
}
