use std::fmt;

use shakmaty::{Bitboard, Board, Color, Piece, Role, Square};
use thiserror::Error;

use crate::mapping::{NUM_SQUARES, sensor_square};
use crate::notation::compose_board_fen;
use crate::protocol::{BOARD_BYTES, MIN_PAYLOAD_LEN, PAYLOAD_BOARD_OFFSET};

/// Errors raised while turning sensor bytes into a board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The notification is too short to carry a full board
    #[error("payload too short: {len} bytes, expected at least {}", MIN_PAYLOAD_LEN)]
    PayloadTooShort { len: usize },

    /// A nibble holds a value without a piece mapping
    #[error("unknown piece code {code:#x} on {square} ({count} bad squares in update)")]
    UnknownPieceCode {
        square: Square,
        code: u8,
        count: usize,
    },
}

const fn piece(color: Color, role: Role) -> Option<Piece> {
    Some(Piece { color, role })
}

/// Piece behind each nibble value. Values past the end have no mapping.
const PIECE_CODES: [Option<Piece>; 13] = [
    None,
    piece(Color::Black, Role::Queen),
    piece(Color::Black, Role::King),
    piece(Color::Black, Role::Bishop),
    piece(Color::Black, Role::Pawn),
    piece(Color::Black, Role::Knight),
    piece(Color::White, Role::Rook),
    piece(Color::White, Role::Pawn),
    piece(Color::Black, Role::Rook),
    piece(Color::White, Role::Bishop),
    piece(Color::White, Role::Knight),
    piece(Color::White, Role::Queen),
    piece(Color::White, Role::King),
];

/// Looks up the piece for a nibble. `None` means the code is unknown,
/// `Some(None)` an empty square.
#[inline]
pub(crate) fn piece_for_code(code: u8) -> Option<Option<Piece>> {
    PIECE_CODES.get(usize::from(code)).copied()
}

/// Nibble value the board uses for a square's content.
pub fn code_for_piece(piece: Option<Piece>) -> u8 {
    PIECE_CODES
        .iter()
        .position(|candidate| *candidate == piece)
        .map_or(0, |code| code as u8)
}

/// The 32 board bytes of a notification, exactly as the sensors report them.
///
/// Byte `i` packs sensor indices `2i` (low nibble) and `2i + 1` (high nibble).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBoard([u8; BOARD_BYTES]);

impl RawBoard {
    #[inline]
    pub const fn new(bytes: [u8; BOARD_BYTES]) -> Self {
        Self(bytes)
    }

    /// An all-empty board.
    pub const EMPTY: Self = Self([0; BOARD_BYTES]);

    /// Strips the transport framing off a notification payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self, DecodeError> {
        let bytes = payload
            .get(PAYLOAD_BOARD_OFFSET..MIN_PAYLOAD_LEN)
            .ok_or(DecodeError::PayloadTooShort { len: payload.len() })?;
        let mut raw = [0; BOARD_BYTES];
        raw.copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// Packs a decoded board back into sensor bytes.
    pub fn encode(board: &BoardState) -> Self {
        let mut raw = [0; BOARD_BYTES];
        for (i, byte) in raw.iter_mut().enumerate() {
            let low = code_for_piece(board.piece_at(sensor_square(2 * i)));
            let high = code_for_piece(board.piece_at(sensor_square(2 * i + 1)));
            *byte = low | (high << 4);
        }
        Self(raw)
    }

    #[inline]
    pub fn bytes(&self) -> &[u8; BOARD_BYTES] {
        &self.0
    }

    /// Every square with its nibble, in sensor order (h8 first).
    pub fn nibbles(&self) -> impl Iterator<Item = (Square, u8)> + '_ {
        self.0.iter().enumerate().flat_map(|(i, &byte)| {
            [
                (sensor_square(2 * i), byte & 0x0F),
                (sensor_square(2 * i + 1), byte >> 4),
            ]
        })
    }
}

impl Default for RawBoard {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for RawBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBoard(")?;
        for byte in self.0 {
            write!(f, "{byte:02X}")?;
        }
        write!(f, ")")
    }
}

/// Occupancy of every square, decoded from a [`RawBoard`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BoardState {
    squares: [Option<Piece>; NUM_SQUARES],
}

impl BoardState {
    /// A board with no pieces.
    pub const fn empty() -> Self {
        Self {
            squares: [None; NUM_SQUARES],
        }
    }

    /// Decodes sensor bytes, rejecting the whole update if any nibble is unknown.
    pub fn decode(raw: &RawBoard) -> Result<Self, DecodeError> {
        let (state, rejected) = Self::decode_partial(raw);
        match rejected.first() {
            None => Ok(state),
            Some(&(square, code)) => Err(DecodeError::UnknownPieceCode {
                square,
                code,
                count: rejected.len(),
            }),
        }
    }

    /// Decodes every square it can.
    ///
    /// Squares with an unknown code are left empty and returned alongside the
    /// board, in sensor order.
    pub fn decode_partial(raw: &RawBoard) -> (Self, Vec<(Square, u8)>) {
        let mut state = Self::empty();
        let mut rejected = Vec::new();
        for (square, code) in raw.nibbles() {
            match piece_for_code(code) {
                Some(piece) => state.squares[square as usize] = piece,
                None => rejected.push((square, code)),
            }
        }
        (state, rejected)
    }

    #[inline]
    pub fn piece_at(&self, square: Square) -> Option<Piece> {
        self.squares[square as usize]
    }

    /// Returns a copy with `square` set to `piece`.
    #[must_use]
    pub fn with_piece(mut self, square: Square, piece: Option<Piece>) -> Self {
        self.squares[square as usize] = piece;
        self
    }

    /// Squares with their content in sensor order, h8 down to a1.
    pub fn iter_sensor_order(&self) -> impl Iterator<Item = (Square, Option<Piece>)> + '_ {
        (0..NUM_SQUARES).map(|index| {
            let square = sensor_square(index);
            (square, self.piece_at(square))
        })
    }

    /// Squares holding a piece.
    pub fn occupied(&self) -> Bitboard {
        Square::ALL
            .into_iter()
            .filter(|&square| self.piece_at(square).is_some())
            .collect()
    }

    /// Converts into a [`shakmaty::Board`] for use with chess logic.
    pub fn to_board(&self) -> Board {
        let mut board = Board::empty();
        for square in Square::ALL {
            if let Some(piece) = self.piece_at(square) {
                board.set_piece_at(square, piece);
            }
        }
        board
    }
}

impl Default for BoardState {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<&Board> for BoardState {
    fn from(board: &Board) -> Self {
        Square::ALL
            .into_iter()
            .fold(Self::empty(), |state, square| {
                state.with_piece(square, board.piece_at(square))
            })
    }
}

impl fmt::Debug for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("BoardState")
            .field(&compose_board_fen(self))
            .finish()
    }
}
