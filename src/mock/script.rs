use std::collections::VecDeque;

use shakmaty::{Board, Piece, Square};
use thiserror::Error;

use crate::board::{BoardState, RawBoard};

/// Header the board puts in front of the 32 board bytes.
const PAYLOAD_HEADER: [u8; 2] = [0x01, 0x24];

/// Trailing bytes the board appends after the board bytes.
const PAYLOAD_TRAILER: [u8; 4] = [0; 4];

/// Error when parsing a board script.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid board script token: '{0}'")]
pub struct ParseError(String);

/// One physical action on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Lift(Square),
    Place(Square, Piece),
}

/// Wraps board bytes into a notification payload as the board sends it.
pub fn frame_payload(raw: &RawBoard) -> Vec<u8> {
    let mut payload = Vec::with_capacity(PAYLOAD_HEADER.len() + 32 + PAYLOAD_TRAILER.len());
    payload.extend_from_slice(&PAYLOAD_HEADER);
    payload.extend_from_slice(raw.bytes());
    payload.extend_from_slice(&PAYLOAD_TRAILER);
    payload
}

/// A scriptable board that produces notification payloads.
///
/// Maintains the physical piece placement and applies script batches on
/// demand. New script can be appended at any time for interactive use.
#[derive(Debug, Clone)]
pub struct ScriptedBoard {
    state: BoardState,
    pending_batches: VecDeque<Vec<Action>>,
}

impl Default for ScriptedBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedBoard {
    /// Create with the starting chess position.
    pub fn new() -> Self {
        Self::from_state(BoardState::from(&Board::default()))
    }

    /// Create from a specific placement.
    pub fn from_state(state: BoardState) -> Self {
        Self {
            state,
            pending_batches: VecDeque::new(),
        }
    }

    /// Current placement.
    #[inline]
    pub fn state(&self) -> BoardState {
        self.state
    }

    /// Notification payload for the current placement.
    pub fn payload(&self) -> Vec<u8> {
        frame_payload(&RawBoard::encode(&self.state))
    }

    /// Replace the placement (for FEN loading), dropping pending batches.
    pub fn load_state(&mut self, state: BoardState) {
        self.state = state;
        self.pending_batches.clear();
    }

    /// Parse and queue additional script for execution.
    ///
    /// Format:
    /// - A square (e.g., "e2") lifts whatever stands there
    /// - A square with a piece (e.g., "e4=P") places that piece
    /// - Spaces separate actions in the same batch
    /// - Periods (".") end a batch
    ///
    /// Examples:
    /// - `"e2 e4=P."` - Move the e-pawn in one update
    /// - `"e2. e4=P."` - Lift, update, place, update
    /// - `"d5. e4 d5=P."` - Capture on d5
    pub fn push_script(&mut self, script: &str) -> Result<(), ParseError> {
        let batches = parse_script(script)?;
        self.pending_batches.extend(batches);
        Ok(())
    }

    /// Apply the next pending batch, returning the resulting payload.
    /// Returns None if no pending batches.
    pub fn tick(&mut self) -> Option<Vec<u8>> {
        let batch = self.pending_batches.pop_front()?;
        for action in batch {
            self.state = match action {
                Action::Lift(square) => self.state.with_piece(square, None),
                Action::Place(square, piece) => self.state.with_piece(square, Some(piece)),
            };
        }
        Some(self.payload())
    }

    /// Apply all pending batches, calling the provided callback for each payload.
    pub fn drain<F>(&mut self, mut on_tick: F)
    where
        F: FnMut(Vec<u8>),
    {
        while let Some(payload) = self.tick() {
            on_tick(payload);
        }
    }
}

/// Parse a board script into batches of actions.
fn parse_script(script: &str) -> Result<Vec<Vec<Action>>, ParseError> {
    let mut batches: Vec<Vec<Action>> = vec![Vec::new()];
    let mut current_token = String::new();
    let mut chars = script.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                flush_token(&mut current_token, &mut batches)?;
                batches.push(Vec::new());
            }
            c if c.is_whitespace() => {
                flush_token(&mut current_token, &mut batches)?;
            }
            _ => {
                current_token.push(ch);

                // Squares are 2 characters, placements add "=<piece>"
                let complete = match current_token.len() {
                    2 => chars.peek() != Some(&'='),
                    4 => true,
                    _ => false,
                };
                if complete {
                    flush_token(&mut current_token, &mut batches)?;
                }
            }
        }
    }

    // Flush any remaining token
    flush_token(&mut current_token, &mut batches)?;

    // Remove empty batches
    batches.retain(|b| !b.is_empty());
    Ok(batches)
}

/// Add current token to the last batch and clear it.
fn flush_token(token: &mut String, batches: &mut [Vec<Action>]) -> Result<(), ParseError> {
    if !token.is_empty() {
        let action = parse_action(token.trim()).ok_or_else(|| ParseError(token.clone()))?;
        batches
            .last_mut()
            .expect("batches should never be empty")
            .push(action);
        token.clear();
    }
    Ok(())
}

fn parse_action(token: &str) -> Option<Action> {
    let Some((square, piece)) = token.split_once('=') else {
        return token.parse().ok().map(Action::Lift);
    };

    let square: Square = square.parse().ok()?;
    let mut chars = piece.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Piece::from_char(ch).map(|piece| Action::Place(square, piece)),
        _ => None,
    }
}
