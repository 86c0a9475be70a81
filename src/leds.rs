use std::fmt;

use shakmaty::{Bitboard, Square};

use crate::protocol::LED_OPCODE;

/// Length of the LED command: opcode followed by the frame.
pub const LED_COMMAND_LEN: usize = LED_OPCODE.len() + 8;

/// Device-specific flips applied between board squares and LED bits.
///
/// The default matches a board read from the white side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedOrientation {
    /// Swap the a- and h-file sides of the grid
    pub mirror_files: bool,
    /// Swap the rank 1 and rank 8 sides of the grid
    pub mirror_ranks: bool,
}

impl LedOrientation {
    /// Maps a square onto the LED that sits under it. Applying it twice is a no-op.
    #[inline]
    pub fn apply(self, square: Square) -> Square {
        let square = if self.mirror_files {
            square.flip_horizontal()
        } else {
            square
        };
        if self.mirror_ranks {
            square.flip_vertical()
        } else {
            square
        }
    }
}

/// One LED grid state: byte `7 - rank` holds that rank, bit 7 is the a-file.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct LedFrame([u8; 8]);

impl LedFrame {
    /// All LEDs off.
    pub const DARK: Self = Self([0; 8]);

    #[inline]
    pub const fn new(bytes: [u8; 8]) -> Self {
        Self(bytes)
    }

    /// Lights exactly the LEDs under `squares`.
    pub fn encode(squares: Bitboard, orientation: LedOrientation) -> Self {
        let mut frame = [0u8; 8];
        for square in squares {
            let (byte, bit) = led_position(orientation.apply(square));
            frame[byte] |= 1 << bit;
        }
        Self(frame)
    }

    /// Squares whose LED is lit in this frame.
    pub fn decode(&self, orientation: LedOrientation) -> Bitboard {
        Square::ALL
            .into_iter()
            .filter(|&square| {
                let (byte, bit) = led_position(orientation.apply(square));
                self.0[byte] & (1 << bit) != 0
            })
            .collect()
    }

    #[inline]
    pub fn bytes(&self) -> &[u8; 8] {
        &self.0
    }

    /// The full command written to the board.
    pub fn command(&self) -> [u8; LED_COMMAND_LEN] {
        let mut command = [0u8; LED_COMMAND_LEN];
        command[..LED_OPCODE.len()].copy_from_slice(&LED_OPCODE);
        command[LED_OPCODE.len()..].copy_from_slice(&self.0);
        command
    }

    /// Parses a command previously produced by [`LedFrame::command`].
    pub fn from_command(command: &[u8]) -> Option<Self> {
        let frame = command.strip_prefix(&LED_OPCODE[..])?;
        let bytes: [u8; 8] = frame.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl fmt::Debug for LedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LedFrame")
            .field(&format_args!("{:016X}", u64::from_be_bytes(self.0)))
            .finish()
    }
}

/// Byte index and bit number of a square's LED.
#[inline]
fn led_position(square: Square) -> (usize, u8) {
    let rank = square.rank() as usize;
    let file = square.file() as u8;
    (7 - rank, 7 - file)
}

/// Alternates between two illumination sets.
///
/// Every [`advance`](BlinkScheduler::advance) flips the tick. "On" ticks light
/// `steady | blinking`, "off" ticks light `steady` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlinkScheduler {
    steady: Bitboard,
    blinking: Bitboard,
    tick: bool,
}

impl BlinkScheduler {
    pub const fn new() -> Self {
        Self {
            steady: Bitboard::EMPTY,
            blinking: Bitboard::EMPTY,
            tick: false,
        }
    }

    #[inline]
    pub fn steady(&self) -> Bitboard {
        self.steady
    }

    #[inline]
    pub fn blinking(&self) -> Bitboard {
        self.blinking
    }

    #[inline]
    pub fn set_steady(&mut self, squares: Bitboard) {
        self.steady = squares;
    }

    #[inline]
    pub fn set_blinking(&mut self, squares: Bitboard) {
        self.blinking = squares;
    }

    /// True if the last advance was an "on" tick.
    #[inline]
    pub fn is_on(&self) -> bool {
        self.tick
    }

    /// Flips the tick and returns the squares to light now.
    pub fn advance(&mut self) -> Bitboard {
        self.tick = !self.tick;
        if self.tick {
            self.steady | self.blinking
        } else {
            self.steady
        }
    }
}
