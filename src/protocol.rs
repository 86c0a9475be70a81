//! Wire constants of the Chessnut Air board protocol.
//!
//! Transport implementations use the characteristic ids and device names to
//! find and talk to the board; the core only relies on the payload offsets
//! and command opcodes.

/// Number of bytes describing the board inside a notification.
pub const BOARD_BYTES: usize = 32;

/// Offset of the board bytes inside a notification payload.
pub const PAYLOAD_BOARD_OFFSET: usize = 2;

/// Minimum length of a notification payload carrying a full board.
pub const MIN_PAYLOAD_LEN: usize = PAYLOAD_BOARD_OFFSET + BOARD_BYTES;

/// Opcode prefix of the LED command.
pub const LED_OPCODE: [u8; 2] = [0x0A, 0x08];

/// Sent once after connecting to make the board start streaming its state.
pub const INITIALIZATION_CODE: [u8; 3] = [0x21, 0x01, 0x00];

/// Characteristic accepting commands (LED frames, initialization).
pub const WRITE_CHARACTERISTIC: &str = "1B7E8272-2877-41C3-B46E-CF057C562023";

/// Characteristic notifying board state changes.
pub const READ_DATA_CHARACTERISTIC: &str = "1B7E8262-2877-41C3-B46E-CF057C562023";

/// Advertised name fragments identifying supported boards.
pub const DEVICE_NAMES: [&str; 2] = ["Chessnut Air", "Smart Chess"];

/// Returns true if an advertised device name belongs to a supported board.
pub fn is_supported_device(name: &str) -> bool {
    DEVICE_NAMES.iter().any(|known| name.contains(known))
}
