use std::time::Duration;

use crate::leds::LedOrientation;
use crate::protocol::INITIALIZATION_CODE;

/// Default pause between blink ticks while waiting for the board to change.
pub const DEFAULT_BLINK_INTERVAL: Duration = Duration::from_millis(400);

/// Default number of notifications buffered between transport and session.
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Settings for a [`BoardSession`](crate::session::BoardSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Longest single wait inside `wait_for_change`
    pub blink_interval: Duration,
    /// Capacity of the notification queue
    pub queue_capacity: usize,
    /// Sent once on connect, before notifications are processed
    pub init_command: Vec<u8>,
    /// Name squares as seen from the black side
    pub reversed_notation: bool,
    pub led_orientation: LedOrientation,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            blink_interval: DEFAULT_BLINK_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            init_command: INITIALIZATION_CODE.to_vec(),
            reversed_notation: false,
            led_orientation: LedOrientation::default(),
        }
    }
}
