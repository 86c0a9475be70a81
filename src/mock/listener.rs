use std::sync::{Arc, Mutex};

use shakmaty::{Piece, Square};

use crate::PieceListener;
use crate::changes::PieceEvent;

/// Listener that keeps every event it receives.
///
/// Clones share the recorded events, so a test can keep a handle while the
/// session owns the listener.
#[derive(Debug, Clone, Default)]
pub struct RecordingListener {
    events: Arc<Mutex<Vec<PieceEvent>>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, oldest first.
    pub fn events(&self) -> Vec<PieceEvent> {
        self.events
            .lock()
            .expect("listener lock poisoned")
            .clone()
    }

    /// Removes and returns the recorded events.
    pub fn take(&self) -> Vec<PieceEvent> {
        std::mem::take(&mut *self.events.lock().expect("listener lock poisoned"))
    }

    fn record(&self, event: PieceEvent) {
        self.events
            .lock()
            .expect("listener lock poisoned")
            .push(event);
    }
}

impl PieceListener for RecordingListener {
    async fn on_piece_up(&mut self, square: Square, piece: Piece) {
        self.record(PieceEvent::Up { square, piece });
    }

    async fn on_piece_down(&mut self, square: Square, piece: Piece) {
        self.record(PieceEvent::Down { square, piece });
    }
}
