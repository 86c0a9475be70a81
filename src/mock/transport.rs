use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::mpsc::error::TrySendError;

use crate::leds::LedFrame;
use crate::{NotificationSender, Transport};

/// Error types for the in-memory transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MockTransportError {
    #[error("write rejected by mock transport")]
    WriteRejected,
    #[error("unsubscribe rejected by mock transport")]
    UnsubscribeRejected,
    #[error("no session is subscribed")]
    NotSubscribed,
    #[error("notification queue is full")]
    QueueFull,
}

#[derive(Debug, Default)]
struct Shared {
    writes: Vec<Vec<u8>>,
    notifier: Option<NotificationSender>,
    reject_writes: bool,
    reject_unsubscribe: bool,
}

/// In-memory transport for tests and the simulator.
///
/// Clones share state: hand one clone to the session and keep another to
/// push notifications and inspect written commands.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    shared: Arc<Mutex<Shared>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().expect("mock transport lock poisoned")
    }

    /// Every command written so far, oldest first.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().writes.clone()
    }

    /// Written commands that were LED frames.
    pub fn led_frames(&self) -> Vec<LedFrame> {
        self.lock()
            .writes
            .iter()
            .filter_map(|command| LedFrame::from_command(command))
            .collect()
    }

    /// Most recent LED frame, if any was written.
    pub fn last_led_frame(&self) -> Option<LedFrame> {
        self.led_frames().pop()
    }

    pub fn clear_writes(&self) {
        self.lock().writes.clear();
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().notifier.is_some()
    }

    /// Make subsequent writes fail.
    pub fn reject_writes(&self, reject: bool) {
        self.lock().reject_writes = reject;
    }

    /// Make subsequent unsubscribe calls fail, leaving the subscription in place.
    pub fn reject_unsubscribe(&self, reject: bool) {
        self.lock().reject_unsubscribe = reject;
    }

    /// Queue a notification payload as if the board had sent it.
    pub fn notify(&self, payload: Vec<u8>) -> Result<(), MockTransportError> {
        let shared = self.lock();
        let notifier = shared
            .notifier
            .as_ref()
            .ok_or(MockTransportError::NotSubscribed)?;
        notifier.try_send(payload).map_err(|err| match err {
            TrySendError::Full(_) => MockTransportError::QueueFull,
            TrySendError::Closed(_) => MockTransportError::NotSubscribed,
        })
    }
}

impl Transport for MockTransport {
    type Error = MockTransportError;

    async fn write(&mut self, command: &[u8]) -> Result<(), Self::Error> {
        let mut shared = self.lock();
        if shared.reject_writes {
            return Err(MockTransportError::WriteRejected);
        }
        shared.writes.push(command.to_vec());
        Ok(())
    }

    async fn subscribe(&mut self, notifications: NotificationSender) -> Result<(), Self::Error> {
        self.lock().notifier = Some(notifications);
        Ok(())
    }

    async fn unsubscribe(&mut self) -> Result<(), Self::Error> {
        let mut shared = self.lock();
        if shared.reject_unsubscribe {
            return Err(MockTransportError::UnsubscribeRejected);
        }
        shared
            .notifier
            .take()
            .map(|_| ())
            .ok_or(MockTransportError::NotSubscribed)
    }
}
