use shakmaty::{Piece, Square};
use tokio::sync::mpsc;

pub mod board;
pub mod changes;
pub mod config;
pub mod leds;
pub mod mapping;
pub mod mock;
pub mod notation;
pub mod protocol;
pub mod session;

/// Sending half of the notification queue.
///
/// The transport pushes every raw notification payload into it, in the order
/// the board sent them.
pub type NotificationSender = mpsc::Sender<Vec<u8>>;

/// Trait for the link to the physical board.
///
/// Abstracts over a BLE connection and in-memory mocks, so the session never
/// deals with discovery, pairing or reconnects.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Error type for link failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a command to the board. No acknowledgement is expected.
    async fn write(&mut self, command: &[u8]) -> Result<(), Self::Error>;

    /// Start delivering notification payloads into `notifications`.
    async fn subscribe(&mut self, notifications: NotificationSender) -> Result<(), Self::Error>;

    /// Stop delivering notifications.
    async fn unsubscribe(&mut self) -> Result<(), Self::Error>;
}

/// Trait for reacting to pieces being lifted and placed.
///
/// Implemented by the application (game logic, move guidance, ...). Calls
/// arrive in sensor order and may suspend; later notifications wait in the
/// queue meanwhile.
#[allow(async_fn_in_trait)]
pub trait PieceListener {
    /// `piece` was lifted from `square`.
    async fn on_piece_up(&mut self, square: Square, piece: Piece);

    /// `piece` was put on `square`.
    async fn on_piece_down(&mut self, square: Square, piece: Piece);
}

/// Trait for the application code that runs while a board is connected.
///
/// [`BoardSession::run`](session::BoardSession::run) connects, hands the
/// session to [`play`](GameLoop::play) and disconnects when it returns.
#[allow(async_fn_in_trait)]
pub trait GameLoop<T, L> {
    /// Drive the connected session until the game is over.
    async fn play(
        &mut self,
        session: &mut session::BoardSession<T, L>,
    ) -> Result<(), session::SessionError>;
}

/// A [`PieceListener`] that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl PieceListener for NullListener {
    async fn on_piece_up(&mut self, _square: Square, _piece: Piece) {}

    async fn on_piece_down(&mut self, _square: Square, _piece: Piece) {}
}
