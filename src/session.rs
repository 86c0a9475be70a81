use std::collections::VecDeque;
use std::time::Duration;

use log::{debug, info, warn};
use shakmaty::{Bitboard, Square};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::yield_now;
use tokio::time::{Instant, sleep};

use crate::board::{BoardState, DecodeError, RawBoard};
use crate::changes::{PieceEvent, detect_changes};
use crate::config::SessionConfig;
use crate::leds::{BlinkScheduler, LedFrame};
use crate::mapping::{sensor_index, sensor_notation};
use crate::notation::{Mismatch, NotationError, compare, compose_board_fen};
use crate::{GameLoop, PieceListener, Transport};

/// Errors surfaced by [`BoardSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// A notification could not be decoded; the previous board is kept
    #[error("dropped board update: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid target position: {0}")]
    Notation(#[from] NotationError),

    /// The transport failed to write or (un)subscribe
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("session is not connected")]
    NotConnected,

    #[error("no board state received yet")]
    NoBoardState,
}

fn transport_error<E>(err: E) -> SessionError
where
    E: std::error::Error + Send + Sync + 'static,
{
    SessionError::Transport(Box::new(err))
}

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Disconnected,
    /// Connected, but the board has not reported its state yet
    AwaitingFirstState,
    /// A baseline exists and changes are turned into events
    Tracking,
}

/// Last accepted board, kept as raw bytes for diffing and decoded for queries.
#[derive(Debug, Clone, Copy)]
struct Snapshot {
    raw: RawBoard,
    board: BoardState,
}

#[derive(Debug)]
enum State {
    Disconnected,
    AwaitingFirstState,
    Tracking(Snapshot),
}

/// Live connection to one board.
///
/// Owns the transport and the listener. Notifications are queued by the
/// transport and processed one at a time by whoever drives the session, so
/// two payloads are never diffed against the same baseline.
pub struct BoardSession<T, L> {
    transport: T,
    listener: L,
    config: SessionConfig,
    state: State,
    notifications: Option<mpsc::Receiver<Vec<u8>>>,
    /// Events of accepted updates the listener has not finished handling yet
    undelivered: VecDeque<PieceEvent>,
    /// Set by every accepted update, cleared by `wait_for_change`
    changed: bool,
    blink: BlinkScheduler,
}

impl<T: Transport, L: PieceListener> BoardSession<T, L> {
    pub fn new(transport: T, listener: L, config: SessionConfig) -> Self {
        Self {
            transport,
            listener,
            config,
            state: State::Disconnected,
            notifications: None,
            undelivered: VecDeque::new(),
            changed: false,
            blink: BlinkScheduler::new(),
        }
    }

    /// Sends the initialization command and starts listening for notifications.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if !matches!(self.state, State::Disconnected) {
            debug!("connect called on a connected session");
            return Ok(());
        }

        self.transport
            .write(&self.config.init_command)
            .await
            .map_err(transport_error)?;

        let (sender, receiver) = mpsc::channel(self.config.queue_capacity.max(1));
        self.transport
            .subscribe(sender)
            .await
            .map_err(transport_error)?;

        self.notifications = Some(receiver);
        self.state = State::AwaitingFirstState;
        self.changed = false;
        info!("board connected, waiting for first state");
        Ok(())
    }

    /// Stops notifications and forgets the tracked board.
    ///
    /// If the transport fails to unsubscribe, the session stays connected.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        if matches!(self.state, State::Disconnected) {
            return Ok(());
        }

        self.transport.unsubscribe().await.map_err(transport_error)?;

        self.state = State::Disconnected;
        self.notifications = None;
        self.undelivered.clear();
        info!("board disconnected");
        Ok(())
    }

    /// Connects, hands the session to `game` and disconnects once it returns.
    ///
    /// The session is disconnected even when the game loop fails; its error
    /// takes precedence over a failure to disconnect.
    pub async fn run<G>(&mut self, game: &mut G) -> Result<(), SessionError>
    where
        G: GameLoop<T, L>,
    {
        self.connect().await?;
        let outcome = game.play(self).await;
        let stopped = self
            .disconnect()
            .await
            .inspect_err(|err| warn!("failed to stop notifications: {err}"));
        outcome.and(stopped)
    }

    pub fn phase(&self) -> SessionPhase {
        match self.state {
            State::Disconnected => SessionPhase::Disconnected,
            State::AwaitingFirstState => SessionPhase::AwaitingFirstState,
            State::Tracking(_) => SessionPhase::Tracking,
        }
    }

    /// Decodes one notification and dispatches the resulting events.
    ///
    /// The first valid payload only sets the baseline. A payload that fails to
    /// decode is dropped and the previous board stays in place. Events left
    /// over from an interrupted dispatch are delivered first.
    pub async fn process_payload(
        &mut self,
        payload: &[u8],
    ) -> Result<Vec<PieceEvent>, SessionError> {
        if matches!(self.state, State::Disconnected) {
            return Err(SessionError::NotConnected);
        }
        self.deliver_undelivered().await;

        let (raw, board) = decode_payload(payload)
            .inspect_err(|err| warn!("dropping board update: {err}"))?;

        let events = match &self.state {
            State::Tracking(snapshot) if snapshot.raw == raw => return Ok(Vec::new()),
            State::Tracking(snapshot) => detect_changes(&snapshot.raw, &raw)
                .inspect_err(|err| warn!("dropping board update: {err}"))?,
            _ => {
                info!("first board state: {}", compose_board_fen(&board));
                Vec::new()
            }
        };

        self.state = State::Tracking(Snapshot { raw, board });
        self.changed = true;

        self.undelivered.extend(events.iter().copied());
        self.deliver_undelivered().await;
        Ok(events)
    }

    /// Hands queued events to the listener, oldest first.
    ///
    /// An event leaves the queue only once its callback has returned, so a
    /// callback interrupted by cancellation is repeated on the next call.
    async fn deliver_undelivered(&mut self) {
        while let Some(&event) = self.undelivered.front() {
            self.dispatch(event).await;
            self.undelivered.pop_front();
        }
    }

    async fn dispatch(&mut self, event: PieceEvent) {
        match event {
            PieceEvent::Up { square, piece } => {
                debug!("piece up: {} {}", piece.char(), self.square_name(square));
                self.listener.on_piece_up(square, piece).await;
            }
            PieceEvent::Down { square, piece } => {
                debug!("piece down: {} {}", piece.char(), self.square_name(square));
                self.listener.on_piece_down(square, piece).await;
            }
        }
    }

    /// Waits for the next queued notification and processes it.
    ///
    /// Returns `Ok(None)` once the transport has closed the queue.
    pub async fn process_next(&mut self) -> Result<Option<Vec<PieceEvent>>, SessionError> {
        if self.notifications.is_none() {
            return Err(SessionError::NotConnected);
        }
        self.deliver_undelivered().await;

        let receiver = self
            .notifications
            .as_mut()
            .ok_or(SessionError::NotConnected)?;
        let Some(payload) = receiver.recv().await else {
            return Ok(None);
        };
        self.process_payload(&payload).await.map(Some)
    }

    /// Processes every notification already queued, without waiting for more.
    ///
    /// Undecodable payloads are logged and skipped. Returns how many payloads
    /// were taken off the queue.
    pub async fn pump(&mut self) -> Result<usize, SessionError> {
        if self.notifications.is_none() {
            return Err(SessionError::NotConnected);
        }
        self.deliver_undelivered().await;

        let mut processed = 0;
        loop {
            let receiver = self
                .notifications
                .as_mut()
                .ok_or(SessionError::NotConnected)?;
            let Ok(payload) = receiver.try_recv() else {
                return Ok(processed);
            };
            processed += 1;

            match self.process_payload(&payload).await {
                Ok(_) | Err(SessionError::Decode(_)) => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Blinks the LEDs until the board changes or `timeout` elapses.
    ///
    /// Returns `true` on a change, `false` on timeout. A zero timeout waits
    /// forever. Each round lights one blink frame, sleeps for at most the
    /// configured interval and then processes queued notifications.
    ///
    /// Dropping the future cancels the wait at its current await point. That
    /// may be inside a listener callback: the accepted update stays accepted
    /// and its remaining events, the interrupted one included, are delivered
    /// by the next `pump`, `process_next` or `process_payload`.
    pub async fn wait_for_change(&mut self, timeout: Duration) -> Result<bool, SessionError> {
        self.changed = false;
        let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

        loop {
            if self.changed {
                return Ok(true);
            }

            let wait = match deadline {
                None => self.config.blink_interval,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(false);
                    }
                    remaining.min(self.config.blink_interval)
                }
            };

            self.blink_tick(wait).await?;
            self.pump().await?;
        }
    }

    /// Lights the next blink frame, then sleeps for `wait`.
    ///
    /// A zero `wait` still yields to the runtime once, so other tasks (such as
    /// the one delivering notifications) keep running.
    pub async fn blink_tick(&mut self, wait: Duration) -> Result<(), SessionError> {
        let lit = self.blink.advance();
        self.write_leds(lit).await?;
        if wait.is_zero() {
            yield_now().await;
        } else {
            sleep(wait).await;
        }
        Ok(())
    }

    /// Lights exactly `squares`. `None` leaves the LEDs as they are.
    pub async fn show_squares(&mut self, squares: Option<Bitboard>) -> Result<(), SessionError> {
        match squares {
            Some(squares) => self.write_leds(squares).await,
            None => Ok(()),
        }
    }

    /// Squares lit on every blink tick.
    pub fn set_steady(&mut self, squares: Bitboard) {
        self.blink.set_steady(squares);
    }

    /// Squares lit on every other blink tick.
    pub fn set_blinking(&mut self, squares: Bitboard) {
        self.blink.set_blinking(squares);
    }

    /// Empties both blink sets and turns every LED off.
    pub async fn clear_leds(&mut self) -> Result<(), SessionError> {
        self.blink.set_steady(Bitboard::EMPTY);
        self.blink.set_blinking(Bitboard::EMPTY);
        self.write_leds(Bitboard::EMPTY).await
    }

    /// Shows each frame in turn, holding it for `interval`.
    pub async fn play_animation<I>(
        &mut self,
        frames: I,
        interval: Duration,
    ) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = Bitboard>,
    {
        for frame in frames {
            self.write_leds(frame).await?;
            sleep(interval).await;
        }
        Ok(())
    }

    async fn write_leds(&mut self, squares: Bitboard) -> Result<(), SessionError> {
        if matches!(self.state, State::Disconnected) {
            return Err(SessionError::NotConnected);
        }

        let frame = LedFrame::encode(squares, self.config.led_orientation);
        self.transport
            .write(&frame.command())
            .await
            .map_err(transport_error)
    }

    /// The last accepted board, if any.
    pub fn board(&self) -> Option<&BoardState> {
        match &self.state {
            State::Tracking(snapshot) => Some(&snapshot.board),
            _ => None,
        }
    }

    /// Raw sensor bytes of the last accepted board.
    pub fn raw_board(&self) -> Option<&RawBoard> {
        match &self.state {
            State::Tracking(snapshot) => Some(&snapshot.raw),
            _ => None,
        }
    }

    /// Board field of the last accepted board.
    pub fn current_notation(&self) -> Option<String> {
        self.board().map(compose_board_fen)
    }

    /// Squares where the board differs from `target` (a FEN or board field).
    pub fn diff_against(&self, target: &str) -> Result<Vec<Mismatch>, SessionError> {
        let board = self.board().ok_or(SessionError::NoBoardState)?;
        Ok(compare(board, target)?)
    }

    /// Name of a square, honouring the configured notation side.
    pub fn square_name(&self, square: Square) -> String {
        sensor_notation(sensor_index(square), self.config.reversed_notation)
    }

    /// True if an update was accepted since the last `wait_for_change` began.
    pub fn has_changed(&self) -> bool {
        self.changed
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn blink(&self) -> &BlinkScheduler {
        &self.blink
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }
}

fn decode_payload(payload: &[u8]) -> Result<(RawBoard, BoardState), DecodeError> {
    let raw = RawBoard::from_payload(payload)?;
    let board = BoardState::decode(&raw)?;
    Ok((raw, board))
}

impl<T, L> std::fmt::Debug for BoardSession<T, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardSession")
            .field("state", &self.state)
            .field("undelivered", &self.undelivered)
            .field("changed", &self.changed)
            .field("blink", &self.blink)
            .finish_non_exhaustive()
    }
}
