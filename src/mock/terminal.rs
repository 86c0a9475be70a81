use std::collections::VecDeque;
use std::io::{self, Write};
use std::time::Duration;

use shakmaty::{Bitboard, Board, Piece, Square};
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{MockTransport, ScriptedBoard, render_board};
use crate::{GameLoop, PieceListener};
use crate::board::BoardState;
use crate::config::SessionConfig;
use crate::mapping::{parse_squares, sensor_index, sensor_notation};
use crate::session::{BoardSession, SessionError};

/// Number of events kept on screen.
const EVENT_HISTORY: usize = 8;

/// Listener that keeps a short, readable history of events.
#[derive(Debug, Default)]
pub struct TerminalListener {
    reversed: bool,
    recent: VecDeque<String>,
}

impl TerminalListener {
    pub fn new(reversed: bool) -> Self {
        Self {
            reversed,
            recent: VecDeque::with_capacity(EVENT_HISTORY + 1),
        }
    }

    fn push(&mut self, arrow: &str, square: Square, piece: Piece) {
        let name = sensor_notation(sensor_index(square), self.reversed);
        log::info!("{arrow} {} {name}", piece.char());
        self.recent.push_back(format!("{arrow} {} {name}", piece.char()));
        if self.recent.len() > EVENT_HISTORY {
            self.recent.pop_front();
        }
    }
}

impl PieceListener for TerminalListener {
    async fn on_piece_up(&mut self, square: Square, piece: Piece) {
        self.push("↑", square, piece);
    }

    async fn on_piece_down(&mut self, square: Square, piece: Piece) {
        self.push("↓", square, piece);
    }
}

type Session = BoardSession<MockTransport, TerminalListener>;

/// Clears the screen and moves cursor to top-left.
#[inline]
fn clear_screen() {
    print!("\x1B[2J\x1B[H");
}

/// Runs an interactive terminal simulating a board connected over the mock transport.
///
/// Physical actions are typed as board scripts; the session decodes the
/// resulting notifications exactly as it would for a real board.
pub async fn run_interactive_terminal(config: SessionConfig) -> Result<(), SessionError> {
    let transport = MockTransport::new();
    let listener = TerminalListener::new(config.reversed_notation);
    let mut session = BoardSession::new(transport.clone(), listener, config);
    let mut terminal = Terminal {
        transport,
        board: ScriptedBoard::new(),
    };
    session.run(&mut terminal).await
}

/// Command loop reading board scripts from stdin.
struct Terminal {
    transport: MockTransport,
    board: ScriptedBoard,
}

impl GameLoop<MockTransport, TerminalListener> for Terminal {
    async fn play(&mut self, session: &mut Session) -> Result<(), SessionError> {
        let transport = &self.transport;
        let board = &mut self.board;

        send(transport, session, board.payload()).await?;

        clear_screen();
        draw_interface(session, transport, None);

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("> ");
            if let Err(e) = io::stdout().flush() {
                eprintln!("Failed to flush stdout: {}", e);
                break;
            }

            let input = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Failed to read input: {}", e);
                    break;
                }
            };

            let parts: Vec<&str> = input.split_whitespace().collect();
            let Some(&command) = parts.first() else {
                continue;
            };
            let rest = input.trim_start()[command.len()..].trim();

            let message = match command {
                "s" => match board.push_script(rest) {
                    Ok(()) => {
                        let mut payloads = Vec::new();
                        board.drain(|payload| payloads.push(payload));
                        for payload in payloads {
                            send(transport, session, payload).await?;
                        }
                        None
                    }
                    Err(e) => Some(format!("❌ {e}")),
                },
                "load" => {
                    let fen = if rest == "startpos" || rest.is_empty() {
                        "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR"
                    } else {
                        rest.split_whitespace().next().unwrap_or(rest)
                    };
                    match Board::from_ascii_board_fen(fen.as_bytes()) {
                        Ok(position) => {
                            board.load_state(BoardState::from(&position));
                            send(transport, session, board.payload()).await?;
                            Some("✅ Position loaded from FEN".to_string())
                        }
                        Err(e) => Some(format!("❌ Invalid FEN: {e}")),
                    }
                }
                "diff" => match session.diff_against(rest) {
                    Ok(diff) if diff.is_empty() => Some("✅ Board matches".to_string()),
                    Ok(diff) => {
                        let squares: Bitboard = diff.iter().map(|m| m.square).collect();
                        session.set_steady(Bitboard::EMPTY);
                        session.set_blinking(squares);
                        let rows: Vec<String> = diff
                            .iter()
                            .map(|m| {
                                format!(
                                    "{}: {} → {}",
                                    session.square_name(m.square),
                                    piece_char(m.current),
                                    piece_char(m.expected)
                                )
                            })
                            .collect();
                        Some(rows.join("\n"))
                    }
                    Err(e) => Some(format!("❌ {e}")),
                },
                "light" | "blink" => match parse_squares(rest.split_whitespace()) {
                    Ok(squares) if command == "light" => {
                        session.set_steady(squares);
                        session.blink_tick(Duration::ZERO).await?;
                        None
                    }
                    Ok(squares) => {
                        session.set_blinking(squares);
                        session.blink_tick(Duration::ZERO).await?;
                        None
                    }
                    Err(e) => Some(format!("❌ {e}")),
                },
                "tick" => {
                    session.blink_tick(Duration::ZERO).await?;
                    None
                }
                "clear" => {
                    session.clear_leds().await?;
                    None
                }
                "p" => None,
                "q" => break,
                _ => Some("Unknown command".to_string()),
            };

            clear_screen();
            draw_interface(session, transport, message.as_deref());
        }

        Ok(())
    }
}

/// Queue a payload on the mock transport and let the session process it.
async fn send(
    transport: &MockTransport,
    session: &mut Session,
    payload: Vec<u8>,
) -> Result<(), SessionError> {
    if let Err(e) = transport.notify(payload) {
        eprintln!("Failed to deliver notification: {e}");
    }
    session.pump().await?;
    Ok(())
}

fn piece_char(piece: Option<Piece>) -> char {
    piece.map_or('·', |piece| piece.char())
}

/// Draws the complete interface: help text, board with LEDs, and recent events.
fn draw_interface(session: &Session, transport: &MockTransport, message: Option<&str>) {
    println!("♟️  Chessnut Air Simulator");
    println!();
    println!("Commands: s <script> | load <fen> | diff <fen> | light <squares> | blink <squares>");
    println!("          tick | clear | p (refresh) | q (quit)");
    println!("Script:   e2 lifts, e4=P places, '.' sends an update");
    println!();

    let lit = transport
        .last_led_frame()
        .map(|frame| frame.decode(session.config().led_orientation))
        .unwrap_or(Bitboard::EMPTY);
    let mut stdout = io::stdout();
    if let Err(e) = render_board(&mut stdout, session.board(), lit) {
        eprintln!("Failed to render board: {}", e);
    }

    println!();
    println!(
        "FEN:    {}",
        session.current_notation().unwrap_or_else(|| "-".to_string())
    );
    println!("Phase:  {:?}", session.phase());
    let recent: Vec<&str> = session.listener().recent.iter().map(String::as_str).collect();
    println!("Events: {}", recent.join("  "));

    if let Some(message) = message {
        println!();
        println!("{message}");
    }
}
