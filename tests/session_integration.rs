use std::time::Duration;

use chessnut_link::board::BoardState;
use chessnut_link::changes::PieceEvent;
use chessnut_link::config::SessionConfig;
use chessnut_link::leds::{LedFrame, LedOrientation};
use chessnut_link::mock::{MockTransport, RecordingListener, ScriptedBoard};
use chessnut_link::session::{BoardSession, SessionPhase};
use shakmaty::{Bitboard, Board, Color, Role, Square};

type Session = BoardSession<MockTransport, RecordingListener>;

/// Helper: connected session tracking the board's current placement.
async fn setup(board: &ScriptedBoard) -> (Session, MockTransport, RecordingListener) {
    let transport = MockTransport::new();
    let listener = RecordingListener::new();
    let mut session = BoardSession::new(
        transport.clone(),
        listener.clone(),
        SessionConfig::default(),
    );
    session.connect().await.expect("connect");
    transport.notify(board.payload()).expect("subscribed");
    session.pump().await.expect("pump");
    (session, transport, listener)
}

/// Helper: play a board script and let the session catch up.
async fn play(
    session: &mut Session,
    transport: &MockTransport,
    board: &mut ScriptedBoard,
    script: &str,
) {
    board.push_script(script).expect("valid script");
    while let Some(payload) = board.tick() {
        transport.notify(payload).expect("queue has room");
    }
    session.pump().await.expect("pump");
}

fn up(square: Square, color: Color, role: Role) -> PieceEvent {
    PieceEvent::Up {
        square,
        piece: role.of(color),
    }
}

fn down(square: Square, color: Color, role: Role) -> PieceEvent {
    PieceEvent::Down {
        square,
        piece: role.of(color),
    }
}

// ---------------------------------------------------------------
// Piece events
// ---------------------------------------------------------------

#[tokio::test]
async fn connect_and_first_state_produce_no_events() {
    let board = ScriptedBoard::new();
    let (session, transport, listener) = setup(&board).await;

    assert_eq!(session.phase(), SessionPhase::Tracking);
    assert!(listener.events().is_empty());
    assert_eq!(transport.writes()[0], vec![0x21, 0x01, 0x00]);
}

#[tokio::test]
async fn two_step_move_reports_lift_then_place() {
    let mut board = ScriptedBoard::new();
    let (mut session, transport, listener) = setup(&board).await;

    play(&mut session, &transport, &mut board, "e2. e4=P.").await;

    assert_eq!(
        listener.take(),
        vec![
            up(Square::E2, Color::White, Role::Pawn),
            down(Square::E4, Color::White, Role::Pawn),
        ]
    );
    assert_eq!(
        session.current_notation().as_deref(),
        Some("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR")
    );
}

#[tokio::test]
async fn capture_reports_both_lifts_and_the_placement() {
    let mut board = ScriptedBoard::new();
    let (mut session, transport, listener) = setup(&board).await;
    play(&mut session, &transport, &mut board, "e2. e4=P. d7. d5=p.").await;
    listener.take();

    // Capturing piece lifted, captured pawn removed, capturing pawn placed.
    play(&mut session, &transport, &mut board, "e4. d5. d5=P.").await;

    assert_eq!(
        listener.take(),
        vec![
            up(Square::E4, Color::White, Role::Pawn),
            up(Square::D5, Color::Black, Role::Pawn),
            down(Square::D5, Color::White, Role::Pawn),
        ]
    );
    assert_eq!(
        session.board().and_then(|b| b.piece_at(Square::D5)),
        Some(Color::White.pawn())
    );
}

#[tokio::test]
async fn castling_in_one_update_follows_sensor_order() {
    let fen = "r3k2r/8/8/8/8/8/8/R3K2R";
    let position = Board::from_ascii_board_fen(fen.as_bytes()).expect("valid board");
    let mut board = ScriptedBoard::from_state(BoardState::from(&position));
    let (mut session, transport, listener) = setup(&board).await;

    play(&mut session, &transport, &mut board, "e1 h1 g1=K f1=R.").await;

    // Rank 1 is read from h1 towards a1.
    assert_eq!(
        listener.take(),
        vec![
            up(Square::H1, Color::White, Role::Rook),
            down(Square::G1, Color::White, Role::King),
            down(Square::F1, Color::White, Role::Rook),
            up(Square::E1, Color::White, Role::King),
        ]
    );
}

#[tokio::test]
async fn garbage_between_updates_is_skipped() {
    let mut board = ScriptedBoard::new();
    let (mut session, transport, listener) = setup(&board).await;

    let mut corrupt = board.payload();
    corrupt[20] = 0xEE;
    transport.notify(corrupt).expect("queue has room");
    play(&mut session, &transport, &mut board, "g1.").await;

    assert_eq!(
        listener.take(),
        vec![up(Square::G1, Color::White, Role::Knight)]
    );
}

// ---------------------------------------------------------------
// Setup guidance: diff, blink mismatches, wait for the fix
// ---------------------------------------------------------------

#[tokio::test]
async fn diff_lights_squares_that_need_fixing() {
    let mut board = ScriptedBoard::new();
    let (mut session, transport, _) = setup(&board).await;
    play(&mut session, &transport, &mut board, "b1. c3=N.").await;

    let diff = session
        .diff_against("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1")
        .expect("valid target");
    let squares: Bitboard = diff.iter().map(|m| m.square).collect();

    assert_eq!(squares, Bitboard::from(Square::C3) | Bitboard::from(Square::B1));
    // Sensor order: c3 (rank 3) before b1 (rank 1).
    assert_eq!(diff[0].square, Square::C3);
    assert_eq!(diff[0].expected, None);
    assert_eq!(diff[1].expected, Some(Color::White.knight()));

    session.show_squares(Some(squares)).await.expect("write");
    assert_eq!(
        transport.last_led_frame(),
        Some(LedFrame::encode(squares, LedOrientation::default()))
    );
}

#[tokio::test(start_paused = true)]
async fn wait_for_change_until_board_matches() {
    let target = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR";
    let mut board = ScriptedBoard::new();
    let (mut session, transport, _) = setup(&board).await;
    play(&mut session, &transport, &mut board, "b1. c3=N.").await;

    // The player puts the knight back a little later.
    board.push_script("c3. b1=N.").expect("valid script");
    let handle = transport.clone();
    tokio::spawn(async move {
        while let Some(payload) = board.tick() {
            tokio::time::sleep(Duration::from_millis(700)).await;
            handle.notify(payload).expect("queue has room");
        }
    });

    let mut rounds = 0;
    loop {
        let diff = session.diff_against(target).expect("valid target");
        if diff.is_empty() {
            break;
        }
        session.set_blinking(diff.iter().map(|m| m.square).collect());
        assert!(
            session
                .wait_for_change(Duration::from_secs(5))
                .await
                .expect("wait"),
            "board should change before the timeout"
        );
        rounds += 1;
    }

    assert_eq!(rounds, 2);
    assert_eq!(session.current_notation().as_deref(), Some(target));
}

#[tokio::test]
async fn reconnect_starts_from_a_fresh_baseline() {
    let mut board = ScriptedBoard::new();
    let (mut session, transport, listener) = setup(&board).await;

    session.disconnect().await.expect("disconnect");
    board.push_script("a2.").expect("valid script");
    board.drain(|_| {});
    session.connect().await.expect("reconnect");
    transport.notify(board.payload()).expect("subscribed");
    session.pump().await.expect("pump");

    assert!(listener.events().is_empty());
    assert_eq!(session.board().and_then(|b| b.piece_at(Square::A2)), None);
}
