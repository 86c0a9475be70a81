mod display;
mod listener;
mod script;
mod terminal;
mod transport;

pub use display::render_board;
pub use listener::RecordingListener;
pub use script::{ParseError, ScriptedBoard, frame_payload};
pub use terminal::{TerminalListener, run_interactive_terminal};
pub use transport::{MockTransport, MockTransportError};
