use std::process::ExitCode;
use std::time::Duration;

use chessnut_link::config::{DEFAULT_QUEUE_CAPACITY, SessionConfig};
use chessnut_link::leds::LedOrientation;
use clap::Parser;

/// Chessnut Air simulator: drives a board session from typed board scripts.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Milliseconds between blink ticks
    #[arg(long, default_value_t = 400, value_parser = clap::value_parser!(u64).range(1..))]
    blink_ms: u64,

    /// Name squares as seen from the black side
    #[arg(long)]
    reversed: bool,

    /// Mirror files and ranks of the LED frame
    #[arg(long)]
    mirror_leds: bool,

    /// Notifications buffered between transport and session
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let config = SessionConfig {
        blink_interval: Duration::from_millis(args.blink_ms),
        queue_capacity: args.queue_capacity,
        reversed_notation: args.reversed,
        led_orientation: LedOrientation {
            mirror_files: args.mirror_leds,
            mirror_ranks: args.mirror_leds,
        },
        ..SessionConfig::default()
    };
    log::debug!("starting simulator with {config:?}");

    match chessnut_link::mock::run_interactive_terminal(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
