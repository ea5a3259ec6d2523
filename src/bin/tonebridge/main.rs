//! tonebridge - terminal synth player
//!
//! Run with: cargo run
//! Logs go to stderr; set RUST_LOG=debug to see scheduling.

mod app;
mod output;

use app::Player;
use tonebridge::runtime::SessionConfig;
use tracing_subscriber::EnvFilter;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    Player::new(SessionConfig::default()).run()
}
