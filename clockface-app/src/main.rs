//! Clockface - clock and date overlay for secondary monitors.
//!
//! Main entry point.

mod app;
mod clock;
mod config;
mod menu;
mod monitor;
mod window;

use tracing_subscriber::EnvFilter;

use crate::app::Outcome;
use crate::config::ClockConfig;

fn main() {
    // Set up logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting clockface");

    let result = ClockConfig::load().and_then(app::run);
    match result {
        Ok(Outcome::Closed) => std::process::exit(0),
        Ok(Outcome::NoSecondaryMonitor) => {
            tracing::info!("No secondary monitor, exiting");
            std::process::exit(0)
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(-1)
        }
    }
}
