use error_stack::{Result, ResultExt};
use thiserror::Error;
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::config;

#[derive(Debug, Error)]
#[error("Could not initialize logging")]
pub struct LoggingError;

/// Installs the global subscriber: human readable events on stdout
/// up to the configured level, plus span traces for error reports.
pub fn init(cfg: &config::Server) -> Result<(), LoggingError> {
    tracing_subscriber::registry()
        .with(LevelFilter::from_level(cfg.log_level()))
        .with(fmt::layer())
        .with(ErrorLayer::default())
        .try_init()
        .change_context(LoggingError)
}

/// Same as [`init`] but prints through the test harness and does
/// nothing if a test already installed a subscriber.
pub fn init_for_tests() {
    tracing_subscriber::registry()
        .with(LevelFilter::DEBUG)
        .with(fmt::layer().with_test_writer())
        .with(ErrorLayer::default())
        .try_init()
        .ok();
}
