//! Alerting System
//!
//! Delivers monitor alerts to the user without ever holding up a tick:
//! sound playback runs on detached blocking tasks and every failure stops
//! at this boundary.

mod config;
mod dispatcher;
mod player;

pub use config::AlertConfig;
pub use dispatcher::{FanOutDispatcher, LogDispatcher, SoundDispatcher};
pub use player::{CommandPlayer, SoundPlayer};

use thiserror::Error;

/// Alert delivery errors; logged, never returned to the monitor
#[derive(Error, Debug)]
pub enum AlertError {
    #[error("Sound asset not found: {0}")]
    MissingAsset(String),

    #[error("Playback failed: {0}")]
    Playback(String),
}
