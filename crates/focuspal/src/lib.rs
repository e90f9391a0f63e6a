//! FocusPal host
//!
//! Wires a frame source, face models, the monitor session, and alert
//! dispatch into a polling loop.

pub mod config;
pub mod host;
pub mod replay;

pub use config::{AppConfig, HostConfig};
pub use host::{run_until, ConsoleView, StatusView};
pub use replay::{ReplayError, ReplayLandmarks};

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging; `RUST_LOG` overrides the default `info` level
pub fn init_logging(json: bool) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_target(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
    }
}
