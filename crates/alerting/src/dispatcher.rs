//! Alert dispatcher implementations

use dms::{AlertDispatcher, AlertEvent};
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::player::SoundPlayer;
use crate::{AlertConfig, AlertError};

/// Plays the sound for each alert on a detached blocking task
pub struct SoundDispatcher<P: SoundPlayer> {
    config: AlertConfig,
    player: Arc<P>,
    runtime: Option<Handle>,
}

impl<P: SoundPlayer> SoundDispatcher<P> {
    /// Create a dispatcher bound to the ambient tokio runtime, if any
    pub fn new(config: AlertConfig, player: P) -> Self {
        let runtime = Handle::try_current().ok();
        if runtime.is_none() {
            warn!("Sound dispatcher created outside a tokio runtime; sounds will be dropped");
        }
        Self {
            config,
            player: Arc::new(player),
            runtime,
        }
    }

    /// Create a dispatcher that spawns onto a specific runtime
    pub fn with_runtime(config: AlertConfig, player: P, runtime: Handle) -> Self {
        Self {
            config,
            player: Arc::new(player),
            runtime: Some(runtime),
        }
    }
}

impl<P: SoundPlayer> AlertDispatcher for SoundDispatcher<P> {
    fn dispatch(&self, event: &AlertEvent) {
        let kind = event.kind();
        let Some(asset) = self.config.sound_for(kind) else {
            return;
        };
        let Some(runtime) = &self.runtime else {
            debug!("No runtime for {} sound, dropping", kind.as_str());
            return;
        };

        let player = Arc::clone(&self.player);
        // Detached: completion and failure are never reported back
        runtime.spawn_blocking(move || {
            if let Err(e) = play_asset(player.as_ref(), &asset) {
                warn!("Could not play {} sound: {}", kind.as_str(), e);
            }
        });
    }
}

fn play_asset<P: SoundPlayer + ?Sized>(player: &P, asset: &Path) -> Result<(), AlertError> {
    if !asset.is_file() {
        return Err(AlertError::MissingAsset(asset.display().to_string()));
    }
    player.play(asset)
}

/// Writes each alert to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogDispatcher;

impl AlertDispatcher for LogDispatcher {
    fn dispatch(&self, event: &AlertEvent) {
        info!(alert = event.kind().as_str(), "{}", event);
    }
}

/// Forwards each alert to several dispatchers in order
#[derive(Default)]
pub struct FanOutDispatcher {
    targets: Vec<Box<dyn AlertDispatcher + Sync>>,
}

impl FanOutDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, target: impl AlertDispatcher + Sync + 'static) -> Self {
        self.targets.push(Box::new(target));
        self
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

impl AlertDispatcher for FanOutDispatcher {
    fn dispatch(&self, event: &AlertEvent) {
        for target in &self.targets {
            target.dispatch(event);
        }
    }
}
