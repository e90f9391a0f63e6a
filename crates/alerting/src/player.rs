//! Audio backends

use std::path::Path;
use std::process::{Command, Stdio};

use crate::{AlertConfig, AlertError};

/// Plays one sound file to completion. Called off the tick thread.
pub trait SoundPlayer: Send + Sync + 'static {
    fn play(&self, asset: &Path) -> Result<(), AlertError>;
}

/// Shells out to a command-line player (ffplay, afplay, paplay, ...)
#[derive(Debug, Clone)]
pub struct CommandPlayer {
    program: String,
    args: Vec<String>,
}

impl CommandPlayer {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn from_config(config: &AlertConfig) -> Self {
        Self::new(config.player_command.clone(), config.player_args.clone())
    }
}

impl SoundPlayer for CommandPlayer {
    fn play(&self, asset: &Path) -> Result<(), AlertError> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(asset)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| AlertError::Playback(format!("{}: {}", self.program, e)))?;

        if !status.success() {
            return Err(AlertError::Playback(format!(
                "{} exited with {}",
                self.program, status
            )));
        }
        Ok(())
    }
}
