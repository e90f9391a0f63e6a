//! Alert configuration

use dms::AlertKind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Play sounds at all
    pub sound_enabled: bool,
    /// Directory holding the sound assets
    pub sound_dir: PathBuf,
    pub eyes_closed_sound: String,
    pub yawn_sound: String,
    pub distracted_sound: String,
    pub break_sound: String,
    /// External player program; the asset path is appended to `player_args`
    pub player_command: String,
    pub player_args: Vec<String>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_dir: PathBuf::from("sounds"),
            eyes_closed_sound: "Eyes Close.mp3".to_string(),
            yawn_sound: "While Yawn.mp3".to_string(),
            distracted_sound: "Distracted.mp3".to_string(),
            break_sound: "Break.mp3".to_string(),
            player_command: "ffplay".to_string(),
            player_args: vec![
                "-nodisp".to_string(),
                "-autoexit".to_string(),
                "-loglevel".to_string(),
                "quiet".to_string(),
            ],
        }
    }
}

impl AlertConfig {
    /// Sound asset for an alert category, if it has one
    pub fn sound_for(&self, kind: AlertKind) -> Option<PathBuf> {
        if !self.sound_enabled {
            return None;
        }
        let file = match kind {
            AlertKind::EyesClosed => &self.eyes_closed_sound,
            AlertKind::Yawn => &self.yawn_sound,
            AlertKind::Absence => &self.distracted_sound,
            AlertKind::Break => &self.break_sound,
            AlertKind::Motivation => return None,
        };
        Some(self.sound_dir.join(file))
    }
}
