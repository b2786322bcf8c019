//! Session configuration, loadable from a JSON file.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::playability::ReshufflePolicy;
use crate::scoring::ComboRules;

/// Delays of the deferred steps, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Click to match check.
    pub match_check_delay: u64,
    /// Committed match to gravity.
    pub gravity_delay: u64,
    /// Gravity to the "any moves left?" check.
    pub settle_delay: u64,
    /// "No moves left" to the automatic reshuffle.
    pub auto_shuffle_delay: u64,
    pub start_message: u64,
    pub level_message: u64,
    pub shuffle_message: u64,
    pub game_over_message: u64,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            match_check_delay: 100,
            gravity_delay: 300,
            settle_delay: 500,
            auto_shuffle_delay: 1500,
            start_message: 1500,
            level_message: 2000,
            shuffle_message: 2000,
            game_over_message: 2000,
        }
    }
}

pub(crate) fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

/// Everything a [`crate::session::Session`] can be tuned with.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seed for reproducible boards. Entropy is used when unset.
    pub seed: Option<u64>,
    pub timings: Timings,
    pub combo: ComboRules,
    pub reshuffle: ReshufflePolicy,
    /// Where the JSON progress store lives. See [`SessionConfig::resolved_progress_path`].
    pub progress_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Reads a config file. Missing fields take their defaults and the result is
    /// sanitized.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: SessionConfig = serde_json::from_str(&text)?;
        Ok(config.sanitized())
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sanitized(mut self) -> Self {
        self.combo = self.combo.sanitized();
        self.reshuffle = self.reshuffle.sanitized();
        self
    }

    /// The progress file to use: the configured path, else
    /// `BLOCK_BLAST_PROGRESS_PATH`, else `$XDG_CONFIG_HOME/block-blast/progress.json`,
    /// else `$HOME/.config/block-blast/progress.json`.
    pub fn resolved_progress_path(&self) -> PathBuf {
        if let Some(path) = &self.progress_path {
            return path.clone();
        }
        default_progress_path()
    }
}

fn default_progress_path() -> PathBuf {
    if let Some(explicit) = std::env::var_os("BLOCK_BLAST_PROGRESS_PATH") {
        return PathBuf::from(explicit);
    }

    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|xdg| !xdg.is_empty())
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));

    base.join("block-blast").join("progress.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_game_pacing() {
        let config = SessionConfig::default();
        assert_eq!(config.seed, None);
        assert_eq!(config.timings.match_check_delay, 100);
        assert_eq!(config.timings.gravity_delay, 300);
        assert_eq!(config.timings.settle_delay, 500);
        assert_eq!(config.timings.auto_shuffle_delay, 1500);
        assert_eq!(config.combo.window_ms, 1000);
        assert_eq!(config.reshuffle.max_attempts, 5);
    }

    #[test]
    fn test_partial_json_fills_in_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"seed": 7, "timings": {"gravity_delay": 50}}"#).unwrap();
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.timings.gravity_delay, 50);
        assert_eq!(config.timings.match_check_delay, 100);
        assert_eq!(config.combo, ComboRules::default());
    }

    #[test]
    fn test_sanitized_clamps_out_of_range_values() {
        let mut config = SessionConfig::default();
        config.combo.cap = 0.2;
        config.reshuffle.recolor_probability = 4.0;
        config.reshuffle.max_attempts = 0;
        let config = config.sanitized();
        assert_eq!(config.combo.cap, 1.0);
        assert_eq!(config.reshuffle.recolor_probability, 1.0);
        assert_eq!(config.reshuffle.max_attempts, 1);
    }

    #[test]
    fn test_load_reads_and_sanitizes_a_file() {
        let dir = std::env::temp_dir().join(format!("block-blast-config-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("session.json");
        fs::write(&path, r#"{"combo": {"step": -1.0}, "progress_path": "p.json"}"#).unwrap();

        let config = SessionConfig::load(&path).unwrap();
        assert_eq!(config.combo.step, 0.0);
        assert_eq!(config.resolved_progress_path(), PathBuf::from("p.json"));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(SessionConfig::load(&path), Err(ConfigError::Json(_))));
        assert!(matches!(
            SessionConfig::load(dir.join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        fs::remove_dir_all(&dir).ok();
    }
}
