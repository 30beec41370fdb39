//! Daemon settings
//!
//! Loaded once at startup from a TOML file in the user config directory.
//! Every field has a default, so an absent file or a file with only a few
//! keys works; out-of-range values are clamped with a warning rather than
//! rejected.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::constants::{files, timing, validation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Learning loop poll interval in seconds
    #[serde(default = "default_learn_interval_secs")]
    pub learn_interval_secs: u64,

    /// Debounce window after a topology-change event, in seconds
    #[serde(default = "default_debounce_secs")]
    pub debounce_secs: u64,

    /// Post-restore settle window before learning resumes, in seconds
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,

    /// Windows narrower or shorter than this are ignored
    #[serde(default = "default_min_window_dimension")]
    pub min_window_dimension: f64,

    /// Authorization recheck cadence while unauthorized, in seconds
    #[serde(default = "default_permission_recheck_secs")]
    pub permission_recheck_secs: u64,
}

fn default_learn_interval_secs() -> u64 {
    timing::LEARN_INTERVAL_SECS
}

fn default_debounce_secs() -> u64 {
    timing::DEBOUNCE_SECS
}

fn default_settle_secs() -> u64 {
    timing::SETTLE_SECS
}

fn default_min_window_dimension() -> f64 {
    crate::constants::filtering::MIN_VISIBLE_DIMENSION
}

fn default_permission_recheck_secs() -> u64 {
    timing::PERMISSION_RECHECK_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            learn_interval_secs: default_learn_interval_secs(),
            debounce_secs: default_debounce_secs(),
            settle_secs: default_settle_secs(),
            min_window_dimension: default_min_window_dimension(),
            permission_recheck_secs: default_permission_recheck_secs(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(files::APP_DIR);
        path.push(files::SETTINGS_FILENAME);
        path
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let mut settings = match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "settings file unreadable, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                info!(path = %path.display(), "no settings file, using defaults");
                Self::default()
            }
        };
        settings.validate_and_clamp();
        settings
    }

    /// Clamp loaded values to safe ranges
    fn validate_and_clamp(&mut self) {
        if self.learn_interval_secs == 0 {
            warn!(using = default_learn_interval_secs(), "learn_interval_secs is 0, using default");
            self.learn_interval_secs = default_learn_interval_secs();
        } else if self.learn_interval_secs > validation::MAX_LEARN_INTERVAL_SECS {
            warn!(
                learn_interval_secs = self.learn_interval_secs,
                max = validation::MAX_LEARN_INTERVAL_SECS,
                "learn_interval_secs exceeds maximum, clamping"
            );
            self.learn_interval_secs = validation::MAX_LEARN_INTERVAL_SECS;
        }

        if self.debounce_secs == 0 {
            warn!(using = default_debounce_secs(), "debounce_secs is 0, using default");
            self.debounce_secs = default_debounce_secs();
        } else if self.debounce_secs > validation::MAX_DEBOUNCE_SECS {
            warn!(
                debounce_secs = self.debounce_secs,
                max = validation::MAX_DEBOUNCE_SECS,
                "debounce_secs exceeds maximum, clamping"
            );
            self.debounce_secs = validation::MAX_DEBOUNCE_SECS;
        }

        if self.settle_secs > validation::MAX_SETTLE_SECS {
            warn!(
                settle_secs = self.settle_secs,
                max = validation::MAX_SETTLE_SECS,
                "settle_secs exceeds maximum, clamping"
            );
            self.settle_secs = validation::MAX_SETTLE_SECS;
        }

        if !(0.0..=validation::MAX_MIN_WINDOW_DIMENSION).contains(&self.min_window_dimension) {
            warn!(
                min_window_dimension = self.min_window_dimension,
                using = default_min_window_dimension(),
                "min_window_dimension out of range, using default"
            );
            self.min_window_dimension = default_min_window_dimension();
        }

        if self.permission_recheck_secs < validation::MIN_PERMISSION_RECHECK_SECS {
            warn!(
                permission_recheck_secs = self.permission_recheck_secs,
                min = validation::MIN_PERMISSION_RECHECK_SECS,
                "permission_recheck_secs below minimum, clamping"
            );
            self.permission_recheck_secs = validation::MIN_PERMISSION_RECHECK_SECS;
        }
    }

    pub fn learn_interval(&self) -> Duration {
        Duration::from_secs(self.learn_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn permission_recheck(&self) -> Duration {
        Duration::from_secs(self.permission_recheck_secs)
    }
}
