//! Application-wide constants

/// File locations
pub mod files {
    /// Subdirectory under the user config directory
    pub const APP_DIR: &str = "spacepin";

    /// Settings file name
    pub const SETTINGS_FILENAME: &str = "config.toml";

    /// Saved layout database file name
    pub const ASSIGNMENTS_FILENAME: &str = "assignments.json";
}

/// Default timings, in seconds
pub mod timing {
    /// Learning loop poll interval
    pub const LEARN_INTERVAL_SECS: u64 = 5;

    /// Quiet window after a topology-change event before acting on it
    pub const DEBOUNCE_SECS: u64 = 3;

    /// Post-restore grace period before learning resumes
    pub const SETTLE_SECS: u64 = 5;

    /// How often authorization is re-checked while missing
    pub const PERMISSION_RECHECK_SECS: u64 = 60;
}

/// Window observation filtering
pub mod filtering {
    /// Minimum width and height for a window to count as visible;
    /// filters phantom and offscreen windows
    pub const MIN_VISIBLE_DIMENSION: f64 = 50.0;
}

/// Bounds used when clamping loaded settings
pub mod validation {
    /// Longest accepted learning interval (1 hour)
    pub const MAX_LEARN_INTERVAL_SECS: u64 = 3600;

    /// Longest accepted debounce window
    pub const MAX_DEBOUNCE_SECS: u64 = 60;

    /// Longest accepted settle window
    pub const MAX_SETTLE_SECS: u64 = 300;

    /// Largest accepted visibility threshold
    pub const MAX_MIN_WINDOW_DIMENSION: f64 = 1000.0;

    /// Shortest accepted permission recheck interval
    pub const MIN_PERMISSION_RECHECK_SECS: u64 = 10;
}
