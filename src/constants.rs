//! Application-wide constants
//!
//! This module contains all magic numbers and string literals used throughout
//! the application, providing a single source of truth for constant values.

/// Retry policy for applying a mode
pub mod retry {
    /// Total number of full pipeline attempts before restoring
    pub const MAX_ATTEMPTS: usize = 3;

    /// Backoff between attempts, indexed by the attempt that just failed (0-based)
    pub const BACKOFF_MS: [u64; 3] = [500, 1000, 2000];
}

/// Delays around the apply call
pub mod timing {
    /// Pause after a successful apply before re-querying the active paths
    pub const SETTLE_DELAY_MS: u64 = 1000;
}

/// Fixed values written into every built configuration
pub mod display {
    /// Source surfaces are always 32 bits per pixel
    pub const BITS_PER_PIXEL: u32 = 32;

    /// Index of the unique identifier inside `prefix#vendor#uid#guid`
    pub const DEVICE_PATH_UID_FIELD: usize = 2;

    /// Separator used by platform device path strings
    pub const DEVICE_PATH_SEPARATOR: char = '#';
}

/// Native descriptor buffer capacities (UTF-16 code units)
pub mod descriptor {
    /// Monitor friendly name buffer
    pub const FRIENDLY_NAME_LEN: usize = 64;

    /// Monitor device path buffer
    pub const DEVICE_PATH_LEN: usize = 128;
}

/// Configuration file location
pub mod config {
    /// Directory under the user config dir
    pub const APP_DIR: &str = "monitor-modes";

    /// Config file name, both next to the executable and in APP_DIR
    pub const FILENAME: &str = "config.json";
}

/// Process exit codes
pub mod exit {
    pub const SUCCESS: u8 = 0;

    /// Invalid arguments or configuration error
    pub const CONFIG_ERROR: u8 = 1;

    /// Mode could not be applied after every retry
    pub const APPLY_FAILED: u8 = 2;

    /// Anything unexpected
    pub const UNHANDLED: u8 = 3;
}
