//! Scanner configuration.
//!
//! Every rate, threshold and timing value is supplied from outside; nothing
//! here falls back to a built-in default. A missing or invalid key is fatal
//! at startup.

mod scanner_settings;

pub use scanner_settings::{
    ConfigError, ScannerSettings, KEY_BACKOFF_SCHEDULE_SECS, KEY_BULK_BATCH_SIZE,
    KEY_COOLDOWN_SECS, KEY_EXCLUSION_THRESHOLD, KEY_FETCH_CONCURRENCY, KEY_PENALTY_SECS,
    KEY_RATE_BUDGET, KEY_RATE_WINDOW_SECS, KEY_SCAN_INTERVAL_SECS, KEY_TIER_TIMEOUT_MS,
};
