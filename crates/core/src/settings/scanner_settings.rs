use std::str::FromStr;
use std::time::Duration;

use signalgate_market_data::RateBudget;
use thiserror::Error;

use crate::exclusions::ExclusionPolicy;

pub const KEY_RATE_BUDGET: &str = "SG_RATE_BUDGET";
pub const KEY_RATE_WINDOW_SECS: &str = "SG_RATE_WINDOW_SECS";
pub const KEY_PENALTY_SECS: &str = "SG_PENALTY_SECS";
pub const KEY_EXCLUSION_THRESHOLD: &str = "SG_EXCLUSION_THRESHOLD";
pub const KEY_BACKOFF_SCHEDULE_SECS: &str = "SG_BACKOFF_SCHEDULE_SECS";
pub const KEY_COOLDOWN_SECS: &str = "SG_COOLDOWN_SECS";
pub const KEY_FETCH_CONCURRENCY: &str = "SG_FETCH_CONCURRENCY";
pub const KEY_TIER_TIMEOUT_MS: &str = "SG_TIER_TIMEOUT_MS";
pub const KEY_BULK_BATCH_SIZE: &str = "SG_BULK_BATCH_SIZE";
pub const KEY_SCAN_INTERVAL_SECS: &str = "SG_SCAN_INTERVAL_SECS";

/// Upper bound for any single backoff step or the alert cooldown.
pub const MAX_HOLD: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration key: {0}")]
    Missing(String),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

/// Every tunable the scan loop needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerSettings {
    /// Provider calls allowed per rolling window.
    pub rate_budget: u32,
    pub rate_window: Duration,
    /// Block imposed once the budget is exceeded.
    pub penalty: Duration,
    /// Consecutive full-chain failures before a symbol is excluded.
    pub exclusion_threshold: u32,
    /// Exclusion lengths for the 1st, 2nd, ... exclusion. Non-decreasing.
    pub backoff_schedule: Vec<Duration>,
    /// Minimum time between approved alerts for one symbol.
    pub cooldown: Duration,
    /// Max in-flight symbol fetches per cycle.
    pub fetch_concurrency: usize,
    /// Timeout applied to each tier call.
    pub tier_timeout: Duration,
    /// Symbols per bulk call.
    pub bulk_batch_size: usize,
    pub scan_interval: Duration,
}

impl ScannerSettings {
    /// Build settings from a key lookup and validate them.
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use signalgate_core::settings::ScannerSettings;
    ///
    /// let env: HashMap<&str, &str> = HashMap::from([
    ///     ("SG_RATE_BUDGET", "45"),
    ///     ("SG_RATE_WINDOW_SECS", "60"),
    ///     ("SG_PENALTY_SECS", "120"),
    ///     ("SG_EXCLUSION_THRESHOLD", "3"),
    ///     ("SG_BACKOFF_SCHEDULE_SECS", "900,3600,14400,86400"),
    ///     ("SG_COOLDOWN_SECS", "300"),
    ///     ("SG_FETCH_CONCURRENCY", "10"),
    ///     ("SG_TIER_TIMEOUT_MS", "8000"),
    ///     ("SG_BULK_BATCH_SIZE", "8"),
    ///     ("SG_SCAN_INTERVAL_SECS", "60"),
    /// ]);
    /// let settings = ScannerSettings::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
    /// assert_eq!(settings.rate_budget, 45);
    /// assert_eq!(settings.backoff_schedule.len(), 4);
    /// ```
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Self {
            rate_budget: parse(&lookup, KEY_RATE_BUDGET)?,
            rate_window: secs(&lookup, KEY_RATE_WINDOW_SECS)?,
            penalty: secs(&lookup, KEY_PENALTY_SECS)?,
            exclusion_threshold: parse(&lookup, KEY_EXCLUSION_THRESHOLD)?,
            backoff_schedule: schedule(&lookup, KEY_BACKOFF_SCHEDULE_SECS)?,
            cooldown: secs(&lookup, KEY_COOLDOWN_SECS)?,
            fetch_concurrency: parse(&lookup, KEY_FETCH_CONCURRENCY)?,
            tier_timeout: Duration::from_millis(parse(&lookup, KEY_TIER_TIMEOUT_MS)?),
            bulk_batch_size: parse(&lookup, KEY_BULK_BATCH_SIZE)?,
            scan_interval: secs(&lookup, KEY_SCAN_INTERVAL_SECS)?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_budget == 0 {
            return Err(ConfigError::invalid(KEY_RATE_BUDGET, "must be at least 1"));
        }
        if self.rate_window.is_zero() {
            return Err(ConfigError::invalid(KEY_RATE_WINDOW_SECS, "must be positive"));
        }
        if self.exclusion_threshold == 0 {
            return Err(ConfigError::invalid(KEY_EXCLUSION_THRESHOLD, "must be at least 1"));
        }
        if self.backoff_schedule.is_empty() {
            return Err(ConfigError::invalid(KEY_BACKOFF_SCHEDULE_SECS, "must not be empty"));
        }
        if self.backoff_schedule.iter().any(Duration::is_zero) {
            return Err(ConfigError::invalid(
                KEY_BACKOFF_SCHEDULE_SECS,
                "entries must be positive",
            ));
        }
        if self.backoff_schedule.iter().any(|step| *step > MAX_HOLD) {
            return Err(ConfigError::invalid(
                KEY_BACKOFF_SCHEDULE_SECS,
                format!("entries must not exceed {} seconds", MAX_HOLD.as_secs()),
            ));
        }
        if self.backoff_schedule.windows(2).any(|w| w[1] < w[0]) {
            return Err(ConfigError::invalid(KEY_BACKOFF_SCHEDULE_SECS, "must be non-decreasing"));
        }
        if self.cooldown.is_zero() {
            return Err(ConfigError::invalid(KEY_COOLDOWN_SECS, "must be positive"));
        }
        if self.cooldown > MAX_HOLD {
            return Err(ConfigError::invalid(
                KEY_COOLDOWN_SECS,
                format!("must not exceed {} seconds", MAX_HOLD.as_secs()),
            ));
        }
        if self.fetch_concurrency == 0 {
            return Err(ConfigError::invalid(KEY_FETCH_CONCURRENCY, "must be at least 1"));
        }
        if self.tier_timeout.is_zero() {
            return Err(ConfigError::invalid(KEY_TIER_TIMEOUT_MS, "must be positive"));
        }
        if self.bulk_batch_size == 0 {
            return Err(ConfigError::invalid(KEY_BULK_BATCH_SIZE, "must be at least 1"));
        }
        if self.scan_interval.is_zero() {
            return Err(ConfigError::invalid(KEY_SCAN_INTERVAL_SECS, "must be positive"));
        }
        Ok(())
    }

    pub fn rate_budget(&self) -> RateBudget {
        RateBudget {
            calls_per_window: self.rate_budget,
            window: self.rate_window,
            penalty: self.penalty,
        }
    }

    pub fn exclusion_policy(&self) -> ExclusionPolicy {
        ExclusionPolicy {
            threshold: self.exclusion_threshold,
            backoff_schedule: self.backoff_schedule.clone(),
        }
    }
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(ConfigError::Missing(key.to_string())),
    }
}

fn parse<T, F>(lookup: &F, key: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = required(lookup, key)?;
    raw.parse::<T>()
        .map_err(|e| ConfigError::invalid(key, format!("'{}': {}", raw, e)))
}

fn secs<F>(lookup: &F, key: &str) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(Duration::from_secs(parse(lookup, key)?))
}

fn schedule<F>(lookup: &F, key: &str) -> Result<Vec<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(lookup, key)?;
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ConfigError::invalid(key, format!("'{}': {}", part, e)))
        })
        .collect()
}
