use std::{net::SocketAddr, path::PathBuf, time::Duration};

use signalgate_core::settings::{ConfigError, ScannerSettings};

pub const KEY_LISTEN_ADDR: &str = "SG_LISTEN_ADDR";
pub const KEY_DB_PATH: &str = "SG_DB_PATH";
pub const KEY_SYMBOLS_FILE: &str = "SG_SYMBOLS_FILE";
pub const KEY_PROVIDER_BASE_URL: &str = "SG_PROVIDER_BASE_URL";
pub const KEY_PROVIDER_API_KEY: &str = "SG_PROVIDER_API_KEY";
pub const KEY_REQUEST_TIMEOUT_MS: &str = "SG_REQUEST_TIMEOUT_MS";

pub struct Config {
    pub listen_addr: SocketAddr,
    pub db_path: String,
    /// No file means an empty universe; the scheduler still ticks.
    pub symbols_file: Option<PathBuf>,
    pub provider_base_url: Option<String>,
    pub provider_api_key: String,
    pub request_timeout: Duration,
    pub scanner: ScannerSettings,
}

impl Config {
    /// Load `.env`, then read every key from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr: SocketAddr = get(KEY_LISTEN_ADDR)
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .trim()
            .parse()
            .map_err(|e| ConfigError::Invalid {
                key: KEY_LISTEN_ADDR.to_string(),
                message: format!("{}", e),
            })?;
        let db_path = get(KEY_DB_PATH).unwrap_or_else(|| "./db/signalgate.db".into());
        let symbols_file = get(KEY_SYMBOLS_FILE).map(PathBuf::from);
        let provider_base_url = get(KEY_PROVIDER_BASE_URL);
        let provider_api_key = get(KEY_PROVIDER_API_KEY)
            .ok_or_else(|| ConfigError::Missing(KEY_PROVIDER_API_KEY.to_string()))?;
        let timeout_ms: u64 = get(KEY_REQUEST_TIMEOUT_MS)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(30000);

        let scanner = ScannerSettings::from_lookup(&lookup)?;

        Ok(Self {
            listen_addr,
            db_path,
            symbols_file,
            provider_base_url,
            provider_api_key,
            request_timeout: Duration::from_millis(timeout_ms),
            scanner,
        })
    }
}
