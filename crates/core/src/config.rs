use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use thiserror::Error;

const DEFAULT_PORT: u16 = 5001;
const DEFAULT_CONFIG_DIR: &str = "/data/config";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Process-level settings, resolved from `BUCKETWATCH_*` environment
/// variables with sensible defaults. Command-line flags override these
/// in the binary.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind: SocketAddr,
    pub config_dir: PathBuf,
    pub poll_interval_secs: u64,
    pub webhook_timeout_secs: u64,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let bind = env::var("BUCKETWATCH_BIND")
            .ok()
            .and_then(|v| v.parse::<SocketAddr>().ok())
            .unwrap_or_else(|| SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT));

        let config_dir = env::var("BUCKETWATCH_CONFIG_DIR")
            .ok()
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        let poll_interval_secs = env::var("BUCKETWATCH_POLL_INTERVAL")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);

        let webhook_timeout_secs = env::var("BUCKETWATCH_WEBHOOK_TIMEOUT")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_WEBHOOK_TIMEOUT_SECS);

        let log_level = env::var("BUCKETWATCH_LOG_LEVEL")
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_lowercase();

        Self {
            bind,
            config_dir,
            poll_interval_secs,
            webhook_timeout_secs,
            log_level,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Poll interval must be at least 1 second".to_string(),
            ));
        }
        if self.poll_interval_secs > 3600 {
            return Err(ConfigError::ValidationFailed(
                "Poll interval cannot exceed 1 hour".to_string(),
            ));
        }

        if self.webhook_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Webhook timeout must be at least 1 second".to_string(),
            ));
        }
        if self.webhook_timeout_secs > 300 {
            return Err(ConfigError::ValidationFailed(
                "Webhook timeout cannot exceed 5 minutes".to_string(),
            ));
        }

        if self.config_dir.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Config directory cannot be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }
}

impl fmt::Display for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Bucketwatch Configuration:")?;
        writeln!(f, "  Bind Address: {}", self.bind)?;
        writeln!(f, "  Config Dir: {}", self.config_dir.display())?;
        writeln!(f, "  Poll Interval: {}s", self.poll_interval_secs)?;
        writeln!(f, "  Webhook Timeout: {}s", self.webhook_timeout_secs)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
