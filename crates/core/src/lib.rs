pub mod config;
pub mod keys;
pub mod settings;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use keys::{sanitize_object_key, KeyError};
pub use settings::{mask_secret, PollingRule, PollingTable, S3Settings};
pub use store::{ConfigStore, ConfigStoreError};
