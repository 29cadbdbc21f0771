use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

pub const S3_SETTINGS_FILE: &str = "s3_config.json";
pub const POLLING_TABLE_FILE: &str = "polling_config.json";

const DEFAULT_ENDPOINT_URL: &str = "http://localhost:19000";
const DEFAULT_ACCESS_KEY: &str = "anykey";
const DEFAULT_SECRET_KEY: &str = "anysecret";
const DEFAULT_REGION: &str = "us-east-1";

/// Connection settings for the S3-compatible endpoint.
///
/// The JSON field names match the settings file the service has always
/// written, so an existing `s3_config.json` keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Settings {
    #[serde(rename = "S3_ENDPOINT_URL")]
    pub endpoint_url: String,
    #[serde(rename = "S3_ACCESS_KEY")]
    pub access_key: String,
    #[serde(rename = "S3_SECRET_KEY")]
    pub secret_key: String,
    #[serde(rename = "S3_REGION", default = "default_region")]
    pub region: String,
}

fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

impl S3Settings {
    /// Resolves effective settings per field: saved file, then `S3_*`
    /// environment variables, then local development defaults. Empty
    /// strings count as unset at every level.
    pub fn resolve(saved: Option<&S3Settings>) -> S3Settings {
        let field = |file_value: Option<&str>, env_key: &str, default: &str| -> String {
            if let Some(v) = file_value.filter(|v| !v.is_empty()) {
                return v.to_string();
            }
            if let Some(v) = env::var(env_key).ok().filter(|v| !v.is_empty()) {
                return v;
            }
            default.to_string()
        };

        S3Settings {
            endpoint_url: field(
                saved.map(|s| s.endpoint_url.as_str()),
                "S3_ENDPOINT_URL",
                DEFAULT_ENDPOINT_URL,
            ),
            access_key: field(
                saved.map(|s| s.access_key.as_str()),
                "S3_ACCESS_KEY",
                DEFAULT_ACCESS_KEY,
            ),
            secret_key: field(
                saved.map(|s| s.secret_key.as_str()),
                "S3_SECRET_KEY",
                DEFAULT_SECRET_KEY,
            ),
            region: field(saved.map(|s| s.region.as_str()), "S3_REGION", DEFAULT_REGION),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.endpoint_url.is_empty() && !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

/// Masks a credential for display: short values are fully starred,
/// longer ones keep the first and last four characters.
pub fn mask_secret(value: &str) -> String {
    if value.len() <= 8 {
        "*".repeat(value.len())
    } else {
        format!("{}...{}", &value[..4], &value[value.len() - 4..])
    }
}

/// One change-notification subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollingRule {
    pub enabled: bool,
    pub webhook_url: String,
}

/// Bucket name to notification rule, persisted as `polling_config.json`.
pub type PollingTable = BTreeMap<String, PollingRule>;

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    fn clear_s3_env() -> [EnvGuard; 4] {
        [
            EnvGuard::unset("S3_ENDPOINT_URL"),
            EnvGuard::unset("S3_ACCESS_KEY"),
            EnvGuard::unset("S3_SECRET_KEY"),
            EnvGuard::unset("S3_REGION"),
        ]
    }

    #[test]
    #[serial]
    fn test_resolve_falls_back_to_dev_defaults() {
        let _guards = clear_s3_env();

        let settings = S3Settings::resolve(None);

        assert_eq!(settings.endpoint_url, DEFAULT_ENDPOINT_URL);
        assert_eq!(settings.access_key, DEFAULT_ACCESS_KEY);
        assert_eq!(settings.secret_key, DEFAULT_SECRET_KEY);
        assert_eq!(settings.region, DEFAULT_REGION);
    }

    #[test]
    #[serial]
    fn test_resolve_prefers_saved_file_over_env() {
        let _guards = clear_s3_env();
        let _endpoint = EnvGuard::set("S3_ENDPOINT_URL", "http://env:9000");

        let saved = S3Settings {
            endpoint_url: "http://file:9000".to_string(),
            access_key: "filekey".to_string(),
            secret_key: "filesecret".to_string(),
            region: "eu-west-1".to_string(),
        };

        let settings = S3Settings::resolve(Some(&saved));
        assert_eq!(settings.endpoint_url, "http://file:9000");
        assert_eq!(settings.region, "eu-west-1");
    }

    #[test]
    #[serial]
    fn test_resolve_empty_file_field_falls_through_to_env() {
        let _guards = clear_s3_env();
        let _key = EnvGuard::set("S3_ACCESS_KEY", "envkey");

        let saved = S3Settings {
            endpoint_url: "http://file:9000".to_string(),
            access_key: String::new(),
            secret_key: "filesecret".to_string(),
            region: "us-east-1".to_string(),
        };

        let settings = S3Settings::resolve(Some(&saved));
        assert_eq!(settings.access_key, "envkey");
    }

    #[test]
    fn test_settings_json_round_trip_uses_legacy_field_names() {
        let settings = S3Settings {
            endpoint_url: "http://minio:9000".to_string(),
            access_key: "ak".to_string(),
            secret_key: "sk".to_string(),
            region: "us-east-1".to_string(),
        };

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["S3_ENDPOINT_URL"], "http://minio:9000");
        assert_eq!(json["S3_SECRET_KEY"], "sk");

        let parsed: S3Settings = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, settings);
    }

    #[test]
    fn test_settings_missing_region_defaults() {
        let parsed: S3Settings = serde_json::from_str(
            r#"{"S3_ENDPOINT_URL":"http://minio:9000","S3_ACCESS_KEY":"a","S3_SECRET_KEY":"b"}"#,
        )
        .unwrap();

        assert_eq!(parsed.region, DEFAULT_REGION);
    }

    #[test]
    fn test_mask_secret_short_values_fully_starred() {
        assert_eq!(mask_secret("secret"), "******");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_mask_secret_long_values_keep_edges() {
        assert_eq!(mask_secret("wJalrXUtnFEMI"), "wJal...FEMI");
    }

    #[test]
    fn test_polling_rule_round_trip() {
        let mut table = PollingTable::new();
        table.insert(
            "reports".to_string(),
            PollingRule {
                enabled: true,
                webhook_url: "http://hooks.internal/s3".to_string(),
            },
        );

        let json = serde_json::to_string(&table).unwrap();
        let parsed: PollingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, table);
        assert!(parsed["reports"].enabled);
    }
}
