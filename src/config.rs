//! # Runtime Configuration
//!
//! Configuration is read from the environment at startup.
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `KEYGATE_DATA_DIR` | Directory holding the item database | `<data dir>/keygate` |
//! | `KEYGATE_KEYRING_SERVICE` | Service name for keyring entries | `keygate-credential-gate` |
//! | `KEYGATE_LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `keygate=info` |

use std::path::PathBuf;

use crate::enclave::DEFAULT_KEYRING_SERVICE;

pub const DATA_DIR_ENV: &str = "KEYGATE_DATA_DIR";
pub const KEYRING_SERVICE_ENV: &str = "KEYGATE_KEYRING_SERVICE";
pub const LOG_FORMAT_ENV: &str = "KEYGATE_LOG_FORMAT";

/// Default `RUST_LOG` filter. The `info` level never includes secret values.
pub const DEFAULT_LOG_FILTER: &str = "keygate=info";

const DB_FILE_NAME: &str = "keygate.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub keyring_service: String,
    pub log_format: LogFormat,
}

impl Config {
    /// Build configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup(DATA_DIR_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let keyring_service = lookup(KEYRING_SERVICE_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_KEYRING_SERVICE.to_string());

        let log_format = lookup(LOG_FORMAT_ENV)
            .map(|v| LogFormat::parse(&v))
            .unwrap_or(LogFormat::Pretty);

        Self {
            data_dir,
            keyring_service,
            log_format,
        }
    }

    /// Path to the item database file.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("keygate")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.keyring_service, DEFAULT_KEYRING_SERVICE);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert!(cfg.data_dir.ends_with("keygate"));
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            (DATA_DIR_ENV, "/tmp/kg"),
            (KEYRING_SERVICE_ENV, "kg-test"),
            (LOG_FORMAT_ENV, "JSON"),
        ]);
        assert_eq!(cfg.data_dir, PathBuf::from("/tmp/kg"));
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/kg/keygate.db"));
        assert_eq!(cfg.keyring_service, "kg-test");
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn test_empty_values_fall_back() {
        let cfg = config(&[(DATA_DIR_ENV, ""), (KEYRING_SERVICE_ENV, "")]);
        assert_eq!(cfg.keyring_service, DEFAULT_KEYRING_SERVICE);
        assert!(cfg.data_dir.ends_with("keygate"));
    }
}
