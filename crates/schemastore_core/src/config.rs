//! Gateway configuration sourced from environment variables.
//!
//! # Responsibility
//! - Resolve endpoint, access key and resource names in one place.
//! - Keep environment access behind a lookup function so callers and tests
//!   can supply their own source.
//!
//! # Invariants
//! - Empty or whitespace-only values are treated as absent.
//! - `SERVICE_KEY` wins over `ANON_KEY` when both are present.
//! - Resource names always resolve (defaults apply when unset).

use std::error::Error;
use std::fmt::{Display, Formatter};

pub const ENDPOINT_URL_VAR: &str = "ENDPOINT_URL";
pub const SERVICE_KEY_VAR: &str = "SERVICE_KEY";
pub const ANON_KEY_VAR: &str = "ANON_KEY";
pub const STORAGE_BUCKET_VAR: &str = "STORAGE_BUCKET";
pub const DB_TABLE_VAR: &str = "DB_TABLE";
pub const REPO_JSON_FILE_VAR: &str = "REPO_JSON_FILE";

pub const DEFAULT_STORAGE_BUCKET: &str = "schemas";
pub const DEFAULT_DB_TABLE: &str = "event_logs";
pub const DEFAULT_REPO_JSON_FILE: &str = "repo.json";

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration error raised when required settings are absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Names of the required variables that were unset or blank.
    Missing(Vec<&'static str>),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(names) => write!(
                f,
                "configuration missing: set {}",
                names.join(" and ")
            ),
        }
    }
}

impl Error for ConfigError {}

/// Endpoint and key pair required to build a backend handle.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint_url: String,
    pub access_key: String,
}

// Keys never reach logs, including debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint_url", &self.endpoint_url)
            .field("access_key", &"<redacted>")
            .finish()
    }
}

/// Resolved gateway settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub endpoint_url: Option<String>,
    pub access_key: Option<String>,
    /// Storage container holding JSON documents.
    pub storage_bucket: String,
    /// Table queried for log rows.
    pub db_table: String,
    /// Name of the canonical repository document.
    pub repo_file_name: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint_url: None,
            access_key: None,
            storage_bucket: DEFAULT_STORAGE_BUCKET.to_string(),
            db_table: DEFAULT_DB_TABLE.to_string(),
            repo_file_name: DEFAULT_REPO_JSON_FILE.to_string(),
        }
    }
}

impl GatewayConfig {
    /// Builds a config with credentials set and default resource names.
    pub fn new(endpoint_url: impl Into<String>, access_key: impl Into<String>) -> Self {
        Self {
            endpoint_url: Some(endpoint_url.into()),
            access_key: Some(access_key.into()),
            ..Self::default()
        }
    }

    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| non_blank(lookup(name));

        Self {
            endpoint_url: read(ENDPOINT_URL_VAR),
            access_key: read(SERVICE_KEY_VAR).or_else(|| read(ANON_KEY_VAR)),
            storage_bucket: read(STORAGE_BUCKET_VAR)
                .unwrap_or_else(|| DEFAULT_STORAGE_BUCKET.to_string()),
            db_table: read(DB_TABLE_VAR).unwrap_or_else(|| DEFAULT_DB_TABLE.to_string()),
            repo_file_name: read(REPO_JSON_FILE_VAR)
                .unwrap_or_else(|| DEFAULT_REPO_JSON_FILE.to_string()),
        }
    }

    /// Returns the endpoint/key pair, or the list of missing variables.
    ///
    /// # Errors
    /// - `ConfigError::Missing` names `ENDPOINT_URL` and/or `SERVICE_KEY`.
    pub fn credentials(&self) -> ConfigResult<Credentials> {
        let endpoint_url = non_blank(self.endpoint_url.clone());
        let access_key = non_blank(self.access_key.clone());

        match (endpoint_url, access_key) {
            (Some(endpoint_url), Some(access_key)) => Ok(Credentials {
                endpoint_url,
                access_key,
            }),
            (endpoint_url, access_key) => {
                let mut missing = Vec::new();
                if endpoint_url.is_none() {
                    missing.push(ENDPOINT_URL_VAR);
                }
                if access_key.is_none() {
                    missing.push(SERVICE_KEY_VAR);
                }
                Err(ConfigError::Missing(missing))
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, GatewayConfig};
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_resource_names_are_unset() {
        let config = GatewayConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.storage_bucket, "schemas");
        assert_eq!(config.db_table, "event_logs");
        assert_eq!(config.repo_file_name, "repo.json");
        assert!(config.endpoint_url.is_none());
    }

    #[test]
    fn service_key_is_preferred_over_anon_key() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("ENDPOINT_URL", "https://example.test"),
            ("SERVICE_KEY", "service"),
            ("ANON_KEY", "anon"),
        ]));
        assert_eq!(config.access_key.as_deref(), Some("service"));
    }

    #[test]
    fn anon_key_is_used_when_service_key_is_blank() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("SERVICE_KEY", "   "),
            ("ANON_KEY", "anon"),
        ]));
        assert_eq!(config.access_key.as_deref(), Some("anon"));
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = GatewayConfig::from_lookup(lookup_from(&[
            ("STORAGE_BUCKET", "drafts"),
            ("DB_TABLE", "audit"),
            ("REPO_JSON_FILE", "params/repo.json"),
        ]));
        assert_eq!(config.storage_bucket, "drafts");
        assert_eq!(config.db_table, "audit");
        assert_eq!(config.repo_file_name, "params/repo.json");
    }

    #[test]
    fn credentials_report_every_missing_variable() {
        let err = GatewayConfig::default()
            .credentials()
            .expect_err("empty config has no credentials");
        assert_eq!(err, ConfigError::Missing(vec!["ENDPOINT_URL", "SERVICE_KEY"]));
        assert!(err.to_string().contains("ENDPOINT_URL and SERVICE_KEY"));
    }

    #[test]
    fn credentials_debug_output_redacts_key() {
        let credentials = GatewayConfig::new("https://example.test", "secret-key")
            .credentials()
            .expect("config has credentials");
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("https://example.test"));
    }
}
