//! Import configuration loaded from the environment.
//!
//! Each logical table name maps to the URL of its backing CSV export.
//! Absence of a mapping is a fatal configuration error surfaced the moment
//! the table is requested, not at startup, so partial runs (e.g. libraries
//! only) stay possible in development.
//!
//! Environment variables:
//!
//! - `MANULOAD_LIBRARIES_URL` - libraries/collections sheet
//! - `MANULOAD_LANGUAGES_URL` - language/script sheet
//! - `MANULOAD_METADATA_URL` - main document metadata sheet
//! - `MANULOAD_SCRIPT_USER` - username of the automation identity (default `script`)
//! - `MANULOAD_TEAM_USER` - username of the shared team identity (default `team`)

use std::collections::HashMap;
use std::env;

use crate::error::{ConfigError, ConfigResult};

/// Tables the pipeline knows how to read.
pub const TABLES: &[&str] = &["libraries", "languages", "metadata"];

/// Import configuration: table URLs and system identity names.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// Logical table name -> CSV URL.
    urls: HashMap<String, String>,
    /// Username of the automation identity used for import log entries.
    pub script_username: String,
    /// Username of the shared team identity used as attribution fallback.
    pub team_username: String,
}

impl ImportConfig {
    /// Build a config from explicit table URLs (used by tests).
    pub fn new(urls: HashMap<String, String>) -> Self {
        Self {
            urls,
            script_username: "script".to_string(),
            team_username: "team".to_string(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Loads a `.env` file first if one is present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mut urls = HashMap::new();
        for table in TABLES {
            let var = format!("MANULOAD_{}_URL", table.to_uppercase());
            if let Ok(url) = env::var(&var) {
                urls.insert(table.to_string(), url);
            }
        }

        Self {
            urls,
            script_username: env::var("MANULOAD_SCRIPT_USER")
                .unwrap_or_else(|_| "script".to_string()),
            team_username: env::var("MANULOAD_TEAM_USER")
                .unwrap_or_else(|_| "team".to_string()),
        }
    }

    /// Look up the URL for a logical table name; fails fast if unconfigured.
    pub fn url_for(&self, table: &str) -> ConfigResult<&str> {
        self.urls
            .get(table)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingUrl(table.to_string()))
    }

    /// Override the identity usernames.
    pub fn with_identities(mut self, script: &str, team: &str) -> Self {
        self.script_username = script.to_string();
        self.team_username = team.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_configured_table() {
        let mut urls = HashMap::new();
        urls.insert("libraries".to_string(), "https://example.com/libs.csv".to_string());
        let config = ImportConfig::new(urls);

        assert_eq!(config.url_for("libraries").unwrap(), "https://example.com/libs.csv");
    }

    #[test]
    fn test_url_for_missing_table_is_fatal() {
        let config = ImportConfig::new(HashMap::new());
        let err = config.url_for("metadata").unwrap_err();
        assert!(err.to_string().contains("metadata"));
    }

    #[test]
    fn test_identity_defaults() {
        let config = ImportConfig::new(HashMap::new());
        assert_eq!(config.script_username, "script");
        assert_eq!(config.team_username, "team");

        let config = config.with_identities("bot", "catalog-team");
        assert_eq!(config.script_username, "bot");
        assert_eq!(config.team_username, "catalog-team");
    }
}
