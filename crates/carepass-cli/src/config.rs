//! Deployment configuration
//!
//! One TOML file with a section per component, then `CAREPASS_*` environment
//! overrides for the values that differ between deployments or must not sit in
//! a file (the two secrets).
//!
//! ```toml
//! [tokens]
//! key_id = "carepass-hmac-1"
//!
//! [queue]
//! default_max_retries = 3
//!
//! [grants]
//! public_base_url = "https://carepass.example"
//!
//! [storage]
//! data_dir = "/var/lib/carepass"
//! roster = "/etc/carepass/roster.toml"
//! ```

use anyhow::{Context, Result};
use carepass_core::{ConfigValidation, ConfigValidator, SigningSecret, ValidationResult};
use carepass_grant::GrantConfig;
use carepass_queue::QueueConfig;
use carepass_token::TokenConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file read when `--config` is not given, if it exists
pub const DEFAULT_CONFIG_PATH: &str = "carepass.toml";

/// Where records and the directory roster live
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the record store
    pub data_dir: PathBuf,
    /// Directory roster; without one, every subject and organization lookup
    /// misses
    pub roster: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./carepass-data"),
            roster: None,
        }
    }
}

impl ConfigValidation for StorageConfig {
    fn validate(&self) -> ValidationResult {
        let mut v = ConfigValidator::for_section("storage");
        v.required("data_dir", &self.data_dir.to_string_lossy());
        v.result()
    }
}

/// Full deployment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CarepassConfig {
    /// `[tokens]`
    pub tokens: TokenConfig,
    /// `[queue]`
    pub queue: QueueConfig,
    /// `[grants]`
    pub grants: GrantConfig,
    /// `[storage]`
    pub storage: StorageConfig,
}

impl CarepassConfig {
    /// Parse TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("failed to parse configuration")
    }

    /// Read `path`, or [`DEFAULT_CONFIG_PATH`] when it exists, or fall back to
    /// defaults. Environment overrides are applied and the result validated.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => {
                Self::read_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => {
                tracing::debug!("no configuration file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("in config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Overlay `CAREPASS_*` variables resolved through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup("CAREPASS_SIGNING_SECRET") {
            self.tokens.signing_secret = SigningSecret::from(secret.as_str());
        }
        if let Some(secret) = lookup("CAREPASS_BEARER_SECRET") {
            self.tokens.bearer_secret = SigningSecret::from(secret.as_str());
        }
        if let Some(issuer) = lookup("CAREPASS_TOKEN_ISSUER") {
            self.tokens.issuer = issuer;
        }
        if let Some(audience) = lookup("CAREPASS_TOKEN_AUDIENCE") {
            self.tokens.audience = audience;
        }
        if let Some(dir) = lookup("CAREPASS_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(roster) = lookup("CAREPASS_ROSTER") {
            self.storage.roster = Some(PathBuf::from(roster));
        }
        if let Some(url) = lookup("CAREPASS_PUBLIC_BASE_URL") {
            self.grants.public_base_url = url;
        }
    }
}

impl ConfigValidation for CarepassConfig {
    fn validate(&self) -> ValidationResult {
        self.tokens.validate()?;
        self.queue.validate()?;
        self.grants.validate()?;
        self.storage.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SIGNING: &str = "0123456789abcdef0123456789abcdef-signing";
    const BEARER: &str = "0123456789abcdef0123456789abcdef-bearer";

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn sections_are_optional() {
        let config = CarepassConfig::from_toml_str("[grants]\nurgent_window_hours = 4\n").unwrap();
        assert_eq!(config.grants.urgent_window_hours, 4);
        assert_eq!(config.queue, QueueConfig::default());
        assert_eq!(config.storage.data_dir, PathBuf::from("./carepass-data"));
    }

    #[test]
    fn defaults_fail_without_secrets() {
        assert!(CarepassConfig::default().validate().is_err());
    }

    #[test]
    fn environment_overrides_file_values() {
        let mut config = CarepassConfig::from_toml_str(
            "[tokens]\nissuer = \"from-file\"\n[storage]\ndata_dir = \"/srv/a\"\n",
        )
        .unwrap();
        config.apply_env(env(&[
            ("CAREPASS_SIGNING_SECRET", SIGNING),
            ("CAREPASS_BEARER_SECRET", BEARER),
            ("CAREPASS_TOKEN_ISSUER", "from-env"),
            ("CAREPASS_DATA_DIR", "/srv/b"),
            ("CAREPASS_PUBLIC_BASE_URL", "https://carepass.example"),
        ]));

        assert_eq!(config.tokens.issuer, "from-env");
        assert_eq!(config.tokens.audience, "carepass-clients");
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/b"));
        assert_eq!(config.grants.public_base_url, "https://carepass.example");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_sections_are_reported() {
        let mut config = CarepassConfig::default();
        config.apply_env(env(&[
            ("CAREPASS_SIGNING_SECRET", SIGNING),
            ("CAREPASS_BEARER_SECRET", BEARER),
        ]));
        config.grants.max_time_window_hours = 500;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_time_window_hours"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = CarepassConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn unknown_values_are_rejected_with_the_file_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("carepass.toml");
        std::fs::write(&path, "[queue]\ndefault_max_retries = \"many\"\n").unwrap();
        let err = CarepassConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("carepass.toml"));
    }
}
