//! Distinguished name defaults shared by the CA and server builders.
//!
//! The jurisdiction and organization fields are fixed for every run unless a
//! TOML file overrides them:
//!
//! ```toml
//! [subject]
//! country = "JP"
//! state = "Tokyo"
//! locality = "Minato"
//! ca_organization = "My CA Organization"
//! ca_common_name = "My CA"
//! server_organization = "My Server Organization"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub subject: SubjectDefaults,
}

/// Fixed subject fields. Only the server Common Name varies per run.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SubjectDefaults {
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_locality")]
    pub locality: String,
    #[serde(default = "default_ca_organization")]
    pub ca_organization: String,
    #[serde(default = "default_ca_common_name")]
    pub ca_common_name: String,
    #[serde(default = "default_server_organization")]
    pub server_organization: String,
}

impl Default for SubjectDefaults {
    fn default() -> Self {
        Self {
            country: default_country(),
            state: default_state(),
            locality: default_locality(),
            ca_organization: default_ca_organization(),
            ca_common_name: default_ca_common_name(),
            server_organization: default_server_organization(),
        }
    }
}

fn default_country() -> String {
    "JP".to_string()
}

fn default_state() -> String {
    "Tokyo".to_string()
}

fn default_locality() -> String {
    "Minato".to_string()
}

fn default_ca_organization() -> String {
    "My CA Organization".to_string()
}

fn default_ca_common_name() -> String {
    "My CA".to_string()
}

fn default_server_organization() -> String {
    "My Server Organization".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml_str(&config_str)
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to the built-in defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_defaults() {
        let defaults = SubjectDefaults::default();
        assert_eq!(defaults.country, "JP");
        assert_eq!(defaults.state, "Tokyo");
        assert_eq!(defaults.locality, "Minato");
        assert_eq!(defaults.ca_organization, "My CA Organization");
        assert_eq!(defaults.ca_common_name, "My CA");
        assert_eq!(defaults.server_organization, "My Server Organization");
    }

    #[test]
    fn test_partial_override() {
        let config = AppConfig::from_toml_str(
            r#"
            [subject]
            country = "DE"
            locality = "Berlin"
            "#,
        )
        .unwrap();

        assert_eq!(config.subject.country, "DE");
        assert_eq!(config.subject.locality, "Berlin");
        assert_eq!(config.subject.state, "Tokyo");
        assert_eq!(config.subject.ca_common_name, "My CA");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config.subject, SubjectDefaults::default());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(AppConfig::from_toml_str("[subject\ncountry = ").is_err());
    }

    #[test]
    fn test_load_without_path() {
        let config = AppConfig::load(None).unwrap();
        assert_eq!(config.subject, SubjectDefaults::default());
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::from_file(Path::new("/nonexistent/pki-certgen.toml"));
        assert!(result.is_err());
    }
}
