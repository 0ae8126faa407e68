use crate::core::amount;
use crate::core::form::MIN_AMOUNT;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Overrides `api.base_url` when set.
pub const API_URL_ENV: &str = "FXCONV_API_URL";
pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/currency";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: DEFAULT_API_URL.to_string(),
        }
    }
}

/// Initial values of the conversion form.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct FormDefaults {
    pub from: String,
    pub to: String,
    pub amount: f64,
}

impl Default for FormDefaults {
    fn default() -> Self {
        FormDefaults {
            from: "USD".to_string(),
            to: "EUR".to_string(),
            amount: 100.0,
        }
    }
}

impl FormDefaults {
    /// The default amount must be something the amount field would accept.
    pub fn validate(&self) -> Result<()> {
        let text = format!("{}", self.amount);
        if !self.amount.is_finite() || !amount::matches_pattern(&text) {
            bail!("Default amount {} is not a valid amount", text);
        }
        if self.amount < MIN_AMOUNT {
            bail!("Default amount must be at least {}", MIN_AMOUNT);
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub defaults: FormDefaults,
    pub data_path: Option<String>,
}

impl AppConfig {
    /// Loads the config from the default location, falling back to defaults
    /// when no config file has been set up.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            return Self::load_from_path(&config_path);
        }
        debug!(path = %config_path.display(), "No config file, using defaults");
        Ok(Self::default().with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = project_dirs()?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .defaults
            .validate()
            .with_context(|| format!("Invalid defaults in config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(self) -> Self {
        let env_url = std::env::var(API_URL_ENV).ok();
        self.with_api_url_override(env_url)
    }

    fn with_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            debug!(%url, "API base URL overridden from environment");
            self.api.base_url = url;
        }
        self
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "fxconv", "fxconv").context("Could not determine project directories")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
api:
  base_url: "http://example.com/api/currency"
defaults:
  from: "GBP"
  to: "INR"
  amount: 250.5
data_path: "/tmp/fxconv"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.api.base_url, "http://example.com/api/currency");
        assert_eq!(config.defaults.from, "GBP");
        assert_eq!(config.defaults.to, "INR");
        assert_eq!(config.defaults.amount, 250.5);
        assert_eq!(
            config.default_data_path().unwrap(),
            PathBuf::from("/tmp/fxconv")
        );
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str("defaults:\n  to: JPY\n").unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert_eq!(config.defaults.from, "USD");
        assert_eq!(config.defaults.to, "JPY");
        assert_eq!(config.defaults.amount, 100.0);
        assert!(config.data_path.is_none());
    }

    #[test]
    fn test_default_amount_must_fit_the_mask() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        fs::write(&config_path, "defaults:\n  amount: 1.234\n").unwrap();
        assert!(AppConfig::load_from_path(&config_path).is_err());

        fs::write(&config_path, "defaults:\n  amount: -5\n").unwrap();
        assert!(AppConfig::load_from_path(&config_path).is_err());

        fs::write(&config_path, "defaults:\n  amount: 0\n").unwrap();
        assert!(AppConfig::load_from_path(&config_path).is_err());

        fs::write(&config_path, "defaults:\n  amount: 12.5\n").unwrap();
        let config = AppConfig::load_from_path(&config_path).unwrap();
        assert_eq!(config.defaults.amount, 12.5);
    }

    #[test]
    fn test_api_url_override() {
        let config = AppConfig::default()
            .with_api_url_override(Some("http://rates.internal/api".to_string()));
        assert_eq!(config.api.base_url, "http://rates.internal/api");

        let config = AppConfig::default().with_api_url_override(Some("  ".to_string()));
        assert_eq!(config.api.base_url, DEFAULT_API_URL);

        let config = AppConfig::default().with_api_url_override(None);
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
    }
}
