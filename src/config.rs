use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::format::Locale;

pub const DEFAULT_DELETE_PROMPT: &str =
    "Are you sure you want to delete this item? This action cannot be undone.";
const DEFAULT_BASE_URL: &str = "http://localhost/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read enhancer config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Markup conventions and timings the enhancer looks for. Every field has a
/// default, so a config file only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub alert_selector: String,
    pub alert_dismiss_after_ms: u64,
    pub tooltip_selector: String,
    pub popover_selector: String,
    pub validation_selector: String,
    pub validated_class: String,
    pub search_input_selector: String,
    pub delete_selector: String,
    pub delete_prompt: String,
    pub autofocus_selector: String,
    pub table_selector: String,
    pub table_row_selector: String,
    pub row_link_selector: String,
    pub striped_class: String,
    pub base_url: Url,
    pub locale: Locale,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            alert_selector: ".alert".into(),
            alert_dismiss_after_ms: 5_000,
            tooltip_selector: r#"[data-bs-toggle="tooltip"]"#.into(),
            popover_selector: r#"[data-bs-toggle="popover"]"#.into(),
            validation_selector: ".needs-validation".into(),
            validated_class: "was-validated".into(),
            search_input_selector: r#"input[type="text"]"#.into(),
            delete_selector: ".btn-outline-danger".into(),
            delete_prompt: DEFAULT_DELETE_PROMPT.into(),
            autofocus_selector: r#"form input[type="text"], form input[type="email"], form input[type="password"]"#.into(),
            table_selector: "table".into(),
            table_row_selector: "tbody tr".into(),
            row_link_selector: "a[href]".into(),
            striped_class: "table-striped".into(),
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default base URL"),
            locale: Locale::default(),
        }
    }
}

impl EnhancerConfig {
    /// Load from a YAML file; a missing path or file yields the defaults.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        match config_path {
            Some(path) if path.exists() => {
                let contents = fs::read_to_string(path)?;
                Self::from_yaml(&contents)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn alert_delay(&self) -> Duration {
        Duration::from_millis(self.alert_dismiss_after_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_default() {
        let config = EnhancerConfig::load(None).unwrap();
        assert_eq!(config.alert_delay(), Duration::from_secs(5));
        assert_eq!(config.delete_prompt, DEFAULT_DELETE_PROMPT);
        assert_eq!(config.base_url.as_str(), "http://localhost/");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config =
            EnhancerConfig::load(Some(PathBuf::from("/nonexistent/enhancer.yaml"))).unwrap();
        assert_eq!(config, EnhancerConfig::default());
    }

    #[test]
    fn loads_overrides_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        use std::io::Write;
        writeln!(
            file,
            "alert_dismiss_after_ms: 1500\nbase_url: http://records.local/\nlocale: en-GB"
        )
        .unwrap();

        let config = EnhancerConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.alert_dismiss_after_ms, 1500);
        assert_eq!(config.base_url.as_str(), "http://records.local/");
        assert_eq!(config.locale, Locale::EnGb);
        assert_eq!(config.alert_selector, ".alert");
    }

    #[test]
    fn rejects_malformed_yaml() {
        assert!(matches!(
            EnhancerConfig::from_yaml("alert_dismiss_after_ms: [soon"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
