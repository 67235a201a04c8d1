use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Environment variable consulted when the config file carries no token.
pub const ACCESS_TOKEN_ENV: &str = "FASTGMAIL_ACCESS_TOKEN";

const APP_DIR: &str = "fastgmail";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { field: field.into(), message: message.into() });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { field: field.into(), message: message.into() });
    }

    /// All errors joined into one line
    pub fn error_summary(&self) -> String {
        self.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gmail: GmailConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub attachments: AttachmentConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GmailConfig {
    /// Mailbox owner, `me` for the authenticated user
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Root of the Gmail REST API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// OAuth bearer token. Prefer the environment variable over storing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
}

fn default_user_id() -> String {
    "me".to_string()
}

fn default_api_base_url() -> String {
    "https://gmail.googleapis.com".to_string()
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self { user_id: default_user_id(), api_base_url: default_api_base_url(), access_token: None }
    }
}

impl GmailConfig {
    /// Token from the file, else from [`ACCESS_TOKEN_ENV`]. Blank values count as unset.
    pub fn resolve_access_token(&self) -> Option<String> {
        self.resolve_access_token_with(std::env::var(ACCESS_TOKEN_ENV).ok())
    }

    fn resolve_access_token_with(&self, env_token: Option<String>) -> Option<String> {
        let usable = |t: &String| !t.trim().is_empty();
        self.access_token.clone().filter(usable).or_else(|| env_token.filter(usable))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// strftime pattern for delivery dates
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

// Keep in step with `fastgmail_message::DATE_FORMAT`.
fn default_date_format() -> String {
    "%a, %d %b %Y %H:%M:%S %z".to_string()
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { date_format: default_date_format() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    /// Where `attachments --save` writes files
    #[serde(default = "default_download_dir")]
    pub download_dir: String,

    /// Replace existing files instead of failing
    #[serde(default)]
    pub overwrite: bool,
}

fn default_download_dir() -> String {
    dirs::download_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .into_owned()
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self { download_dir: default_download_dir(), overwrite: false }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Created default config at {}", config_path.display());
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(config_path).context("Failed to read config file")?;

        let config: Config =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::validated(Self::load()?)
    }

    pub fn load_validated_from(config_path: &Path) -> Result<(Self, ValidationResult)> {
        Self::validated(Self::load_from(config_path)?)
    }

    fn validated(config: Self) -> Result<(Self, ValidationResult)> {
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.gmail.api_base_url, "gmail.api_base_url", &mut result);

        if self.gmail.user_id.trim().is_empty() {
            result.add_error("gmail.user_id", "User id must not be empty (use \"me\")");
        }

        if self.gmail.resolve_access_token().is_none() {
            result.add_warning(
                "gmail.access_token",
                format!("No access token configured; set {}", ACCESS_TOKEN_ENV),
            );
        }

        if self.display.date_format.trim().is_empty() {
            result.add_error("display.date_format", "Date format must not be empty");
        } else if !self.display.date_format.contains('%') {
            result.add_warning(
                "display.date_format",
                "Date format has no % specifiers and renders the same text for every date",
            );
        }

        let download_dir = PathBuf::from(&self.attachments.download_dir);
        if !download_dir.exists() {
            result.add_warning(
                "attachments.download_dir",
                format!("Path does not exist: {}", download_dir.display()),
            );
        } else if !download_dir.is_dir() {
            result.add_error(
                "attachments.download_dir",
                format!("Path is not a directory: {}", download_dir.display()),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.port() == Some(0) {
                    result.add_error(field_name, "Port cannot be 0");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// `<config_dir>/fastgmail/config.toml`
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?.join(APP_DIR);

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.attachments.download_dir = dir.to_string_lossy().into_owned();
        config.gmail.access_token = Some("token".into());
        config
    }

    #[test]
    fn test_valid_default_config() {
        let dir = tempfile::tempdir().unwrap();
        let result = test_config(dir.path()).validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn test_invalid_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.gmail.api_base_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "gmail.api_base_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.gmail.api_base_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_empty_user_id_and_date_format() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.gmail.user_id = "  ".to_string();
        config.display.date_format = String::new();
        let result = config.validate();
        assert_eq!(result.errors.len(), 2);
        assert!(result.error_summary().contains("gmail.user_id"));
        assert!(result.error_summary().contains("display.date_format"));
    }

    #[test]
    fn test_download_dir_is_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, b"x").unwrap();

        let mut config = test_config(dir.path());
        config.attachments.download_dir = file.to_string_lossy().into_owned();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "attachments.download_dir"));
    }

    #[test]
    fn test_missing_download_dir_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.attachments.download_dir =
            dir.path().join("missing").to_string_lossy().into_owned();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "attachments.download_dir"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.gmail.user_id, "me");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[gmail]"));
        assert!(!contents.contains("access_token"));
    }

    #[test]
    fn test_round_trip_and_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[gmail]\nuser_id = \"someone@example.com\"\n\n[attachments]\noverwrite = true\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.gmail.user_id, "someone@example.com");
        assert_eq!(config.gmail.api_base_url, "https://gmail.googleapis.com");
        assert!(config.attachments.overwrite);
        assert_eq!(config.display.date_format, "%a, %d %b %Y %H:%M:%S %z");
    }

    #[test]
    fn test_load_validated_rejects_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gmail]\napi_base_url = \"ftp://example.com\"\n").unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        assert!(err.to_string().contains("gmail.api_base_url"));
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[gmail\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_blank_file_token_is_ignored() {
        let mut gmail = GmailConfig { access_token: Some("  ".into()), ..Default::default() };
        assert!(gmail.resolve_access_token_with(None).is_none());
        assert_eq!(
            gmail.resolve_access_token_with(Some("from-env".into())).as_deref(),
            Some("from-env")
        );

        gmail.access_token = Some("from-file".into());
        assert_eq!(
            gmail.resolve_access_token_with(Some("from-env".into())).as_deref(),
            Some("from-file")
        );
        assert!(GmailConfig::default().resolve_access_token_with(Some(" ".into())).is_none());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert_eq!(summary, "field1: error1; field2: error2");
    }
}
