//! Configuration management for MamaTrak.
//!
//! Loads configuration from ${MAMATRAK_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api_base_url`.
pub const API_BASE_URL_ENV: &str = "MAMATRAK_API_BASE_URL";

/// Returns the default config template with comments.
///
/// Embedded from default_config.toml at compile time.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Merges user config values into the default template.
///
/// New comments/sections from the template are always present,
/// while the user's customized values are preserved.
fn merge_with_template(user_config: &str) -> Result<String> {
    use toml_edit::DocumentMut;

    let mut doc: DocumentMut = default_config_template()
        .parse()
        .context("Failed to parse default config template")?;

    let user_doc: DocumentMut = user_config.parse().context("Failed to parse user config")?;

    merge_items(doc.as_table_mut(), user_doc.as_table());

    Ok(doc.to_string())
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for MamaTrak configuration and data files.
    //!
    //! MAMATRAK_HOME resolution order:
    //! 1. MAMATRAK_HOME environment variable (if set)
    //! 2. ~/.config/mamatrak (default)

    use std::path::PathBuf;

    /// Returns the MamaTrak home directory.
    pub fn mamatrak_home() -> PathBuf {
        if let Ok(home) = std::env::var("MAMATRAK_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".mamatrak"),
            |h| h.join(".config").join("mamatrak"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        mamatrak_home().join("config.toml")
    }

    /// Returns the path to the persisted session document.
    pub fn session_path() -> PathBuf {
        mamatrak_home().join("session.json")
    }

    /// Returns the directory for rolling log files.
    pub fn logs_dir() -> PathBuf {
        mamatrak_home().join("logs")
    }
}

/// Sign-in timing and banner text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Delay before redirecting to the dashboard after sign-in.
    pub navigate_delay_ms: u64,
    /// Lifetime of an error/success banner.
    pub feedback_timeout_ms: u64,
    /// Message shown when the server gives none.
    pub fallback_error_message: String,
    /// Message shown on success when the server gives none.
    pub success_message: String,
}

impl AuthConfig {
    pub const DEFAULT_NAVIGATE_DELAY_MS: u64 = 2000;
    pub const DEFAULT_FEEDBACK_TIMEOUT_MS: u64 = 3000;
    pub const DEFAULT_FALLBACK_ERROR_MESSAGE: &str = "Invalid credentials";
    pub const DEFAULT_SUCCESS_MESSAGE: &str = "Signed in successfully";

    pub fn navigate_delay(&self) -> Duration {
        Duration::from_millis(self.navigate_delay_ms)
    }

    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            navigate_delay_ms: Self::DEFAULT_NAVIGATE_DELAY_MS,
            feedback_timeout_ms: Self::DEFAULT_FEEDBACK_TIMEOUT_MS,
            fallback_error_message: Self::DEFAULT_FALLBACK_ERROR_MESSAGE.to_string(),
            success_message: Self::DEFAULT_SUCCESS_MESSAGE.to_string(),
        }
    }
}

/// Where log records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    /// Daily rolling file under `$MAMATRAK_HOME/logs`.
    File,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. "warn" or "mamatrak_core=debug".
    pub level: String,
    pub output: LogOutput,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: LogOutput::default(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the Auth API
    pub api_base_url: String,

    /// Dashboard origin opened after sign-in
    pub dashboard_url: String,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
    const DEFAULT_DASHBOARD_URL: &str = "http://localhost:3000";

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the Auth API base URL: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the resolved URL is not a valid URL.
    pub fn effective_api_base_url(&self) -> Result<String> {
        let env_value = std::env::var(API_BASE_URL_ENV).ok();
        resolve_api_base_url(env_value.as_deref(), &self.api_base_url)
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Saves only the `api_base_url` field to the config file.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_base_url(url: &str) -> Result<()> {
        Self::save_api_base_url_to(&paths::config_path(), url)
    }

    /// Saves only the `api_base_url` field to a specific config file path.
    ///
    /// Creates the file from the template if it doesn't exist; otherwise
    /// merges the user's values into the latest template first.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the file cannot be written.
    pub fn save_api_base_url_to(path: &Path, url: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let url = url.trim();
        validate_url(url)?;

        let contents = if path.exists() {
            let user_config = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            merge_with_template(&user_config)?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        doc["api_base_url"] = value(url);

        Self::write_config(path, &doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            dashboard_url: Self::DEFAULT_DASHBOARD_URL.to_string(),
            auth: AuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Picks the base URL with precedence: env > config > default.
///
/// Empty or whitespace-only values are treated as unset.
fn resolve_api_base_url(env_value: Option<&str>, config_value: &str) -> Result<String> {
    let chosen = [env_value, Some(config_value)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(Config::DEFAULT_API_BASE_URL);

    validate_url(chosen)?;
    Ok(chosen.to_string())
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid Auth API base URL: {url}"))?;
    Ok(())
}
