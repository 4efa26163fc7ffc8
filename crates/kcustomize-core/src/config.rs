//! Configuration module for kcustomize.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//! Command-line flags take precedence over every value here.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::messages::Lang;

/// Top-level configuration for kcustomize.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kintone: KintoneConfig,
    /// Message language. `None` picks one from the `LANG` environment variable.
    pub lang: Option<Lang>,
    pub watch: WatchConfig,
    pub logging: LoggingConfig,
}

/// Connection settings for the kintone environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KintoneConfig {
    /// Domain such as `example.cybozu.com`. `https://` is added when missing.
    pub domain: Option<String>,
    /// Guest space id, when the app lives in a guest space.
    pub guest_space_id: Option<u64>,
    /// Proxy URL applied to every request.
    pub proxy: Option<String>,
}

/// File watching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Milliseconds a file must stay quiet before a change is acted upon.
    pub stability_threshold_ms: u64,
    /// Milliseconds between checks of the pending change queue.
    pub poll_interval_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Load `path` for a command that acts on the configuration.
    ///
    /// A missing file yields the defaults. Unlike [`Config::load_or_default`],
    /// a file that does not parse or fails [`Config::validate`] is an error.
    pub fn load_validated(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = Self::load(path)
            .with_context(|| format!("Failed to parse configuration {}", path.display()))?;
        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::bail!(
                "Invalid configuration {}: {}",
                path.display(),
                messages.join("; ")
            );
        }
        Ok(config)
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/kcustomize/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("kcustomize")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            stability_threshold_ms: 2000,
            poll_interval_ms: 100,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"watch.poll_interval_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- kintone ---
        if let Some(domain) = &self.kintone.domain {
            if domain.trim().is_empty() {
                errors.push(ValidationError {
                    field: "kintone.domain".into(),
                    message: "must not be empty".into(),
                });
            }
        }
        if let Some(proxy) = &self.kintone.proxy {
            if !(proxy.starts_with("http://") || proxy.starts_with("https://")) {
                errors.push(ValidationError {
                    field: "kintone.proxy".into(),
                    message: format!("must be an http(s) URL, got '{}'", proxy),
                });
            }
        }
        if self.kintone.guest_space_id == Some(0) {
            errors.push(ValidationError {
                field: "kintone.guest_space_id".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- watch ---
        if self.watch.stability_threshold_ms == 0 {
            errors.push(ValidationError {
                field: "watch.stability_threshold_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.watch.poll_interval_ms == 0 {
            errors.push(ValidationError {
                field: "watch.poll_interval_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.watch.poll_interval_ms > self.watch.stability_threshold_ms {
            errors.push(ValidationError {
                field: "watch.poll_interval_ms".into(),
                message: format!(
                    "poll_interval_ms ({}) must not exceed stability_threshold_ms ({})",
                    self.watch.poll_interval_ms, self.watch.stability_threshold_ms
                ),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust,no_run
/// use kcustomize_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .kintone_domain("example.cybozu.com")
///     .watch_stability_threshold_ms(500)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- kintone ---

    pub fn kintone_domain(mut self, domain: impl Into<String>) -> Self {
        self.config.kintone.domain = Some(domain.into());
        self
    }

    pub fn kintone_guest_space_id(mut self, id: u64) -> Self {
        self.config.kintone.guest_space_id = Some(id);
        self
    }

    pub fn kintone_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.config.kintone.proxy = Some(proxy.into());
        self
    }

    pub fn lang(mut self, lang: Lang) -> Self {
        self.config.lang = Some(lang);
        self
    }

    // --- watch ---

    pub fn watch_stability_threshold_ms(mut self, ms: u64) -> Self {
        self.config.watch.stability_threshold_ms = ms;
        self
    }

    pub fn watch_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.watch.poll_interval_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
