//! Config command - View and manage the uploader configuration
//!
//! Provides the `config` CLI command which:
//! 1. Shows the current configuration (YAML or JSON)
//! 2. Prints the configuration file location
//! 3. Sets individual configuration values via dot-notation keys
//! 4. Validates the configuration file and reports errors

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use kcustomize_core::config::Config;
use kcustomize_core::messages::Lang;
use tracing::info;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};
use crate::GlobalOptions;

/// Keys accepted by `config set`, with a short description
const SUPPORTED_KEYS: &[(&str, &str)] = &[
    ("kintone.domain", "kintone domain, e.g. example.cybozu.com"),
    ("kintone.guest_space_id", "Guest space id (none to clear)"),
    ("kintone.proxy", "Proxy URL (none to clear)"),
    ("lang", "en|ja (none to follow LANG)"),
    ("watch.stability_threshold_ms", "Quiet period before a change is acted upon"),
    ("watch.poll_interval_ms", "Milliseconds between change queue checks"),
    ("logging.level", "trace|debug|info|warn|error"),
];

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "kintone.domain")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, globals: &GlobalOptions) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(globals),
            ConfigCommand::Path => self.execute_path(globals),
            ConfigCommand::Set { key, value } => self.execute_set(key, value, globals),
            ConfigCommand::Validate => self.execute_validate(globals),
        }
    }

    fn execute_show(&self, globals: &GlobalOptions) -> Result<()> {
        let formatter = get_formatter(globals.format == OutputFormat::Json);
        let config_path = &globals.config_path;

        info!(config_path = %config_path.display(), "Showing configuration");

        if globals.format == OutputFormat::Json {
            let json = serde_json::to_value(&globals.config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&globals.config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_path(&self, globals: &GlobalOptions) -> Result<()> {
        let path = globals.config_path.display().to_string();
        if globals.format == OutputFormat::Json {
            let formatter = get_formatter(true);
            formatter.print_json(&serde_json::json!({
                "config_path": path,
                "exists": globals.config_path.exists(),
            }));
        } else {
            println!("{}", path);
        }
        Ok(())
    }

    fn execute_set(&self, key: &str, value: &str, globals: &GlobalOptions) -> Result<()> {
        let json = globals.format == OutputFormat::Json;
        let formatter = get_formatter(json);
        let config_path = &globals.config_path;
        let mut config = globals.config.clone();

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if json {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                print_supported_keys(formatter.as_ref());
            }
            anyhow::bail!("configuration was not changed");
        }

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            if json {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": messages,
                }));
            }
            anyhow::bail!("Invalid value for '{}': {}", key, messages.join("; "));
        }

        save_config(&config, config_path)?;

        if json {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    fn execute_validate(&self, globals: &GlobalOptions) -> Result<()> {
        let json = globals.format == OutputFormat::Json;
        let formatter = get_formatter(json);
        let config_path = &globals.config_path;

        // Load explicitly: a parse error must be reported, not defaulted away
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(_) if !config_path.exists() => {
                if json {
                    formatter.print_json(&serde_json::json!({
                        "valid": true,
                        "config_path": config_path.display().to_string(),
                        "errors": [],
                        "note": "Configuration file not found. Using defaults.",
                    }));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration. Run 'kintone-customize-uploader config set <key> <value>' to create one.");
                }
                return Ok(());
            }
            Err(e) => {
                if json {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [format!("Failed to parse configuration: {}", e)],
                    }));
                }
                return Err(e).with_context(|| {
                    format!("Failed to parse configuration {}", config_path.display())
                });
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if json {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            anyhow::bail!("configuration is invalid")
        }
    }
}

fn print_supported_keys(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info("Supported keys:");
    for (key, description) in SUPPORTED_KEYS {
        formatter.info(&format!("  {:<30} - {}", key, description));
    }
}

fn save_config(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")
}

/// `none` and the empty string clear an optional value
fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "kintone.domain" => {
            config.kintone.domain = optional(value).map(str::to_string);
        }
        "kintone.guest_space_id" => {
            config.kintone.guest_space_id = optional(value)
                .map(|v| v.parse::<u64>())
                .transpose()
                .context("Expected a positive integer for kintone.guest_space_id")?;
        }
        "kintone.proxy" => {
            config.kintone.proxy = optional(value).map(str::to_string);
        }
        "lang" => {
            config.lang = optional(value)
                .map(|v| v.parse::<Lang>())
                .transpose()
                .map_err(anyhow::Error::msg)?;
        }
        "watch.stability_threshold_ms" => {
            config.watch.stability_threshold_ms = value
                .parse::<u64>()
                .context("Expected a positive integer for watch.stability_threshold_ms")?;
        }
        "watch.poll_interval_ms" => {
            config.watch.poll_interval_ms = value
                .parse::<u64>()
                .context("Expected a positive integer for watch.poll_interval_ms")?;
        }
        "logging.level" => {
            config.logging.level = value.to_string();
        }
        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}
