//! Connection parameters
//!
//! Values come from, in order: command-line flags or their environment
//! variables, the configuration file, and finally an interactive prompt.
//! Only the domain, username and password are ever prompted for.

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use kcustomize_api::{ClientOptions, Credentials};
use kcustomize_core::config::Config;
use kcustomize_core::messages::{bound_message, Lang, MessageKey};

/// Connection flags of the upload command
#[derive(Debug, Clone, Default, clap::Args)]
pub struct ConnectionArgs {
    /// kintone domain, e.g. example.cybozu.com
    #[arg(long, env = "KINTONE_DOMAIN")]
    pub domain: Option<String>,

    /// Login name
    #[arg(long, env = "KINTONE_USERNAME")]
    pub username: Option<String>,

    /// Login password
    #[arg(long, env = "KINTONE_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Username for domains behind HTTP Basic authentication
    #[arg(long, env = "KINTONE_BASIC_AUTH_USERNAME")]
    pub basic_auth_username: Option<String>,

    /// Password for domains behind HTTP Basic authentication
    #[arg(long, env = "KINTONE_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    pub basic_auth_password: Option<String>,

    /// Proxy URL for every request
    #[arg(long, env = "HTTPS_PROXY")]
    pub proxy: Option<String>,

    /// Guest space the app belongs to
    #[arg(long)]
    pub guest_space_id: Option<u64>,
}

/// Everything needed to build a kintone client
#[derive(Debug)]
pub struct ConnectionParams {
    pub domain: String,
    pub credentials: Credentials,
    pub options: ClientOptions,
}

/// Source of interactively entered values
pub trait Prompter {
    fn input(&self, prompt: &str) -> Result<String>;
    fn password(&self, prompt: &str) -> Result<String>;
}

/// Terminal prompts
pub struct DialoguerPrompter;

impl Prompter for DialoguerPrompter {
    fn input(&self, prompt: &str) -> Result<String> {
        Input::<String>::new()
            .with_prompt(prompt)
            .validate_with(|value: &String| -> Result<(), &str> {
                if value.trim().is_empty() {
                    Err("a value is required")
                } else {
                    Ok(())
                }
            })
            .interact_text()
            .context("Failed to read input")
    }

    fn password(&self, prompt: &str) -> Result<String> {
        Password::new()
            .with_prompt(prompt)
            .interact()
            .context("Failed to read password")
    }
}

/// Picks the message language
///
/// The flag wins, then the configured language, then the locale.
pub fn resolve_lang(flag: Option<Lang>, configured: Option<Lang>, locale: Option<&str>) -> Lang {
    flag.or(configured)
        .unwrap_or_else(|| locale.map(Lang::from_locale).unwrap_or_default())
}

/// Fills in missing connection values from the config file or by prompting
pub fn resolve_connection(
    args: &ConnectionArgs,
    config: &Config,
    lang: Lang,
    prompter: &dyn Prompter,
) -> Result<ConnectionParams> {
    let m = bound_message(lang);

    let domain = match present(&args.domain).or_else(|| present(&config.kintone.domain)) {
        Some(domain) => domain,
        None => prompter.input(m(MessageKey::QuestionDomain))?,
    };
    let username = match present(&args.username) {
        Some(username) => username,
        None => prompter.input(m(MessageKey::QuestionUsername))?,
    };
    let password = match present(&args.password) {
        Some(password) => password,
        None => prompter.password(m(MessageKey::QuestionPassword))?,
    };

    let mut credentials = Credentials::new(username, password);
    if let (Some(user), Some(pass)) = (
        present(&args.basic_auth_username),
        present(&args.basic_auth_password),
    ) {
        credentials = credentials.with_basic_auth(user, pass);
    }

    let options = ClientOptions {
        guest_space_id: args.guest_space_id.or(config.kintone.guest_space_id),
        proxy: present(&args.proxy).or_else(|| present(&config.kintone.proxy)),
    };

    Ok(ConnectionParams {
        domain,
        credentials,
        options,
    })
}

/// Treats empty strings like missing values
fn present(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
