//! kintone REST API client
//!
//! Provides a typed HTTP client for the kintone REST API. Handles the
//! password and Basic authentication headers, guest space URL rewriting,
//! proxy configuration and error classification.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kcustomize_api::client::{ClientOptions, Credentials, KintoneClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let credentials = Credentials::new("admin", "secret");
//! let client = KintoneClient::new("example.cybozu.com", credentials, ClientOptions::default())?;
//! let status = kcustomize_api::deploy::deploy_status(&client, "42").await?;
//! println!("deployed: {}", status.done);
//! # Ok(())
//! # }
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{KintoneError, AUTHENTICATION_ERROR_CODE};

/// Header carrying the base64 encoded `username:password` pair
const PASSWORD_AUTH_HEADER: &str = "X-Cybozu-Authorization";

/// Status kintone uses for application-level errors
const KINTONE_ERROR_STATUS: u16 = 520;

/// Login credentials
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub basic_auth_username: Option<String>,
    pub basic_auth_password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            basic_auth_username: None,
            basic_auth_password: None,
        }
    }

    /// Adds HTTP Basic credentials for domains behind Basic authentication
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.basic_auth_username = Some(username.into());
        self.basic_auth_password = Some(password.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .field("basic_auth_username", &self.basic_auth_username)
            .finish()
    }
}

/// Connection options
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Routes every request through the guest space API
    pub guest_space_id: Option<u64>,
    /// Proxy URL applied to every request
    pub proxy: Option<String>,
}

/// Error body returned by kintone
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// HTTP client for kintone REST API calls
pub struct KintoneClient {
    /// The underlying HTTP client
    client: Client,
    /// Scheme and host, without a trailing slash
    base_url: String,
    /// Value of the password authentication header
    auth: String,
    /// Value of the `Authorization` header, if Basic authentication is used
    basic_auth: Option<String>,
    guest_space_id: Option<u64>,
}

impl KintoneClient {
    /// Creates a client for `domain`
    ///
    /// A domain without a scheme gets `https://` prepended.
    ///
    /// # Errors
    /// Returns [`KintoneError::InvalidConfig`] if the domain or proxy is not
    /// a valid URL.
    pub fn new(
        domain: &str,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self, KintoneError> {
        Self::with_base_url(normalize_domain(domain)?, credentials, options)
    }

    /// Creates a client with an explicit base URL (useful for testing)
    pub fn with_base_url(
        base_url: impl Into<String>,
        credentials: Credentials,
        options: ClientOptions,
    ) -> Result<Self, KintoneError> {
        let mut builder = Client::builder();
        if let Some(proxy) = options.proxy.as_deref() {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| KintoneError::InvalidConfig(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }
        let client = builder
            .build()
            .map_err(|e| KintoneError::InvalidConfig(e.to_string()))?;

        let basic_auth = match (&credentials.basic_auth_username, &credentials.basic_auth_password) {
            (Some(user), Some(pass)) => Some(format!("Basic {}", encode_pair(user, pass))),
            _ => None,
        };

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth: encode_pair(&credentials.username, &credentials.password),
            basic_auth,
            guest_space_id: options.guest_space_id,
        })
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full URL for an API path such as `/k/v1/file.json`
    ///
    /// In a guest space `/k/v1/...` becomes `/k/guest/<id>/v1/...`.
    pub fn url(&self, path: &str) -> String {
        match (self.guest_space_id, path.strip_prefix("/k")) {
            (Some(id), Some(rest)) => format!("{}/k/guest/{}{}", self.base_url, id, rest),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Creates an authenticated request builder for the given method and path
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .header(PASSWORD_AUTH_HEADER, &self.auth);
        if let Some(basic) = &self.basic_auth {
            builder = builder.header(reqwest::header::AUTHORIZATION, basic);
        }
        builder
    }

    /// Sends a request and parses its JSON response
    ///
    /// # Errors
    /// - [`KintoneError::NetworkError`] if no response was received
    /// - [`KintoneError::Authentication`] for HTTP 520 with code `CB_WA01`
    /// - [`KintoneError::Api`] for any other non-success status
    /// - [`KintoneError::InvalidResponse`] if a success body is not the expected JSON
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, KintoneError> {
        let response = request.send().await?;
        let response = check_status(response).await?;
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| KintoneError::InvalidResponse(format!("{}: {}", e, truncate(&body))))
    }
}

/// Classifies a non-success response
async fn check_status(response: Response) -> Result<Response, KintoneError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let body = response.text().await.unwrap_or_default();
    let parsed: Option<ErrorBody> = serde_json::from_str(&body).ok();
    let (code, message) = match parsed {
        Some(ErrorBody { code, message }) => (code, message.unwrap_or_else(|| truncate(&body))),
        None => (None, truncate(&body)),
    };

    if is_authentication_error(status, code.as_deref()) {
        warn!(path = %url, "kintone rejected the credentials");
        return Err(KintoneError::Authentication(message));
    }

    debug!(path = %url, status = status.as_u16(), code = ?code, "kintone returned an error");
    Err(KintoneError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

fn is_authentication_error(status: StatusCode, code: Option<&str>) -> bool {
    status.as_u16() == KINTONE_ERROR_STATUS && code == Some(AUTHENTICATION_ERROR_CODE)
}

fn encode_pair(user: &str, pass: &str) -> String {
    STANDARD.encode(format!("{}:{}", user, pass))
}

/// Turns a bare domain into an `https://` base URL
fn normalize_domain(domain: &str) -> Result<String, KintoneError> {
    let domain = domain.trim();
    let candidate = if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    };
    let url = Url::parse(&candidate)
        .map_err(|e| KintoneError::InvalidConfig(format!("invalid domain '{}': {}", domain, e)))?;
    if url.host_str().is_none() {
        return Err(KintoneError::InvalidConfig(format!(
            "invalid domain '{}': missing host",
            domain
        )));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

fn truncate(body: &str) -> String {
    const LIMIT: usize = 200;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
