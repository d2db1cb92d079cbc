//! Configuration management for the Sluice client.
//!
//! Configuration is an explicit value handed to [`ApiClient::new`](crate::client::ApiClient::new).
//! Nothing reads ambient state after construction. `Config::from_env()` is a
//! convenience for binaries that keep their settings in environment variables
//! or a `.env` file.

use std::env;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::error::SluiceError;
use crate::retry::RetryPolicy;

/// API path appended to the account host.
const API_PATH: &str = "/api/v2";

/// Credential used to build the `Authorization: Basic ...` header.
///
/// The secret is never printed by `Debug` and never logged.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// A raw API key. Sent as basic auth with the user `key` and password `X`.
    ApiKey(String),

    /// A token already base64-encoded by the caller, sent verbatim after `Basic `.
    Encoded(String),
}

impl Credential {
    /// Returns the secret material, for sanitizing messages only.
    pub(crate) fn secret(&self) -> &str {
        match self {
            Credential::ApiKey(key) => key,
            Credential::Encoded(token) => token,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiKey(_) => f.write_str("ApiKey([REDACTED])"),
            Credential::Encoded(_) => f.write_str("Encoded([REDACTED])"),
        }
    }
}

/// Configuration for connecting to the ITSM account.
#[derive(Clone, Debug)]
pub struct Config {
    /// Fully qualified API root (e.g., `https://acme.freshservice.com/api/v2`).
    pub base_url: String,

    /// Account credential. May be absent here and supplied per request instead.
    pub credential: Option<Credential>,

    /// Whether the rate limit governor may sleep after successful calls.
    pub throttle: bool,

    /// How many 429 responses a single logical call may absorb.
    pub retry: RetryPolicy,

    /// Per-request deadline. `None` leaves timeouts to the transport.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Creates a configuration for the given account URL or bare host.
    ///
    /// `acme.freshservice.com`, `https://acme.freshservice.com/` and
    /// `https://acme.freshservice.com/api/v2` all normalize to the same API root.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Config` if the URL cannot be parsed or has no host.
    pub fn new(base_url: impl Into<String>) -> Result<Self, SluiceError> {
        Ok(Config {
            base_url: Self::validate_base_url(base_url.into())?,
            credential: None,
            throttle: false,
            retry: RetryPolicy::default(),
            timeout: None,
        })
    }

    /// Sets a raw API key as the credential.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credential = Some(Credential::ApiKey(key.into()));
        self
    }

    /// Sets a pre-encoded basic token as the credential.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.credential = Some(Credential::Encoded(token.into()));
        self
    }

    /// Enables or disables self-throttling.
    pub fn with_throttling(mut self, enabled: bool) -> Self {
        self.throttle = enabled;
        self
    }

    /// Replaces the 429 retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Sets a deadline for every HTTP exchange.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Loads configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SLUICE_BASE_URL` (required): account URL or host
    /// - `SLUICE_API_KEY`: raw API key
    /// - `SLUICE_AUTH_TOKEN`: pre-encoded basic token, wins over the key
    /// - `SLUICE_THROTTLE`: `1`, `true`, `yes` or `on` enables throttling
    /// - `SLUICE_MAX_RATE_LIMIT_RETRIES`: cap on 429 retries (unset = unbounded)
    /// - `SLUICE_TIMEOUT_SECS`: per-request deadline in seconds (unset = none)
    ///
    /// A missing credential is not an error here; calls fail with
    /// `NotAuthenticated` unless the request carries its own.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Config` if a variable is missing or invalid.
    pub fn from_env() -> Result<Self, SluiceError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SluiceError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get("SLUICE_BASE_URL").ok_or_else(|| SluiceError::missing_env("SLUICE_BASE_URL"))?;
        let mut config = Config::new(base_url)?;

        if let Some(token) = get("SLUICE_AUTH_TOKEN") {
            Self::validate_secret("SLUICE_AUTH_TOKEN", &token)?;
            config = config.with_auth_token(token);
        } else if let Some(key) = get("SLUICE_API_KEY") {
            Self::validate_secret("SLUICE_API_KEY", &key)?;
            config = config.with_api_key(key);
        }

        if let Some(flag) = get("SLUICE_THROTTLE") {
            config.throttle = Self::parse_bool("SLUICE_THROTTLE", &flag)?;
        }

        if let Some(cap) = get("SLUICE_MAX_RATE_LIMIT_RETRIES") {
            let cap = cap.parse::<u32>().map_err(|_| {
                SluiceError::invalid_config("SLUICE_MAX_RATE_LIMIT_RETRIES must be a non-negative integer")
            })?;
            config.retry = RetryPolicy::capped(cap);
        }

        if let Some(secs) = get("SLUICE_TIMEOUT_SECS") {
            let secs = secs
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| SluiceError::invalid_config("SLUICE_TIMEOUT_SECS must be a positive integer"))?;
            config.timeout = Some(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Validates and normalizes the base URL to the API root.
    fn validate_base_url(url: String) -> Result<String, SluiceError> {
        let url = url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(SluiceError::invalid_config("base URL must not be empty"));
        }

        let url = if url.contains("://") {
            url.to_string()
        } else {
            format!("https://{}", url)
        };

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(SluiceError::invalid_config(
                "SLUICE_BASE_URL must start with http:// or https://",
            ));
        }

        let parsed = Url::parse(&url)
            .map_err(|e| SluiceError::invalid_config(format!("invalid base URL: {}", e)))?;
        if parsed.host_str().is_none() {
            return Err(SluiceError::invalid_config("base URL has no host"));
        }
        if parsed.scheme() == "http" {
            tracing::warn!("base URL uses plain http; TLS is only enforced for https");
        }

        let url = if url.ends_with(API_PATH) {
            url
        } else if url.ends_with("/api") {
            format!("{}/v2", url)
        } else {
            format!("{}{}", url, API_PATH)
        };

        Ok(url)
    }

    /// Validates the credential is not a placeholder value.
    fn validate_secret(name: &str, value: &str) -> Result<(), SluiceError> {
        let lower = value.to_lowercase();
        let placeholder_patterns = [
            "your_api_key",
            "your_key",
            "placeholder",
            "xxx",
            "changeme",
        ];

        for pattern in placeholder_patterns {
            if lower.contains(pattern) {
                return Err(SluiceError::invalid_config(format!(
                    "{} appears to be a placeholder value",
                    name
                )));
            }
        }

        Ok(())
    }

    fn parse_bool(name: &str, value: &str) -> Result<bool, SluiceError> {
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(SluiceError::invalid_config(format!(
                "{} must be a boolean, got {:?}",
                name, value
            ))),
        }
    }
}
