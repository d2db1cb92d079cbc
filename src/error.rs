//! Error types for the Sluice client.
//!
//! This module defines `SluiceError`, the unified error type used throughout
//! the crate. Every failed call ends up as exactly one of its variants, so
//! callers can react to the kind without re-parsing response bytes.
//!
//! # Security
//!
//! All error messages built from upstream content are sanitized so the
//! credential never leaks into logs or error responses. Use
//! `sanitize_message()` when constructing messages from external sources.

use std::time::Duration;
use thiserror::Error;

use crate::models::FieldError;

/// Unified error type for all Sluice operations.
#[derive(Error, Debug)]
pub enum SluiceError {
    /// Configuration error - missing or invalid settings.
    #[error("configuration error: {0}")]
    Config(String),

    /// No credential was available anywhere in the call chain.
    #[error("not authenticated - set SLUICE_API_KEY or SLUICE_AUTH_TOKEN")]
    NotAuthenticated,

    /// HTTP request failed during transmission.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// Request timed out.
    #[error("request timed out after {duration:?} - the server may be slow or unreachable")]
    Timeout {
        /// How long we waited before timing out.
        duration: Duration,
        /// The operation that timed out.
        operation: String,
    },

    /// Rate limited by the server (HTTP 429).
    ///
    /// Only surfaced when the `Retry-After` header is missing or when a
    /// configured retry cap is exhausted.
    #[error("{}", rate_limited_message(.retry_after))]
    RateLimited {
        /// Delay requested by the server, if it sent a usable `Retry-After`.
        retry_after: Option<Duration>,
    },

    /// The server rejected the request input (HTTP 400).
    #[error("{}", validation_message(.description, .errors))]
    ValidationFailed {
        /// Top-level description from the error body.
        description: String,
        /// Field level errors, in server order.
        errors: Vec<FieldError>,
    },

    /// Any other non-success status.
    #[error("HTTP {status}: {body}")]
    Upstream {
        /// The HTTP status code returned.
        status: reqwest::StatusCode,
        /// The raw (sanitized, truncated) response body.
        body: String,
    },

    /// A success status carried no body on a call that expects data.
    #[error("empty response from {method} {url}")]
    EmptyResponse {
        /// HTTP method of the call.
        method: String,
        /// URL of the call.
        url: String,
    },

    /// The response body did not have exactly one data property.
    #[error("unrecognized response envelope: expected one data property, found {keys:?}")]
    UnrecognizedEnvelope {
        /// Top-level keys found, excluding `total`.
        keys: Vec<String>,
    },

    /// A continuation link pointed away from the configured host.
    #[error("continuation link leaves the configured host: {link}")]
    ForeignLink {
        /// The offending link.
        link: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local input validation failed before any request was made.
    #[error("validation error: {0}")]
    Validation(String),

    /// Connection test failed.
    #[error("connection test failed: {message}")]
    ConnectionTest {
        /// Details about why the connection test failed.
        message: String,
    },
}

fn rate_limited_message(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(delay) => format!("rate limited by server - retry after {}s", delay.as_secs()),
        None => "rate limited by server without a usable Retry-After header".to_string(),
    }
}

/// Builds `"<description>: a field - msg; b field - msg"`.
fn validation_message(description: &str, errors: &[FieldError]) -> String {
    if errors.is_empty() {
        return description.to_string();
    }
    let joined = errors
        .iter()
        .map(FieldError::describe)
        .collect::<Vec<_>>()
        .join("; ");
    format!("{}: {}", description, joined)
}

impl SluiceError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        SluiceError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        SluiceError::Config(message.into())
    }

    /// Creates a local validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SluiceError::Validation(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(duration: Duration, operation: impl Into<String>) -> Self {
        SluiceError::Timeout {
            duration,
            operation: operation.into(),
        }
    }

    /// Creates a connection test error.
    pub fn connection_test(message: impl Into<String>) -> Self {
        SluiceError::ConnectionTest {
            message: message.into(),
        }
    }

    /// Returns true if the engine retries this error internally.
    ///
    /// Only a 429 that told us how long to wait qualifies. Everything else
    /// is terminal and goes straight back to the caller.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SluiceError::RateLimited {
                retry_after: Some(_)
            }
        )
    }

    /// Returns true if this is a rate limit error.
    #[must_use]
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, SluiceError::RateLimited { .. })
    }

    /// Returns the server-requested delay before retry, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            SluiceError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Returns the field level errors of a `ValidationFailed`, empty otherwise.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SluiceError::ValidationFailed { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Returns the HTTP status attached to this error, if there is one.
    #[must_use]
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            SluiceError::Upstream { status, .. } => Some(*status),
            SluiceError::ValidationFailed { .. } => Some(reqwest::StatusCode::BAD_REQUEST),
            SluiceError::RateLimited { .. } => Some(reqwest::StatusCode::TOO_MANY_REQUESTS),
            SluiceError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Sanitizes an error message to remove any occurrence of the credential.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to sanitize
    /// * `secret` - The API key or token to strip from the message
    ///
    /// # Returns
    ///
    /// The message with any occurrence of the secret replaced with `[REDACTED]`
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        message.replace(secret, "[REDACTED]")
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secret: &str) -> String {
        Self::sanitize_message(&self.to_string(), secret)
    }
}
