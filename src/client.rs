//! HTTP client for the ITSM REST API.
//!
//! This module provides [`ApiClient`], the single request-execution engine
//! every per-resource operation routes through.
//!
//! # Call flow
//!
//! 1. Resolve the credential (request override, then config). No credential
//!    fails with `NotAuthenticated` before any network activity.
//! 2. Send the request over TLS 1.2+ with basic auth and `Accept-Charset: utf-8`.
//! 3. Classify failures. A 429 with `Retry-After` sleeps and re-issues the
//!    identical request; everything else is surfaced.
//! 4. On success, let the rate limit governor sleep if throttling is enabled.
//! 5. Optionally normalize the envelope and follow continuation links.
//!
//! # Security
//!
//! The credential is never logged. All error bodies are sanitized before they
//! are stored in an error or logged.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, ACCEPT, ACCEPT_CHARSET, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::{Config, Credential};
use crate::envelope::{self, Normalized};
use crate::error::SluiceError;
use crate::models::ErrorEnvelope;
use crate::pagination::Pages;
use crate::request::{ApiRequest, ApiResponse, Method, Payload};
use crate::resources::{ListParams, Resource, ResourceKind};
use crate::retry::{self, RetryPolicy};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::throttle;

/// Maximum length for error bodies kept in `SluiceError::Upstream`.
const MAX_ERROR_BODY_LEN: usize = 500;

/// Description used when a 400 body carries none.
const DEFAULT_VALIDATION_DESCRIPTION: &str = "Validation failed";

/// Headers the engine sets itself. Caller copies are dropped.
const RESERVED_HEADERS: [&str; 4] = ["authorization", "accept", "accept-charset", "content-type"];

/// Request-execution engine for the ITSM API.
///
/// Cloning is cheap; clones share the connection pool and sleeper.
///
/// # Example
///
/// ```ignore
/// let config = Config::from_env()?;
/// let client = ApiClient::new(&config)?;
///
/// let tickets = client.resource(ResourceKind::TICKET).list(ListParams::new()).await?;
/// ```
#[derive(Clone)]
pub struct ApiClient {
    /// The underlying HTTP client.
    http: Client,

    /// API root (e.g., `https://acme.freshservice.com/api/v2`).
    base_url: Url,

    /// Account credential. SECURITY: never log this value!
    credential: Option<Credential>,

    /// Whether the governor may sleep.
    throttle: bool,

    /// 429 retry policy.
    retry: RetryPolicy,

    /// Opt-in per-request deadline.
    timeout: Option<Duration>,

    /// Waits for retry and throttle delays.
    sleeper: Arc<dyn Sleeper>,
}

impl ApiClient {
    /// Creates a new client from configuration.
    ///
    /// # Errors
    ///
    /// - `SluiceError::Config` if the base URL does not parse
    /// - `SluiceError::HttpClient` if the HTTP client fails to initialize
    pub fn new(config: &Config) -> Result<Self, SluiceError> {
        let mut builder = Client::builder().min_tls_version(reqwest::tls::Version::TLS_1_2);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(SluiceError::HttpClient)?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| SluiceError::invalid_config(format!("invalid base URL: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            credential: config.credential.clone(),
            throttle: config.throttle,
            retry: config.retry,
            timeout: config.timeout,
            sleeper: Arc::new(TokioSleeper),
        })
    }

    /// Replaces the sleeper used for retry and throttle delays.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Returns the API root.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns true if throttling is enabled.
    pub fn is_throttling(&self) -> bool {
        self.throttle
    }

    /// Returns the secret for sanitization, or an empty string.
    fn secret(&self) -> &str {
        self.credential.as_ref().map(Credential::secret).unwrap_or("")
    }

    /// Builds a fully qualified URL from a resource path and query pairs.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::Validation` if the path does not produce a valid URL.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, SluiceError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&joined)
            .map_err(|e| SluiceError::validation(format!("invalid request path {:?}: {}", path, e)))?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }

    /// Returns true if `url` has the same scheme, host and port as the API root.
    pub(crate) fn is_same_origin(&self, url: &Url) -> bool {
        url.scheme() == self.base_url.scheme()
            && url.host_str() == self.base_url.host_str()
            && url.port_or_known_default() == self.base_url.port_or_known_default()
    }

    /// Returns a handle for one resource kind.
    pub fn resource(&self, kind: ResourceKind) -> Resource<'_> {
        Resource::new(self, kind)
    }

    /// Tests connectivity and authentication by fetching one ticket page.
    ///
    /// # Errors
    ///
    /// Returns `SluiceError::ConnectionTest` with a hint about the likely cause.
    pub async fn test_connection(&self) -> Result<(), SluiceError> {
        tracing::debug!("Testing connection to ITSM API");

        let params = ListParams::new().with_per_page(1).single_page();
        let result = self.resource(ResourceKind::TICKET).list(params).await;

        match result {
            Ok(_) => {
                tracing::info!("Connection test successful");
                Ok(())
            }
            Err(SluiceError::NotAuthenticated) => Err(SluiceError::connection_test(
                "no credential configured - set SLUICE_API_KEY or SLUICE_AUTH_TOKEN",
            )),
            Err(SluiceError::Upstream { status, .. })
                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN =>
            {
                Err(SluiceError::connection_test(
                    "authentication failed - verify the API key",
                ))
            }
            Err(SluiceError::Timeout { duration, .. }) => Err(SluiceError::connection_test(format!(
                "connection timed out after {:?} - verify SLUICE_BASE_URL is correct and the server is reachable",
                duration
            ))),
            Err(e) => Err(SluiceError::connection_test(e.sanitized_display(self.secret()))),
        }
    }

    /// Executes one logical call and returns the raw response.
    ///
    /// Rate-limited attempts are retried per the retry policy and the governor
    /// runs after the successful attempt. Callers that care about the exact
    /// status (e.g., 204 for deletes) inspect it on the returned response.
    ///
    /// # Errors
    ///
    /// Any classified failure except a retried 429.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, SluiceError> {
        let credential = request
            .credential
            .clone()
            .or_else(|| self.credential.clone())
            .filter(|c| !c.secret().trim().is_empty())
            .ok_or(SluiceError::NotAuthenticated)?;

        let operation = request.describe();
        let response = retry::with_rate_limit_retry(self.retry, self.sleeper.as_ref(), &operation, || {
            self.execute(&request, &credential)
        })
        .await?;

        throttle::govern(&response.headers, self.throttle, self.sleeper.as_ref()).await;

        Ok(response)
    }

    /// Executes one logical call and normalizes its envelope.
    ///
    /// Never follows continuation links.
    ///
    /// # Errors
    ///
    /// Everything `send` returns, plus `EmptyResponse` and `UnrecognizedEnvelope`.
    pub async fn fetch(&self, request: ApiRequest) -> Result<Normalized, SluiceError> {
        let response = self.send(request.clone()).await?;
        self.normalize_response(&request, &response, None)
    }

    /// Starts a lazy walk over every page of a listing.
    pub fn paginate(&self, request: ApiRequest) -> Pages<'_> {
        Pages::new(self, request)
    }

    /// Turns a successful response into records.
    ///
    /// A delete may come back without a body; any other call must carry one.
    pub(crate) fn normalize_response(
        &self,
        request: &ApiRequest,
        response: &ApiResponse,
        expected: Option<(&str, &str)>,
    ) -> Result<Normalized, SluiceError> {
        if response.is_empty() {
            if request.method == Method::Delete {
                return Ok(Normalized::default());
            }
            return Err(SluiceError::EmptyResponse {
                method: request.method.to_string(),
                url: request.url.to_string(),
            });
        }

        tracing::trace!(body = %response.body, "API response");

        match expected {
            Some((singular, plural)) => envelope::normalize_expecting(&response.body, singular, plural),
            None => envelope::normalize(&response.body),
        }
    }

    /// Performs a single HTTP exchange without retry.
    async fn execute(
        &self,
        request: &ApiRequest,
        credential: &Credential,
    ) -> Result<ApiResponse, SluiceError> {
        tracing::debug!(
            method = %request.method,
            path = %request.url.path(),
            "Making API request"
        );

        let mut req = self
            .http
            .request(request.method.as_reqwest(), request.url.clone())
            .header(ACCEPT, "application/json")
            .header(ACCEPT_CHARSET, "utf-8");

        req = match credential {
            Credential::ApiKey(key) => req.basic_auth(key, Some("X")),
            Credential::Encoded(token) => req.header(AUTHORIZATION, format!("Basic {}", token)),
        };

        for (name, value) in request.headers() {
            if RESERVED_HEADERS.iter().any(|r| name.eq_ignore_ascii_case(r)) {
                tracing::warn!(header = %name, "Ignoring caller header owned by the client");
                continue;
            }
            req = req.header(name.as_str(), value.as_str());
        }

        // Multipart always carries its own boundary content type.
        req = match &request.payload {
            Payload::Empty => req.header(CONTENT_TYPE, request.content_type.as_str()),
            Payload::Json(body) => {
                let bytes = serde_json::to_vec(body).map_err(SluiceError::Serialization)?;
                req.header(CONTENT_TYPE, request.content_type.as_str()).body(bytes)
            }
            Payload::Multipart(form) => req.multipart(form.to_form()?),
        };

        let response = req.send().await.map_err(|e| self.transport_error(e, request))?;

        let status = response.status();
        let headers = response.headers().clone();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &headers, &body, credential.secret()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e, request))?;

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }

    /// Reports a timeout only when a deadline was configured.
    fn transport_error(&self, error: reqwest::Error, request: &ApiRequest) -> SluiceError {
        match self.timeout {
            Some(duration) if error.is_timeout() => SluiceError::timeout(duration, request.describe()),
            _ => SluiceError::Http(error),
        }
    }
}

/// Maps a non-2xx exchange to exactly one error kind.
pub(crate) fn classify_failure(
    status: StatusCode,
    headers: &HeaderMap,
    body: &str,
    secret: &str,
) -> SluiceError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = retry::parse_retry_after(headers);
            if retry_after.is_none() {
                tracing::error!("Rate limited without a usable Retry-After header");
            } else {
                tracing::warn!("Rate limited by API server");
            }
            SluiceError::RateLimited { retry_after }
        }
        StatusCode::BAD_REQUEST => {
            let envelope = ErrorEnvelope::parse(body);
            let description = envelope
                .description
                .map(|d| SluiceError::sanitize_message(&d, secret))
                .unwrap_or_else(|| DEFAULT_VALIDATION_DESCRIPTION.to_string());
            SluiceError::ValidationFailed {
                description,
                errors: envelope.errors,
            }
        }
        _ => {
            let body = SluiceError::sanitize_message(body, secret);
            SluiceError::Upstream {
                status,
                body: truncate_body(body),
            }
        }
    }
}

/// Truncates on a character boundary to avoid leaking verbose internals.
fn truncate_body(body: String) -> String {
    if body.len() <= MAX_ERROR_BODY_LEN {
        return body;
    }
    let mut end = MAX_ERROR_BODY_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...[truncated]", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, RETRY_AFTER};

    fn test_client() -> ApiClient {
        let config = Config::new("https://acme.freshservice.com")
            .unwrap()
            .with_api_key("test_key");
        ApiClient::new(&config).unwrap()
    }

    #[test]
    fn test_url_joins_path_and_query() {
        let client = test_client();
        let url = client
            .url("/tickets/filter", &[("query", "\"priority:3\"".to_string())])
            .unwrap();
        assert_eq!(url.path(), "/api/v2/tickets/filter");
        assert_eq!(url.query(), Some("query=%22priority%3A3%22"));
    }

    #[test]
    fn test_same_origin() {
        let client = test_client();
        assert!(client.is_same_origin(&Url::parse("https://acme.freshservice.com/api/v2/tickets?page=2").unwrap()));
        assert!(!client.is_same_origin(&Url::parse("https://evil.example/api/v2/tickets").unwrap()));
        assert!(!client.is_same_origin(&Url::parse("http://acme.freshservice.com/api/v2/tickets").unwrap()));
    }

    #[test]
    fn test_classify_429_with_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("3"));
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &headers, "", "");
        assert_eq!(err.retry_after(), Some(Duration::from_secs(3)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_classify_429_without_retry_after() {
        let err = classify_failure(StatusCode::TOO_MANY_REQUESTS, &HeaderMap::new(), "", "");
        assert!(matches!(err, SluiceError::RateLimited { retry_after: None }));
    }

    #[test]
    fn test_classify_400_with_field_errors() {
        let body = r#"{"description":"Validation failed","errors":[{"field":"email","message":"is required","code":"missing_field"}]}"#;
        let err = classify_failure(StatusCode::BAD_REQUEST, &HeaderMap::new(), body, "");
        assert!(err.to_string().ends_with("email field - is required"));
        assert_eq!(err.field_errors().len(), 1);
        assert_eq!(err.field_errors()[0].code.as_deref(), Some("missing_field"));
    }

    #[test]
    fn test_classify_400_with_unparsable_body() {
        let err = classify_failure(StatusCode::BAD_REQUEST, &HeaderMap::new(), "<html>", "");
        assert!(matches!(err, SluiceError::ValidationFailed { ref errors, .. } if errors.is_empty()));
    }

    #[test]
    fn test_classify_other_status_is_upstream_and_sanitized() {
        let err = classify_failure(
            StatusCode::NOT_FOUND,
            &HeaderMap::new(),
            "no such ticket for key test_key",
            "test_key",
        );
        match err {
            SluiceError::Upstream { status, body } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(!body.contains("test_key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let body = "é".repeat(400);
        let truncated = truncate_body(body);
        assert!(truncated.ends_with("...[truncated]"));
        assert!(truncated.len() <= MAX_ERROR_BODY_LEN + "...[truncated]".len());
    }
}
