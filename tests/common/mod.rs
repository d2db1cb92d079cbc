//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use sluice::sleeper::RecordingSleeper;
use sluice::{ApiClient, Config};
use wiremock::MockServer;

/// API key used by every test client.
pub const TEST_KEY: &str = "test_key";

/// `base64("test_key:X")`.
pub const TEST_BASIC: &str = "Basic dGVzdF9rZXk6WA==";

/// Config pointing at the mock server, authenticated with `TEST_KEY`.
pub fn config_for(server: &MockServer) -> Config {
    Config::new(server.uri()).unwrap().with_api_key(TEST_KEY)
}

/// Client plus the recorder that observes its sleeps.
pub fn client_for(config: &Config) -> (ApiClient, RecordingSleeper) {
    let sleeper = RecordingSleeper::new();
    let client = ApiClient::new(config)
        .unwrap()
        .with_sleeper(Arc::new(sleeper.clone()));
    (client, sleeper)
}

/// Starts a mock server and a matching client.
pub async fn setup() -> (MockServer, ApiClient, RecordingSleeper) {
    let server = MockServer::start().await;
    let (client, sleeper) = client_for(&config_for(&server));
    (server, client, sleeper)
}

/// `Link` header value pointing at `path_and_query` on the mock server.
pub fn link_to(server: &MockServer, path_and_query: &str) -> String {
    format!("<{}{}>; rel=\"next\"", server.uri(), path_and_query)
}

/// Number of requests the mock server saw.
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}
