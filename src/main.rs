//! Sluice - command line access to the ITSM API
//!
//! Prints the records of one resource as pretty JSON.
//!
//! # Configuration
//!
//! Set the following environment variables (or use a `.env` file):
//!
//! - `SLUICE_BASE_URL`: account URL or host (e.g., `acme.freshservice.com`)
//! - `SLUICE_API_KEY` or `SLUICE_AUTH_TOKEN`: credential
//! - `SLUICE_THROTTLE`: enable self-throttling
//!
//! # Usage
//!
//! ```bash
//! # Every ticket, all pages
//! ./sluice tickets
//!
//! # One release
//! ./sluice releases 17
//! ```

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use sluice::resources::{ListParams, ResourceKind};
use sluice::{config, ApiClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    // Logs go to stderr so stdout stays clean JSON
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sluice=info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let mut args = std::env::args().skip(1);
    let resource = args.next().unwrap_or_else(|| "tickets".to_string());
    let id = args.next();

    let kind = ResourceKind::from_name(&resource)
        .with_context(|| format!("unknown resource: {}", resource))?;

    let config = config::Config::from_env().context("Failed to load configuration")?;
    tracing::debug!(base_url = %config.base_url, throttle = config.throttle, "Configuration loaded");

    let client = ApiClient::new(&config).context("Failed to create API client")?;

    if let Err(e) = client.test_connection().await {
        tracing::error!(error = %e, "Connection test failed");
        tracing::warn!("Continuing anyway; check configuration and network connectivity.");
    }

    let handle = client.resource(kind);
    let output = match id {
        Some(id) => handle
            .get(&id)
            .await
            .with_context(|| format!("Failed to get {} {}", kind.singular, id))?,
        None => {
            let records = handle
                .list(ListParams::new().with_per_page(100))
                .await
                .with_context(|| format!("Failed to list {}", kind.plural))?;
            tracing::info!(count = records.len(), "Fetched {}", kind.plural);
            serde_json::Value::Array(records.records)
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
