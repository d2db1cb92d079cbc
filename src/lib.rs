//! # Sluice
//!
//! Sluice is a client library for a Freshservice-style ITSM REST API.
//!
//! Every operation, whether it lists tickets or restores a deleted release,
//! routes through one request-execution engine, [`ApiClient`](client::ApiClient).
//! The engine hides the transport concerns of the upstream protocol:
//!
//! - **Authentication**: basic auth from an API key or a pre-encoded token
//! - **TLS**: version 1.2 or newer is enforced regardless of platform default
//! - **Retry**: a 429 sleeps for exactly `Retry-After` seconds and re-issues
//!   the identical request
//! - **Throttling**: optional step delays as the account's rate window fills up
//! - **Normalization**: singular and plural envelopes become one record list
//! - **Pagination**: `Link` headers are followed until the last page
//! - **Errors**: every failure is classified into one [`SluiceError`](error::SluiceError) kind
//!
//! ## Architecture
//!
//! - [`config`] - Explicit configuration, optionally loaded from the environment
//! - [`error`] - Error taxonomy with credential sanitization
//! - [`client`] - Transport executor and error classifier
//! - [`retry`] - 429 retry loop and policy
//! - [`throttle`] - Rate limit governor
//! - [`envelope`] - Response normalizer
//! - [`pagination`] - Continuation link walker
//! - [`request`] - Request and response values
//! - [`resources`] - Per-resource operations
//! - [`models`] - Typed views of common records
//! - [`sleeper`] - Injectable waiting
//!
//! ## Example
//!
//! ```ignore
//! use sluice::config::Config;
//! use sluice::client::ApiClient;
//! use sluice::resources::{ListParams, ResourceKind};
//!
//! async fn example() -> Result<(), sluice::error::SluiceError> {
//!     let config = Config::new("acme.freshservice.com")?
//!         .with_api_key("abcdef123456")
//!         .with_throttling(true);
//!     let client = ApiClient::new(&config)?;
//!
//!     let urgent = client.resource(ResourceKind::TICKET).filter("priority:4").await?;
//!     println!("{} urgent tickets", urgent.len());
//!
//!     client.resource(ResourceKind::RELEASE).restore("17").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Considerations
//!
//! The credential is stored only in memory and is never logged, never printed
//! by `Debug`, and sanitized from every error body.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod models;
pub mod pagination;
pub mod request;
pub mod resources;
pub mod retry;
pub mod sleeper;
pub mod throttle;

pub use client::ApiClient;
pub use config::{Config, Credential};
pub use error::SluiceError;
