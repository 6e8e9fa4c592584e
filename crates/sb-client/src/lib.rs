//! # saasbridge-client
//!
//! Transport collaborator used by every saasbridge adapter.
//!
//! This crate provides:
//! - The [`Transport`] trait adapters call into (one request, one response)
//! - [`HttpTransport`], a reqwest-backed implementation with retry,
//!   exponential backoff with jitter, and rate limit handling
//! - [`Credentials`] with redacted `Debug` output
//! - Escaping and encoding helpers in [`security`]
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Adapter Layer                          │
//! │  (saasbridge-salesforce, -clickup, -smartsheet, -stripe)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │  HttpRequest
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Transport trait                         │
//! │  - request({method, url, headers, body}) -> HttpResponse    │
//! │  - non-success statuses are responses, not errors           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     HttpTransport                           │
//! │  - reqwest with retry, compression, rate limiting           │
//! │  - bearer auth from Credentials                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use saasbridge_client::{Credentials, HttpRequest, HttpTransport, Transport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), saasbridge_client::Error> {
//!     let creds = Credentials::new("https://myorg.my.salesforce.com")
//!         .with_access_token("00D...");
//!     let transport = HttpTransport::new(&creds)?;
//!
//!     let response = transport
//!         .request(HttpRequest::get(format!(
//!             "{}/services/data/v59.0/limits",
//!             creds.base_url().unwrap_or_default()
//!         )))
//!         .await?;
//!     println!("{} {}", response.code, response.status);
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod request;
mod response;
mod retry;
pub mod security;

pub use client::{HttpTransport, Transport};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use credentials::Credentials;
pub use error::{Error, ErrorKind, Result};
pub use request::{HttpRequest, RequestBody, RequestMethod};
pub use response::HttpResponse;
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy, DEFAULT_RETRY_STATUSES};

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("saasbridge/", env!("CARGO_PKG_VERSION"));
