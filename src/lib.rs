//! # saasbridge
//!
//! Collection adapters that expose SaaS APIs as platform-native data
//! sources.
//!
//! Each integration translates platform load, save and action requests
//! into calls against one external API and translates the responses back
//! into platform records:
//!
//! - Field names are mapped both ways through a per-collection mapping
//!   table, and values are coerced (timestamps, references, MAP fields).
//! - Condition trees become SOQL `WHERE` clauses, REST filter parameters
//!   or client-side predicates, depending on what the API supports.
//! - Pages are fetched with one row of lookahead so "more records" is
//!   known without a count query.
//! - Salesforce writes go out as one all-or-none composite request with
//!   follow-up reads.
//!
//! ## Security
//!
//! - Credentials are redacted in `Debug` output and never logged
//! - SOQL literals are escaped and identifiers validated before use
//! - Path segments and query values are percent-encoded
//! - Error messages taken from responses are sanitized
//!
//! ## Crates
//!
//! - **saasbridge-client** - HTTP transport with retry, credentials, URL and SOQL escaping
//! - **saasbridge-core** - Records, metadata, conditions, coercion, pagination, composite batching
//! - **saasbridge-salesforce** - SOQL loads and composite saves
//! - **saasbridge-clickup** - REST filter loads for tasks and folders, folder saves
//! - **saasbridge-smartsheet** - Sheets and rows loads, mapped row saves
//! - **saasbridge-stripe** - Checkout, customer, payment intent and subscription actions
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use saasbridge::client::{Credentials, HttpTransport};
//! use saasbridge::core::{Condition, LoadRequest, LoadResult};
//! use saasbridge::salesforce::SalesforceAdapter;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let creds = Credentials::new("https://myorg.my.salesforce.com")
//!         .with_access_token(std::env::var("SF_ACCESS_TOKEN")?);
//!     let adapter = SalesforceAdapter::new(HttpTransport::new(&creds)?, creds);
//!
//!     let request = LoadRequest::new(account_metadata())
//!         .with_condition(Condition::eq("acme/crm.type", "Customer".into()))
//!         .with_batch(50, 0);
//!     let mut result = LoadResult::default();
//!     adapter.load(&request, &mut result).await?;
//!
//!     for record in &result.records {
//!         println!("{}", record["acme/crm.name"]);
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

// Re-export all crates for convenient access
pub use saasbridge_client as client;
pub use saasbridge_core as core;

#[cfg(feature = "clickup")]
#[cfg_attr(docsrs, doc(cfg(feature = "clickup")))]
pub use saasbridge_clickup as clickup;
#[cfg(feature = "salesforce")]
#[cfg_attr(docsrs, doc(cfg(feature = "salesforce")))]
pub use saasbridge_salesforce as salesforce;
#[cfg(feature = "smartsheet")]
#[cfg_attr(docsrs, doc(cfg(feature = "smartsheet")))]
pub use saasbridge_smartsheet as smartsheet;
#[cfg(feature = "stripe")]
#[cfg_attr(docsrs, doc(cfg(feature = "stripe")))]
pub use saasbridge_stripe as stripe;

// Re-export commonly used types at the top level
pub use saasbridge_client::{ClientConfig, Credentials, HttpTransport, Transport};
pub use saasbridge_core::{
    ActionRequest, ActionResult, Condition, Error, ErrorKind, LoadRequest, LoadResult, Result,
    SaveRequest,
};
