//! # saasbridge-salesforce
//!
//! Salesforce sObjects as platform collections.
//!
//! - Loads compile the condition tree and requested field tree into one
//!   SOQL query (`/services/data/vXX.X/query/?q=`), fetch one row past the
//!   batch size and coerce results back into platform records.
//! - Saves pack every insert, update and delete into one all-or-none
//!   composite request with follow-up reads, then attach per-record
//!   outcomes by reference id.
//!
//! ## Example
//!
//! ```rust,ignore
//! use saasbridge_client::{Credentials, HttpTransport};
//! use saasbridge_core::{Condition, LoadRequest, LoadResult};
//! use saasbridge_salesforce::SalesforceAdapter;
//!
//! let creds = Credentials::new(instance_url).with_access_token(token);
//! let adapter = SalesforceAdapter::new(HttpTransport::new(&creds)?, creds);
//!
//! let request = LoadRequest::new(account_metadata)
//!     .with_condition(Condition::eq("luigi/foo.type", "Customer".into()))
//!     .with_batch(50, 0);
//! let mut result = LoadResult::default();
//! adapter.load(&request, &mut result).await?;
//! ```

mod adapter;
mod soql;

pub use adapter::{
    salesforce_dialect, SalesforceAdapter, DEFAULT_API_VERSION, DEFAULT_BATCH_SIZE,
};
pub use soql::{ConditionCompiler, SoqlQuery};

pub use saasbridge_core::{Error, ErrorKind, Result};
