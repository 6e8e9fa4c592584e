//! # saasbridge-clickup
//!
//! ClickUp folders and tasks as platform collections.
//!
//! ClickUp has no query language. Task loads push what they can into REST
//! query parameters (see [`RestFilterCompiler`]) and route the list
//! reference into the resource path; everything else is filtered
//! client-side after coercion. Folder saves issue one REST call per
//! operation.

mod adapter;
mod filter;

pub use adapter::{clickup_dialect, ClickUpAdapter, SPACE_ID_CREDENTIAL};
pub use filter::{RestFilter, RestFilterCompiler};

pub use saasbridge_core::{Error, ErrorKind, Result};
