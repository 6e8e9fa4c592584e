//! # saasbridge-core
//!
//! The platform side of every saasbridge adapter: the record, metadata and
//! condition model, and the engine that translates between platform
//! records and external API shapes.
//!
//! This crate provides:
//! - Collection and field metadata ([`CollectionMetadata`], [`MetadataProvider`])
//! - The bidirectional [`FieldMappingTable`], seeded per [`Dialect`]
//! - Value coercion in both directions ([`Coercer`])
//! - The condition tree ([`Condition`]) and a client-side [`predicate`]
//! - Field request flattening ([`FieldFlattener`])
//! - Lookahead pagination ([`Page`])
//! - Composite write batching ([`CompositeBatch`], [`CompositeResults`])
//! - Load, save and action requests with their sinks
//!
//! ## Flow
//!
//! ```text
//! LoadRequest ──▶ FieldMappingTable ──▶ compiler + FieldFlattener ──▶ Transport
//!                                                                        │
//! LoadSink ◀── Page::assemble ◀── Coercer::to_internal ◀─────────────────┘
//!
//! SaveRequest ──▶ Coercer::to_external ──▶ CompositeBatch ──▶ Transport
//!                                                                │
//! ChangeOperation ◀── CompositeResults::apply ◀──────────────────┘
//! ```
//!
//! Everything here is request-scoped and synchronous; the only suspension
//! points are the adapters' calls into the [`Transport`](saasbridge_client::Transport).

mod coerce;
mod composite;
mod condition;
mod dialect;
mod error;
mod field_request;
mod mapping;
mod metadata;
mod pagination;
pub mod path;
pub mod predicate;
mod record;
mod request;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use coerce::{format_timestamp, parse_timestamp, Coercer, MAX_DEPTH};
pub use composite::{
    sanitize_reference_id, CompositeBatch, CompositeRequest, CompositeResponse, CompositeResults,
    CompositeSubrequest, CompositeSubresponse, RefKind,
};
pub use condition::{
    active, find_field_condition, Condition, ConditionKind, Conjunction, FieldCondition,
    GroupCondition, Operator, SearchCondition, SubqueryCondition,
};
pub use dialect::{Dialect, RelationshipRule, TimestampFormat};
pub use error::{Error, ErrorKind, Result};
pub use field_request::{FieldFlattener, FieldRequest};
pub use mapping::{FieldMappingTable, PathMapping};
pub use metadata::{
    CollectionMetadata, FieldMetadata, FieldType, MetadataProvider, MetadataSet, MetadataView,
    ReferenceMetadata, CREATED_AT_FIELD, ID_FIELD, UNIQUE_KEY_FIELD, UPDATED_AT_FIELD,
};
pub use pagination::Page;
pub use record::{record, unwrap_reference, value_to_id, Record};
pub use request::{
    ActionRequest, ActionResult, ActionSink, ChangeOperation, LoadOrder, LoadRequest, LoadResult,
    LoadSink, SaveRequest,
};
