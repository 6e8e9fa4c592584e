//! Load, save and run-action requests and the sinks results flow into.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::condition::Condition;
use crate::field_request::FieldRequest;
use crate::metadata::{CollectionMetadata, MetadataSet, MetadataView};
use crate::record::Record;

/// Sort key for a load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadOrder {
    pub field: String,
    #[serde(default)]
    pub desc: bool,
}

/// A read of one collection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub collection: String,
    pub collection_metadata: CollectionMetadata,
    /// Metadata of collections reachable through reference fields.
    #[serde(default)]
    pub related_metadata: MetadataSet,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub fields: Vec<FieldRequest>,
    #[serde(default)]
    pub order: Vec<LoadOrder>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub batch_number: usize,
}

impl LoadRequest {
    pub fn new(collection_metadata: CollectionMetadata) -> Self {
        Self {
            collection: collection_metadata.key(),
            collection_metadata,
            related_metadata: MetadataSet::default(),
            conditions: Vec::new(),
            fields: Vec::new(),
            order: Vec::new(),
            batch_size: None,
            batch_number: 0,
        }
    }

    pub fn with_related(mut self, collection: CollectionMetadata) -> Self {
        self.related_metadata.insert(collection);
        self
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn with_fields(mut self, fields: Vec<FieldRequest>) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_order(mut self, field: impl Into<String>, desc: bool) -> Self {
        self.order.push(LoadOrder {
            field: field.into(),
            desc,
        });
        self
    }

    pub fn with_batch(mut self, batch_size: usize, batch_number: usize) -> Self {
        self.batch_size = Some(batch_size);
        self.batch_number = batch_number;
        self
    }

    /// Metadata lookup over this collection and its related collections.
    pub fn metadata(&self) -> MetadataView<'_> {
        MetadataView {
            primary: &self.collection_metadata,
            related: &self.related_metadata,
        }
    }
}

/// Receives the output of a load.
pub trait LoadSink {
    fn add_record(&mut self, record: Record);
    fn set_has_more_records(&mut self);
    fn add_error(&mut self, message: String);
}

/// In-memory [`LoadSink`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadResult {
    pub records: Vec<Record>,
    pub has_more_records: bool,
    pub errors: Vec<String>,
}

impl LoadSink for LoadResult {
    fn add_record(&mut self, record: Record) {
        self.records.push(record);
    }

    fn set_has_more_records(&mut self) {
        self.has_more_records = true;
    }

    fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }
}

/// One insert, update or delete within a save.
///
/// `id` is the caller's correlation id: the record id for updates and
/// deletes, a temporary id for inserts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeOperation {
    id: String,
    record: Record,
    errors: Vec<String>,
}

impl ChangeOperation {
    pub fn new(id: impl Into<String>, record: Record) -> Self {
        Self {
            id: id.into(),
            record,
            errors: Vec::new(),
        }
    }

    /// A delete carries only its id.
    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(id, Record::new())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// All fields supplied for this operation.
    pub fn all(&self) -> &Record {
        &self.record
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.record.get(field)
    }

    /// Merge `values` onto the record, overwriting existing keys.
    pub fn set_all(&mut self, values: Record) {
        self.record.extend(values);
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// A write of one collection. Operations are mutated in place with
/// per-record errors and post-save values; `errors` holds request-level
/// failures.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub collection: String,
    pub collection_metadata: CollectionMetadata,
    pub related_metadata: MetadataSet,
    pub inserts: Vec<ChangeOperation>,
    pub updates: Vec<ChangeOperation>,
    pub deletes: Vec<ChangeOperation>,
    pub errors: Vec<String>,
}

impl SaveRequest {
    pub fn new(collection_metadata: CollectionMetadata) -> Self {
        Self {
            collection: collection_metadata.key(),
            collection_metadata,
            related_metadata: MetadataSet::default(),
            inserts: Vec::new(),
            updates: Vec::new(),
            deletes: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn with_related(mut self, collection: CollectionMetadata) -> Self {
        self.related_metadata.insert(collection);
        self
    }

    pub fn with_insert(mut self, id: impl Into<String>, record: Record) -> Self {
        self.inserts.push(ChangeOperation::new(id, record));
        self
    }

    pub fn with_update(mut self, id: impl Into<String>, record: Record) -> Self {
        self.updates.push(ChangeOperation::new(id, record));
        self
    }

    pub fn with_delete(mut self, id: impl Into<String>) -> Self {
        self.deletes.push(ChangeOperation::delete(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Record a request-level failure.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn metadata(&self) -> MetadataView<'_> {
        MetadataView {
            primary: &self.collection_metadata,
            related: &self.related_metadata,
        }
    }
}

/// A named action invocation with parameters.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionRequest {
    pub action_name: String,
    #[serde(default)]
    pub params: Record,
}

impl ActionRequest {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            params: Record::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// A parameter, treating null as absent.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params.get(name).filter(|v| !v.is_null())
    }

    /// A string parameter.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.param(name).and_then(Value::as_str)
    }
}

/// Receives the output of an action.
pub trait ActionSink {
    fn add_result(&mut self, key: &str, value: Value);
    fn add_error(&mut self, message: String);
}

/// In-memory [`ActionSink`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionResult {
    pub results: Record,
    pub errors: Vec<String>,
}

impl ActionSink for ActionResult {
    fn add_result(&mut self, key: &str, value: Value) {
        self.results.insert(key.to_string(), value);
    }

    fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }
}
