//! Value coercion between external and internal records.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::dialect::{Dialect, TimestampFormat};
use crate::mapping::FieldMappingTable;
use crate::metadata::{
    CollectionMetadata, FieldMetadata, FieldType, MetadataProvider, CREATED_AT_FIELD, ID_FIELD,
    UPDATED_AT_FIELD,
};
use crate::path::{get_path, set_path};
use crate::record::{unwrap_reference, Record};

/// Maximum nesting followed through reference fields and field trees.
pub const MAX_DEPTH: usize = 8;

/// Converts records in both directions for one dialect.
pub struct Coercer<'a, P: MetadataProvider + ?Sized> {
    metadata: &'a P,
    dialect: &'a Dialect,
}

impl<'a, P: MetadataProvider + ?Sized> Coercer<'a, P> {
    pub fn new(metadata: &'a P, dialect: &'a Dialect) -> Self {
        Self { metadata, dialect }
    }

    /// External record to internal record for `collection`.
    ///
    /// Envelope and unmapped external fields are dropped. Nested
    /// relationship objects are coerced against the referenced collection.
    pub fn to_internal(&self, record: &Record, collection: &CollectionMetadata) -> Record {
        let table = FieldMappingTable::build(collection, self.dialect);
        self.to_internal_with(record, collection, &table, 0)
    }

    /// Like [`to_internal`](Self::to_internal) with a caller-built table.
    pub fn to_internal_with_table(
        &self,
        record: &Record,
        collection: &CollectionMetadata,
        table: &FieldMappingTable,
    ) -> Record {
        self.to_internal_with(record, collection, table, 0)
    }

    fn to_internal_with(
        &self,
        record: &Record,
        collection: &CollectionMetadata,
        table: &FieldMappingTable,
        depth: usize,
    ) -> Record {
        let mut out = Record::new();
        for (external, value) in record {
            if self.dialect.is_envelope(external) {
                continue;
            }
            let Some(internal) = table.internal(external) else {
                if let Some(mapping) = table.path_for_external(external) {
                    let slot = out
                        .entry(mapping.field.clone())
                        .or_insert_with(|| Value::Object(Map::new()));
                    if !slot.is_object() {
                        *slot = Value::Object(Map::new());
                    }
                    if let Value::Object(map) = slot {
                        set_path(map, &mapping.path, value.clone());
                    }
                }
                continue;
            };

            let coerced = if value.is_null() {
                Value::Null
            } else {
                match field_type(collection, internal) {
                    Some(FieldType::Timestamp) => parse_timestamp(value, self.dialect.timestamps),
                    Some(FieldType::Reference) => {
                        let field = collection.field(internal);
                        self.reference_in(external, value, field, record, depth)
                    }
                    _ => value.clone(),
                }
            };
            out.insert(internal.to_string(), coerced);
        }
        out
    }

    fn reference_in(
        &self,
        external: &str,
        value: &Value,
        field: Option<&FieldMetadata>,
        record: &Record,
        depth: usize,
    ) -> Value {
        let mut nested = Record::new();
        // Some APIs embed the referenced object in place of its id.
        let embedded = value.as_object();
        let related = embedded.or_else(|| {
            self.dialect
                .relationship_name(external)
                .and_then(|name| record.get(&name))
                .and_then(Value::as_object)
        });

        if let Some(related) = related {
            if depth + 1 >= MAX_DEPTH {
                warn!(field = external, depth, "Reference nesting limit reached, not expanding");
            } else {
                let fallback = CollectionMetadata::default();
                let target = field
                    .and_then(FieldMetadata::reference_collection)
                    .and_then(|key| self.metadata.collection(key))
                    .unwrap_or(&fallback);
                let table = FieldMappingTable::build(target, self.dialect);
                nested = self.to_internal_with(related, target, &table, depth + 1);
            }
        }

        let id = match embedded {
            Some(object) => object
                .get(&self.dialect.primary_key)
                .cloned()
                .unwrap_or(Value::Null),
            None => value.clone(),
        };
        nested.insert(ID_FIELD.to_string(), id);
        Value::Object(nested)
    }

    /// Internal record to external record for `collection`.
    ///
    /// The primary key is never written. Fields the platform marks as not
    /// createable (insert) or not updateable (update) are dropped, as are
    /// fields without metadata.
    pub fn to_external(&self, record: &Record, collection: &CollectionMetadata, is_update: bool) -> Record {
        let table = FieldMappingTable::build(collection, self.dialect);
        self.to_external_with_table(record, collection, &table, is_update)
    }

    /// Like [`to_external`](Self::to_external) with a caller-built table.
    pub fn to_external_with_table(
        &self,
        record: &Record,
        collection: &CollectionMetadata,
        table: &FieldMappingTable,
        is_update: bool,
    ) -> Record {
        let mut out = Record::new();
        for (internal, value) in record {
            if internal == ID_FIELD {
                continue;
            }
            let Some(field) = collection.field(internal) else {
                continue;
            };
            if (is_update && !field.updateable) || (!is_update && !field.createable) {
                continue;
            }

            if table.has_paths(internal) {
                for mapping in table.paths_for(internal) {
                    if let Some(nested) = get_path(value, &mapping.path) {
                        out.insert(mapping.external.clone(), nested.clone());
                    }
                }
                continue;
            }

            let Some(external) = table.external(internal) else {
                continue;
            };
            if external == self.dialect.primary_key {
                continue;
            }

            let coerced = if value.is_null() {
                Value::Null
            } else {
                match field.field_type {
                    FieldType::Timestamp => format_timestamp(value, self.dialect.timestamps),
                    FieldType::Reference => unwrap_reference(value),
                    _ => value.clone(),
                }
            };
            out.insert(external.to_string(), coerced);
        }
        out
    }
}

fn field_type(collection: &CollectionMetadata, internal: &str) -> Option<FieldType> {
    match collection.field(internal) {
        Some(field) => Some(field.field_type.clone()),
        None if internal == CREATED_AT_FIELD || internal == UPDATED_AT_FIELD => {
            Some(FieldType::Timestamp)
        }
        None => None,
    }
}

/// External timestamp to epoch seconds; unparseable values become null.
pub fn parse_timestamp(value: &Value, format: TimestampFormat) -> Value {
    let millis = match (value, format) {
        (Value::String(s), TimestampFormat::Iso8601) => parse_iso(s).map(|d| d.timestamp_millis()),
        (Value::String(s), TimestampFormat::EpochMillis) => s
            .trim()
            .parse::<f64>()
            .ok()
            .map(|ms| ms.round() as i64)
            .or_else(|| parse_iso(s).map(|d| d.timestamp_millis())),
        (Value::Number(n), TimestampFormat::EpochMillis) => n.as_f64().map(|ms| ms.round() as i64),
        (Value::Number(_), TimestampFormat::Iso8601) => return value.clone(),
        _ => None,
    };
    match millis {
        Some(ms) => epoch_seconds(ms),
        None => Value::Null,
    }
}

/// Epoch seconds to the external timestamp encoding.
pub fn format_timestamp(value: &Value, format: TimestampFormat) -> Value {
    match value {
        Value::Number(n) => {
            let Some(secs) = n.as_f64() else {
                return Value::Null;
            };
            let millis = (secs * 1000.0).round() as i64;
            match format {
                TimestampFormat::Iso8601 => DateTime::<Utc>::from_timestamp_millis(millis)
                    .map(|d| Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true)))
                    .unwrap_or(Value::Null),
                TimestampFormat::EpochMillis => json!(millis),
            }
        }
        Value::String(_) => value.clone(),
        _ => Value::Null,
    }
}

fn epoch_seconds(millis: i64) -> Value {
    if millis % 1000 == 0 {
        json!(millis / 1000)
    } else {
        json!(millis as f64 / 1000.0)
    }
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|n| n.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|n| n.and_utc())
        })
}
