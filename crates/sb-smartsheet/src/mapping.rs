//! Sheet mapping records.
//!
//! A mapping record ties a platform collection to a sheet and says which
//! column stores each field. MAP fields are spread over several columns,
//! one per nested path (`address->city`).

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value;

use saasbridge_core::{value_to_id, FieldMappingTable, Record, Result};

/// Field of a mapping record holding the sheet reference.
pub const MAPPING_SHEET_FIELD: &str = "uesio/smartsheet.sheet";

/// Field of a mapping record holding the field to column map.
pub const MAPPING_FIELDS_FIELD: &str = "uesio/smartsheet.fields";

/// Where one platform field is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnMapping {
    Column(String),
    /// Nested path to column id.
    Paths(BTreeMap<String, String>),
}

/// Resolved mapping between a collection and a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMapping {
    pub sheet_id: String,
    pub fields: BTreeMap<String, ColumnMapping>,
}

impl SheetMapping {
    pub fn new(sheet_id: impl Into<String>) -> Self {
        Self {
            sheet_id: sheet_id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_column(mut self, field: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields
            .insert(field.into(), ColumnMapping::Column(column.into()));
        self
    }

    pub fn with_paths<P, C>(mut self, field: impl Into<String>, paths: impl IntoIterator<Item = (P, C)>) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        let paths = paths
            .into_iter()
            .map(|(path, column)| (path.into(), column.into()))
            .collect();
        self.fields.insert(field.into(), ColumnMapping::Paths(paths));
        self
    }

    /// Parse a mapping record as stored on the platform:
    ///
    /// ```json
    /// {
    ///   "uesio/smartsheet.sheet": {"uesio/core.id": "4583173393803140"},
    ///   "uesio/smartsheet.fields": {
    ///     "acme/crm.name": "7960873114331012",
    ///     "acme/crm.address": {"street": "1234", "city": "5678"}
    ///   }
    /// }
    /// ```
    ///
    /// Returns `None` without a sheet reference. Entries that are neither a
    /// column id nor a path map are skipped.
    pub fn from_record(record: &Record) -> Option<Self> {
        let sheet_id = record.get(MAPPING_SHEET_FIELD).and_then(value_to_id)?;
        let mut mapping = Self::new(sheet_id);
        let Some(fields) = record.get(MAPPING_FIELDS_FIELD).and_then(Value::as_object) else {
            return Some(mapping);
        };
        for (field, entry) in fields {
            let column = match entry {
                Value::Object(paths) => ColumnMapping::Paths(
                    paths
                        .iter()
                        .filter_map(|(path, column)| Some((path.clone(), value_to_id(column)?)))
                        .collect(),
                ),
                other => match value_to_id(other) {
                    Some(column) => ColumnMapping::Column(column),
                    None => continue,
                },
            };
            mapping.fields.insert(field.clone(), column);
        }
        Some(mapping)
    }

    /// Field id to column id lookup, with MAP paths as path mappings.
    pub fn table(&self) -> FieldMappingTable {
        let mut table = FieldMappingTable::new();
        for (field, column) in &self.fields {
            match column {
                ColumnMapping::Column(column) => table.register(field, column),
                ColumnMapping::Paths(paths) => {
                    for (path, column) in paths {
                        table.register_path(field, path, column);
                    }
                }
            }
        }
        table
    }
}

/// Finds the mapping record of a collection.
pub trait MappingLookup: Send + Sync {
    fn find_mapping(&self, collection: &str) -> impl Future<Output = Result<Option<SheetMapping>>> + Send;
}

/// In-memory [`MappingLookup`] keyed by collection key.
#[derive(Debug, Clone, Default)]
pub struct MappingSet {
    mappings: BTreeMap<String, SheetMapping>,
}

impl MappingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: impl Into<String>, mapping: SheetMapping) -> Self {
        self.mappings.insert(collection.into(), mapping);
        self
    }
}

impl MappingLookup for MappingSet {
    fn find_mapping(&self, collection: &str) -> impl Future<Output = Result<Option<SheetMapping>>> + Send {
        let found = self.mappings.get(collection).cloned();
        async move { Ok(found) }
    }
}

impl<M: MappingLookup> MappingLookup for &M {
    fn find_mapping(&self, collection: &str) -> impl Future<Output = Result<Option<SheetMapping>>> + Send {
        (**self).find_mapping(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saasbridge_core::ID_FIELD;
    use serde_json::json;

    #[test]
    fn test_from_record() {
        let record = json!({
            MAPPING_SHEET_FIELD: {ID_FIELD: "4583173393803140"},
            MAPPING_FIELDS_FIELD: {
                "acme/crm.name": "7960873114331012",
                "acme/crm.rank": 42,
                "acme/crm.address": {"street": "1234", "city": 5678},
                "acme/crm.junk": true
            }
        });
        let mapping = SheetMapping::from_record(record.as_object().unwrap()).unwrap();
        assert_eq!(mapping.sheet_id, "4583173393803140");
        assert_eq!(
            mapping.fields.get("acme/crm.name"),
            Some(&ColumnMapping::Column("7960873114331012".to_string()))
        );
        assert_eq!(
            mapping.fields.get("acme/crm.rank"),
            Some(&ColumnMapping::Column("42".to_string()))
        );
        assert_eq!(
            mapping.fields.get("acme/crm.address"),
            Some(&ColumnMapping::Paths(BTreeMap::from([
                ("city".to_string(), "5678".to_string()),
                ("street".to_string(), "1234".to_string()),
            ])))
        );
        assert!(!mapping.fields.contains_key("acme/crm.junk"));
    }

    #[test]
    fn test_from_record_requires_sheet() {
        let record = json!({MAPPING_FIELDS_FIELD: {"acme/crm.name": "1"}});
        assert!(SheetMapping::from_record(record.as_object().unwrap()).is_none());
    }

    #[test]
    fn test_table_registers_columns_and_paths() {
        let table = SheetMapping::new("1")
            .with_column("acme/crm.name", "c1")
            .with_paths("acme/crm.address", [("geo->lat", "c2")])
            .table();
        assert_eq!(table.internal("c1"), Some("acme/crm.name"));
        assert!(table.has_paths("acme/crm.address"));
        let path = table.path_for_external("c2").unwrap();
        assert_eq!(path.path, vec!["geo".to_string(), "lat".to_string()]);
    }

    #[tokio::test]
    async fn test_mapping_set_lookup() {
        let set = MappingSet::new().with("acme/crm.lead", SheetMapping::new("9"));
        assert_eq!(set.find_mapping("acme/crm.lead").await.unwrap().unwrap().sheet_id, "9");
        assert!(set.find_mapping("acme/crm.other").await.unwrap().is_none());
    }
}
