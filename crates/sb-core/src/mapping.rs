//! Bidirectional field-name mapping between platform ids and external names.

use std::collections::BTreeMap;

use crate::dialect::Dialect;
use crate::metadata::CollectionMetadata;
use crate::path::split_path;

/// One MAP/STRUCT fan-out entry: `field` at nested `path` is stored in the
/// external column `external`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub field: String,
    pub path: Vec<String>,
    pub external: String,
}

/// `to_internal` / `to_external` lookup for one collection.
///
/// Built once per invocation; lookups that miss return `None` and callers
/// treat the field as unmapped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMappingTable {
    to_internal: BTreeMap<String, String>,
    to_external: BTreeMap<String, String>,
    paths: Vec<PathMapping>,
}

impl FieldMappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with the dialect defaults, then register every field that
    /// declares an external name (or external paths).
    pub fn build(collection: &CollectionMetadata, dialect: &Dialect) -> Self {
        let mut table = Self::new();
        for (external, internal) in &dialect.defaults {
            table.register(internal, external);
        }
        for (id, field) in &collection.fields {
            if let Some(external) = field.external_name.as_deref() {
                table.register(id, external);
            }
            for (path, external) in &field.external_paths {
                table.register_path(id, path, external);
            }
        }
        table
    }

    /// Map `internal` to `external`. A later registration for the same
    /// external name replaces the earlier one in both directions.
    pub fn register(&mut self, internal: &str, external: &str) {
        if let Some(previous) = self
            .to_internal
            .insert(external.to_string(), internal.to_string())
        {
            if self.to_external.get(&previous).map(String::as_str) == Some(external) {
                self.to_external.remove(&previous);
            }
        }
        self.to_external
            .insert(internal.to_string(), external.to_string());
    }

    /// Map nested `path` of `internal` to the external column `external`.
    pub fn register_path(&mut self, internal: &str, path: &str, external: &str) {
        self.paths.retain(|p| p.external != external);
        self.paths.push(PathMapping {
            field: internal.to_string(),
            path: split_path(path),
            external: external.to_string(),
        });
    }

    /// Platform field id for an external name.
    pub fn internal(&self, external: &str) -> Option<&str> {
        self.to_internal.get(external).map(String::as_str)
    }

    /// External name for a platform field id.
    pub fn external(&self, internal: &str) -> Option<&str> {
        self.to_external.get(internal).map(String::as_str)
    }

    /// Fan-out entries of a MAP/STRUCT field.
    pub fn paths_for<'a>(&'a self, internal: &'a str) -> impl Iterator<Item = &'a PathMapping> + 'a {
        self.paths.iter().filter(move |p| p.field == internal)
    }

    /// Fan-out entry stored in the given external column.
    pub fn path_for_external(&self, external: &str) -> Option<&PathMapping> {
        self.paths.iter().find(|p| p.external == external)
    }

    pub fn has_paths(&self, internal: &str) -> bool {
        self.paths.iter().any(|p| p.field == internal)
    }
}
