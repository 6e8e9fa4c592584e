//! Requested field trees and their flattening into external field lists.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::coerce::MAX_DEPTH;
use crate::dialect::Dialect;
use crate::mapping::FieldMappingTable;
use crate::metadata::{CollectionMetadata, MetadataProvider};

/// A requested field, optionally with children for reference/struct fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldRequest>,
}

impl FieldRequest {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    pub fn with_children(id: impl Into<String>, fields: Vec<FieldRequest>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Flattens requested field trees into external (prefixed) field names.
pub struct FieldFlattener<'a, P: MetadataProvider + ?Sized> {
    metadata: &'a P,
    dialect: &'a Dialect,
}

impl<'a, P: MetadataProvider + ?Sized> FieldFlattener<'a, P> {
    pub fn new(metadata: &'a P, dialect: &'a Dialect) -> Self {
        Self { metadata, dialect }
    }

    /// External field list for `requested`: the primary key first, then the
    /// requested fields in request order without duplicates. No fields
    /// requested yields the primary key plus the display field.
    pub fn flatten(&self, requested: &[FieldRequest], collection: &CollectionMetadata) -> Vec<String> {
        let mut out = vec![self.dialect.primary_key.clone()];
        if requested.is_empty() {
            if let Some(display) = &self.dialect.display_field {
                out.push(display.clone());
            }
            return out;
        }

        self.walk(requested, collection, "", 0, &mut out);
        out
    }

    fn walk(
        &self,
        nodes: &[FieldRequest],
        collection: &CollectionMetadata,
        prefix: &str,
        depth: usize,
        out: &mut Vec<String>,
    ) {
        if depth >= MAX_DEPTH {
            warn!(prefix, depth, "Field request nesting limit reached, truncating");
            return;
        }
        let table = FieldMappingTable::build(collection, self.dialect);

        for node in nodes {
            let field = collection.field(&node.id);
            let external = field
                .and_then(|f| f.external_name.as_deref())
                .filter(|name| !name.is_empty())
                .or_else(|| table.external(&node.id))
                .filter(|name| !name.is_empty());
            let Some(external) = external else {
                continue;
            };
            push_unique(out, format!("{prefix}{external}"));

            if node.fields.is_empty() {
                continue;
            }
            let target = field
                .and_then(|f| f.reference_collection())
                .and_then(|key| self.metadata.collection(key));
            let relationship = self.dialect.relationship_name(external);

            match (target, relationship) {
                (Some(target), Some(relationship)) => {
                    let child_prefix = format!("{prefix}{relationship}.");
                    push_unique(out, format!("{child_prefix}{}", self.dialect.primary_key));
                    self.walk(&node.fields, target, &child_prefix, depth + 1, out);
                }
                _ => self.walk(&node.fields, collection, prefix, depth + 1, out),
            }
        }
    }
}

fn push_unique(out: &mut Vec<String>, name: String) {
    if !out.contains(&name) {
        out.push(name);
    }
}
