//! Collection and field metadata supplied by the platform.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Platform primary key field.
pub const ID_FIELD: &str = "uesio/core.id";
/// Platform display name / unique key field.
pub const UNIQUE_KEY_FIELD: &str = "uesio/core.uniquekey";
/// Platform creation timestamp field.
pub const CREATED_AT_FIELD: &str = "uesio/core.createdat";
/// Platform last-modified timestamp field.
pub const UPDATED_AT_FIELD: &str = "uesio/core.updatedat";

/// Platform field type.
///
/// Types the adapters do not treat specially are kept verbatim in
/// [`FieldType::Other`] and their values pass through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Checkbox,
    Timestamp,
    Reference,
    Map,
    Struct,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Text => "TEXT",
            FieldType::Number => "NUMBER",
            FieldType::Checkbox => "CHECKBOX",
            FieldType::Timestamp => "TIMESTAMP",
            FieldType::Reference => "REFERENCE",
            FieldType::Map => "MAP",
            FieldType::Struct => "STRUCT",
            FieldType::Other(name) => name,
        }
    }

    /// Values of this type are written unquoted in query languages.
    pub fn is_unquoted(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Checkbox)
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "TEXT" => FieldType::Text,
            "NUMBER" => FieldType::Number,
            "CHECKBOX" => FieldType::Checkbox,
            "TIMESTAMP" => FieldType::Timestamp,
            "REFERENCE" => FieldType::Reference,
            "MAP" => FieldType::Map,
            "STRUCT" => FieldType::Struct,
            _ => FieldType::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(value: FieldType) -> Self {
        value.as_str().to_string()
    }
}

/// Target of a REFERENCE field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    pub collection: String,
}

fn default_true() -> bool {
    true
}

/// Metadata for one platform field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    pub namespace: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,
    #[serde(default = "default_true")]
    pub createable: bool,
    #[serde(default = "default_true")]
    pub updateable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceMetadata>,
    /// MAP/STRUCT fan-out: nested path (`a->b` or `a.b`) to external column.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub external_paths: BTreeMap<String, String>,
}

impl FieldMetadata {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            field_type,
            external_name: None,
            createable: true,
            updateable: true,
            reference: None,
            external_paths: BTreeMap::new(),
        }
    }

    /// Fully qualified field id, `namespace.name`.
    pub fn id(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn with_external_name(mut self, external_name: impl Into<String>) -> Self {
        self.external_name = Some(external_name.into());
        self
    }

    pub fn with_reference(mut self, collection: impl Into<String>) -> Self {
        self.field_type = FieldType::Reference;
        self.reference = Some(ReferenceMetadata {
            collection: collection.into(),
        });
        self
    }

    pub fn with_external_path(mut self, path: impl Into<String>, column: impl Into<String>) -> Self {
        self.external_paths.insert(path.into(), column.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.createable = false;
        self.updateable = false;
        self
    }

    pub fn not_updateable(mut self) -> Self {
        self.updateable = false;
        self
    }

    pub fn not_createable(mut self) -> Self {
        self.createable = false;
        self
    }

    /// The referenced collection, for REFERENCE fields.
    pub fn reference_collection(&self) -> Option<&str> {
        match self.field_type {
            FieldType::Reference => self.reference.as_ref().map(|r| r.collection.as_str()),
            _ => None,
        }
    }
}

/// Metadata for one collection, fields keyed by field id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionMetadata {
    pub namespace: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_name: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<String, FieldMetadata>,
}

impl CollectionMetadata {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_external_name(mut self, external_name: impl Into<String>) -> Self {
        self.external_name = Some(external_name.into());
        self
    }

    /// Add a field, keyed by its id.
    pub fn with_field(mut self, field: FieldMetadata) -> Self {
        self.fields.insert(field.id(), field);
        self
    }

    /// Fully qualified collection key, `namespace.name`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    pub fn field(&self, id: &str) -> Option<&FieldMetadata> {
        self.fields.get(id)
    }

    /// External name of a field, if it declares one.
    pub fn external_field_name(&self, id: &str) -> Option<&str> {
        self.field(id)?.external_name.as_deref()
    }

    /// Field id declaring the given external name.
    pub fn field_id_by_external_name(&self, external_name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, f)| f.external_name.as_deref() == Some(external_name))
            .map(|(id, _)| id.as_str())
    }
}

/// Resolves collection metadata by collection key.
pub trait MetadataProvider {
    fn collection(&self, key: &str) -> Option<&CollectionMetadata>;
}

/// Metadata for any number of collections, keyed by collection key.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataSet {
    collections: BTreeMap<String, CollectionMetadata>,
}

impl MetadataSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, collection: CollectionMetadata) -> Self {
        self.insert(collection);
        self
    }

    pub fn insert(&mut self, collection: CollectionMetadata) {
        self.collections.insert(collection.key(), collection);
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}

impl MetadataProvider for MetadataSet {
    fn collection(&self, key: &str) -> Option<&CollectionMetadata> {
        self.collections.get(key)
    }
}

impl MetadataProvider for CollectionMetadata {
    fn collection(&self, key: &str) -> Option<&CollectionMetadata> {
        (self.key() == key).then_some(self)
    }
}

/// A request's own collection plus any related collections.
#[derive(Debug, Clone, Copy)]
pub struct MetadataView<'a> {
    pub primary: &'a CollectionMetadata,
    pub related: &'a MetadataSet,
}

impl MetadataProvider for MetadataView<'_> {
    fn collection(&self, key: &str) -> Option<&CollectionMetadata> {
        if self.primary.key() == key {
            Some(self.primary)
        } else {
            self.related.collection(key)
        }
    }
}
