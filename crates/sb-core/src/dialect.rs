//! Per-integration conventions that the shared engine is parameterized by.

/// How an external system encodes timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampFormat {
    /// ISO-8601 strings (`2024-01-15T10:30:00.000+0000`).
    Iso8601,
    /// Epoch milliseconds, as a number or a numeric string.
    EpochMillis,
}

/// How the nested relationship object of a reference field is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipRule {
    /// `Job__c` becomes `Job__r`; otherwise the trailing two characters are
    /// dropped (`AccountId` becomes `Account`).
    CustomSuffix,
    /// References carry no nested object.
    None,
}

impl RelationshipRule {
    /// Relationship name for the given external reference field name.
    pub fn relationship_name(&self, external_name: &str) -> Option<String> {
        match self {
            RelationshipRule::CustomSuffix => {
                if let Some(idx) = external_name.find("__c") {
                    Some(format!("{}__r", &external_name[..idx]))
                } else {
                    let cut = external_name
                        .char_indices()
                        .rev()
                        .nth(1)
                        .map(|(i, _)| i)
                        .unwrap_or(0);
                    Some(external_name[..cut].to_string())
                }
            }
            RelationshipRule::None => None,
        }
    }
}

/// Naming and encoding conventions of one external system.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialect {
    /// External name of the primary key.
    pub primary_key: String,
    /// External name of the display field requested when no fields are.
    pub display_field: Option<String>,
    /// Hardcoded `(external, internal)` mappings, overridden by metadata.
    pub defaults: Vec<(String, String)>,
    /// Synthetic envelope fields skipped on read.
    pub envelope_fields: Vec<String>,
    pub relationship: RelationshipRule,
    pub timestamps: TimestampFormat,
}

impl Dialect {
    /// A dialect whose primary key maps to the platform id field.
    pub fn new(primary_key: impl Into<String>) -> Self {
        let primary_key = primary_key.into();
        Self {
            defaults: vec![(primary_key.clone(), crate::ID_FIELD.to_string())],
            primary_key,
            display_field: None,
            envelope_fields: Vec::new(),
            relationship: RelationshipRule::None,
            timestamps: TimestampFormat::Iso8601,
        }
    }

    pub fn with_default(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.defaults.push((external.into(), internal.into()));
        self
    }

    pub fn with_display_field(mut self, external: impl Into<String>) -> Self {
        self.display_field = Some(external.into());
        self
    }

    pub fn with_envelope_field(mut self, external: impl Into<String>) -> Self {
        self.envelope_fields.push(external.into());
        self
    }

    pub fn with_relationship(mut self, rule: RelationshipRule) -> Self {
        self.relationship = rule;
        self
    }

    pub fn with_timestamps(mut self, format: TimestampFormat) -> Self {
        self.timestamps = format;
        self
    }

    pub fn is_envelope(&self, external: &str) -> bool {
        self.envelope_fields.iter().any(|f| f == external)
    }

    pub fn relationship_name(&self, external: &str) -> Option<String> {
        self.relationship.relationship_name(external)
    }
}
