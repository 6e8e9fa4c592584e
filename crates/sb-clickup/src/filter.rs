//! Condition pushdown into REST query parameters.
//!
//! ClickUp filters with plain query parameters: `field=value` for equality,
//! `field_gt` / `field_lt` for ranges and repeated `field[]` for
//! membership. One reserved field is routed into the resource path
//! instead. Anything that cannot be expressed this way is returned as a
//! residual condition for client-side evaluation.

use serde_json::Value;

use saasbridge_core::{
    active, format_timestamp, unwrap_reference, value_to_id, CollectionMetadata, Condition,
    ConditionKind, FieldCondition, FieldMappingTable, FieldType, Operator, TimestampFormat,
};

/// Outcome of compiling a condition list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestFilter {
    /// Value of the path-routed field, when an equality on it was present.
    pub path_id: Option<String>,
    /// Query parameters, in condition order.
    pub params: Vec<(String, String)>,
    /// Conditions left for client-side evaluation.
    pub residual: Vec<Condition>,
}

pub struct RestFilterCompiler<'a> {
    collection: &'a CollectionMetadata,
    table: &'a FieldMappingTable,
    path_field: Option<&'a str>,
    timestamps: TimestampFormat,
}

impl<'a> RestFilterCompiler<'a> {
    pub fn new(collection: &'a CollectionMetadata, table: &'a FieldMappingTable) -> Self {
        Self {
            collection,
            table,
            path_field: None,
            timestamps: TimestampFormat::EpochMillis,
        }
    }

    /// Route equality on `field` into the resource path.
    pub fn with_path_field(mut self, field: &'a str) -> Self {
        self.path_field = Some(field);
        self
    }

    pub fn with_timestamps(mut self, format: TimestampFormat) -> Self {
        self.timestamps = format;
        self
    }

    pub fn compile(&self, conditions: &[Condition]) -> RestFilter {
        let mut filter = RestFilter::default();
        for condition in active(conditions) {
            let pushed = match &condition.kind {
                ConditionKind::FieldValue(fc) => self.push(fc, &mut filter),
                _ => false,
            };
            if !pushed {
                filter.residual.push(condition.clone());
            }
        }
        filter
    }

    fn push(&self, fc: &FieldCondition, filter: &mut RestFilter) -> bool {
        if self.path_field == Some(fc.field.as_str()) {
            if fc.operator != Operator::Eq || filter.path_id.is_some() {
                return false;
            }
            filter.path_id = value_to_id(&fc.value);
            return filter.path_id.is_some();
        }

        let Some(external) = self.table.external(&fc.field) else {
            return false;
        };
        let mut params = Vec::new();
        match fc.operator {
            Operator::Eq => match self.param_value(&fc.field, &fc.value) {
                Some(value) => params.push((external.to_string(), value)),
                None => return false,
            },
            Operator::Gt | Operator::Lt | Operator::Gte | Operator::Lte => {
                let Some(value) = self.param_value(&fc.field, &fc.value) else {
                    return false;
                };
                let (suffix, value) = match fc.operator {
                    Operator::Gt => ("_gt", value),
                    Operator::Lt => ("_lt", value),
                    // Exclusive bounds widened by one unit keep inclusive semantics.
                    Operator::Gte => match value.parse::<i64>() {
                        Ok(n) => ("_gt", (n - 1).to_string()),
                        Err(_) => return false,
                    },
                    _ => match value.parse::<i64>() {
                        Ok(n) => ("_lt", (n + 1).to_string()),
                        Err(_) => return false,
                    },
                };
                params.push((format!("{}{}", external, suffix), value));
            }
            Operator::In if !fc.values.is_empty() => {
                for value in &fc.values {
                    match self.param_value(&fc.field, value) {
                        Some(value) => params.push((format!("{}[]", external), value)),
                        None => return false,
                    }
                }
            }
            _ => return false,
        }
        filter.params.extend(params);
        true
    }

    fn param_value(&self, field: &str, value: &Value) -> Option<String> {
        let value = unwrap_reference(value);
        let is_timestamp = self
            .collection
            .field(field)
            .is_some_and(|f| f.field_type == FieldType::Timestamp);
        let value = if is_timestamp {
            format_timestamp(&value, self.timestamps)
        } else {
            value
        };
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}
