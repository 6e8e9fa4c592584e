//! Platform condition tree.
//!
//! Conditions arrive as flat JSON objects discriminated by an optional
//! `type` (`SEARCH`, `GROUP`, `SUBQUERY`; field-value otherwise) and are
//! turned into a typed tree on deserialization.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator. Unknown names deserialize to [`Operator::Eq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    #[default]
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    NotIn,
    IsBlank,
    IsNotBlank,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "EQ",
            Operator::NotEq => "NOT_EQ",
            Operator::Gt => "GT",
            Operator::Gte => "GTE",
            Operator::Lt => "LT",
            Operator::Lte => "LTE",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::IsBlank => "IS_BLANK",
            Operator::IsNotBlank => "IS_NOT_BLANK",
        }
    }

    /// Operators that take `values` instead of `value`.
    pub fn is_multi_value(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

impl From<&str> for Operator {
    fn from(value: &str) -> Self {
        match value {
            "NOT_EQ" => Operator::NotEq,
            "GT" => Operator::Gt,
            "GTE" => Operator::Gte,
            "LT" => Operator::Lt,
            "LTE" => Operator::Lte,
            "IN" => Operator::In,
            "NOT_IN" => Operator::NotIn,
            "IS_BLANK" => Operator::IsBlank,
            "IS_NOT_BLANK" => Operator::IsNotBlank,
            _ => Operator::Eq,
        }
    }
}

impl From<String> for Operator {
    fn from(value: String) -> Self {
        Operator::from(value.as_str())
    }
}

impl From<Operator> for String {
    fn from(value: Operator) -> Self {
        value.as_str().to_string()
    }
}

/// How group children combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// `field operator value|values`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCondition {
    pub field: String,
    pub operator: Operator,
    /// `Null` when no value was supplied.
    pub value: Value,
    pub values: Vec<Value>,
}

/// Children combined with a conjunction.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupCondition {
    pub conjunction: Conjunction,
    pub conditions: Vec<Condition>,
}

/// Substring match of `value` against any of `fields`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCondition {
    pub fields: Vec<String>,
    pub value: String,
}

/// `field IN (SELECT subfield FROM subcollection WHERE conditions)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubqueryCondition {
    pub field: String,
    pub subfield: String,
    pub subcollection: String,
    pub conjunction: Conjunction,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConditionKind {
    FieldValue(FieldCondition),
    Group(GroupCondition),
    Search(SearchCondition),
    Subquery(SubqueryCondition),
}

/// One node of the condition tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawCondition")]
pub struct Condition {
    pub kind: ConditionKind,
    pub inactive: bool,
}

impl Condition {
    fn active(kind: ConditionKind) -> Self {
        Self {
            kind,
            inactive: false,
        }
    }

    /// `field op value`.
    pub fn field(field: impl Into<String>, operator: Operator, value: Value) -> Self {
        Self::active(ConditionKind::FieldValue(FieldCondition {
            field: field.into(),
            operator,
            value,
            values: Vec::new(),
        }))
    }

    /// `field = value`.
    pub fn eq(field: impl Into<String>, value: Value) -> Self {
        Self::field(field, Operator::Eq, value)
    }

    /// `field op (values)`, for IN / NOT_IN.
    pub fn values(field: impl Into<String>, operator: Operator, values: Vec<Value>) -> Self {
        Self::active(ConditionKind::FieldValue(FieldCondition {
            field: field.into(),
            operator,
            value: Value::Null,
            values,
        }))
    }

    pub fn group(conjunction: Conjunction, conditions: Vec<Condition>) -> Self {
        Self::active(ConditionKind::Group(GroupCondition {
            conjunction,
            conditions,
        }))
    }

    pub fn search(fields: Vec<String>, value: impl Into<String>) -> Self {
        Self::active(ConditionKind::Search(SearchCondition {
            fields,
            value: value.into(),
        }))
    }

    pub fn subquery(
        field: impl Into<String>,
        subfield: impl Into<String>,
        subcollection: impl Into<String>,
        conditions: Vec<Condition>,
    ) -> Self {
        Self::active(ConditionKind::Subquery(SubqueryCondition {
            field: field.into(),
            subfield: subfield.into(),
            subcollection: subcollection.into(),
            conjunction: Conjunction::And,
            conditions,
        }))
    }

    /// Mark the condition inactive.
    pub fn deactivated(mut self) -> Self {
        self.inactive = true;
        self
    }

    pub fn as_field_value(&self) -> Option<&FieldCondition> {
        match &self.kind {
            ConditionKind::FieldValue(fc) => Some(fc),
            _ => None,
        }
    }
}

/// The active conditions of a list; inactive ones are dropped.
pub fn active(conditions: &[Condition]) -> impl Iterator<Item = &Condition> {
    conditions.iter().filter(|c| !c.inactive)
}

/// First active field-value condition on `field`.
pub fn find_field_condition<'a>(conditions: &'a [Condition], field: &str) -> Option<&'a FieldCondition> {
    active(conditions)
        .filter_map(Condition::as_field_value)
        .find(|fc| fc.field == field)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCondition {
    #[serde(rename = "type", default)]
    condition_type: Option<String>,
    #[serde(default)]
    field: Option<String>,
    #[serde(default)]
    fields: Vec<String>,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    value: Value,
    #[serde(default)]
    values: Option<Vec<Value>>,
    #[serde(default)]
    conjunction: Option<Conjunction>,
    #[serde(default)]
    conditions: Vec<Condition>,
    #[serde(default)]
    subfield: Option<String>,
    #[serde(default)]
    subcollection: Option<String>,
    #[serde(default)]
    inactive: bool,
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        let kind = match raw.condition_type.as_deref() {
            Some("SEARCH") => ConditionKind::Search(SearchCondition {
                fields: raw.fields,
                value: match raw.value {
                    Value::String(s) => s,
                    Value::Null => String::new(),
                    other => other.to_string(),
                },
            }),
            Some("GROUP") => ConditionKind::Group(GroupCondition {
                conjunction: raw.conjunction.unwrap_or_default(),
                conditions: raw.conditions,
            }),
            Some("SUBQUERY") => ConditionKind::Subquery(SubqueryCondition {
                field: raw.field.unwrap_or_default(),
                subfield: raw.subfield.unwrap_or_default(),
                subcollection: raw.subcollection.unwrap_or_default(),
                conjunction: raw.conjunction.unwrap_or_default(),
                conditions: raw.conditions,
            }),
            _ => ConditionKind::FieldValue(FieldCondition {
                field: raw.field.unwrap_or_default(),
                operator: raw.operator.map(Operator::from).unwrap_or_default(),
                value: raw.value,
                values: raw.values.unwrap_or_default(),
            }),
        };
        Condition {
            kind,
            inactive: raw.inactive,
        }
    }
}
