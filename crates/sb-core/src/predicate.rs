//! Client-side evaluation of conditions against internal records.
//!
//! Used when an API cannot filter server-side. Inequalities compare numbers
//! numerically and strings lexically; a null or missing value never
//! satisfies an inequality.

use std::cmp::Ordering;

use serde_json::Value;
use tracing::debug;

use crate::condition::{Condition, ConditionKind, Conjunction, FieldCondition, Operator};
use crate::metadata::ID_FIELD;
use crate::record::Record;

/// True if every active condition matches the record.
pub fn matches_all(conditions: &[Condition], record: &Record) -> bool {
    conditions.iter().all(|c| matches(c, record))
}

/// Evaluate one condition. Inactive conditions always match.
pub fn matches(condition: &Condition, record: &Record) -> bool {
    if condition.inactive {
        return true;
    }
    match &condition.kind {
        ConditionKind::FieldValue(fc) => matches_field(fc, record),
        ConditionKind::Group(group) => {
            let mut children = group.conditions.iter().filter(|c| !c.inactive).peekable();
            if children.peek().is_none() {
                return true;
            }
            match group.conjunction {
                Conjunction::And => children.all(|c| matches(c, record)),
                Conjunction::Or => children.any(|c| matches(c, record)),
            }
        }
        ConditionKind::Search(search) => {
            let needle = search.value.to_lowercase();
            search.fields.iter().any(|field| {
                record
                    .get(field)
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
        }
        ConditionKind::Subquery(sub) => {
            debug!(field = %sub.field, "Subquery conditions cannot be evaluated locally, ignoring");
            true
        }
    }
}

fn matches_field(fc: &FieldCondition, record: &Record) -> bool {
    let actual = record.get(&fc.field).map(comparable).unwrap_or(&Value::Null);
    match fc.operator {
        Operator::Eq => loosely_equal(actual, &fc.value),
        Operator::NotEq => !loosely_equal(actual, &fc.value),
        Operator::Gt => compare(actual, &fc.value) == Some(Ordering::Greater),
        Operator::Gte => matches!(
            compare(actual, &fc.value),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        Operator::Lt => compare(actual, &fc.value) == Some(Ordering::Less),
        Operator::Lte => matches!(
            compare(actual, &fc.value),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Operator::In => fc.values.iter().any(|v| loosely_equal(actual, v)),
        Operator::NotIn => !fc.values.iter().any(|v| loosely_equal(actual, v)),
        Operator::IsBlank => is_blank(actual),
        Operator::IsNotBlank => !is_blank(actual),
    }
}

/// Reference values compare by their id.
fn comparable(value: &Value) -> &Value {
    match value {
        Value::Object(map) => map.get(ID_FIELD).unwrap_or(value),
        _ => value,
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn loosely_equal(actual: &Value, expected: &Value) -> bool {
    let expected = comparable(expected);
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            s.parse::<f64>().ok() == n.as_f64()
        }
        _ => actual == expected,
    }
}

fn compare(actual: &Value, expected: &Value) -> Option<Ordering> {
    let expected = comparable(expected);
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => a.as_f64()?.partial_cmp(&b.parse::<f64>().ok()?),
        (Value::String(a), Value::Number(b)) => a.parse::<f64>().ok()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}
