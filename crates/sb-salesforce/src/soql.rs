//! SOQL text generation.
//!
//! [`SoqlQuery`] assembles the ordered clause list; [`ConditionCompiler`]
//! turns the platform condition tree into a WHERE expression. Every value
//! that lands inside a literal goes through [`soql::escape_string`] and
//! every identifier is validated before it is emitted.

use serde_json::Value;
use tracing::warn;

use saasbridge_client::security::soql;
use saasbridge_core::{
    active, unwrap_reference, CollectionMetadata, Condition, ConditionKind, Conjunction, Error,
    FieldCondition, FieldMappingTable, Operator, Result, SearchCondition, SubqueryCondition,
};

/// A SOQL query as an ordered list of clauses.
///
/// ```rust
/// use saasbridge_salesforce::SoqlQuery;
///
/// let query = SoqlQuery::new("Account")
///     .unwrap()
///     .select(["Id".to_string(), "Name".to_string()])
///     .order_by("Name", false)
///     .limit(Some(11))
///     .build();
/// assert_eq!(query, "SELECT Id, Name FROM Account ORDER BY Name ASC LIMIT 11");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SoqlQuery {
    sobject: String,
    fields: Vec<String>,
    separator: &'static str,
    filter: Option<String>,
    order_by: Vec<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl SoqlQuery {
    /// Start a query against `sobject`, which must be a plain identifier.
    pub fn new(sobject: impl AsRef<str>) -> Result<Self> {
        let sobject = sobject.as_ref();
        if !soql::is_safe_sobject_name(sobject) {
            return Err(Error::config(format!("Invalid SObject name: {}", sobject)));
        }
        Ok(Self {
            sobject: sobject.to_string(),
            fields: Vec::new(),
            separator: ", ",
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        })
    }

    /// Add fields to the select list. Unsafe names are dropped.
    pub fn select(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        for field in fields {
            if soql::is_safe_field_name(&field) {
                self.fields.push(field);
            } else {
                warn!(field = %field, "Dropping unsafe field name from SOQL select list");
            }
        }
        self
    }

    /// Join the select list with a bare comma.
    pub fn compact(mut self) -> Self {
        self.separator = ",";
        self
    }

    /// Set the WHERE expression.
    pub fn filter(mut self, expression: Option<String>) -> Self {
        self.filter = expression.filter(|e| !e.is_empty());
        self
    }

    /// Append an ORDER BY key. Unsafe names are dropped.
    pub fn order_by(mut self, field: &str, desc: bool) -> Self {
        if soql::is_safe_field_name(field) {
            let direction = if desc { "DESC" } else { "ASC" };
            self.order_by.push(format!("{} {}", field, direction));
        }
        self
    }

    pub fn limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: Option<usize>) -> Self {
        self.offset = offset;
        self
    }

    /// Render the clauses in order, joined by single spaces.
    pub fn build(&self) -> String {
        let mut clauses = vec![
            "SELECT".to_string(),
            self.fields.join(self.separator),
            format!("FROM {}", self.sobject),
        ];
        if let Some(filter) = &self.filter {
            clauses.push(format!("WHERE {}", filter));
        }
        if !self.order_by.is_empty() {
            clauses.push(format!("ORDER BY {}", self.order_by.join(", ")));
        }
        if let Some(limit) = self.limit {
            clauses.push(format!("LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            clauses.push(format!("OFFSET {}", offset));
        }
        clauses.retain(|c| !c.is_empty());
        clauses.join(" ")
    }
}

/// Compiles condition trees into SOQL boolean expressions.
///
/// The top level is a group joined with `AND`; every group renders as
/// `(a) CONJ (b)` wrapped in parentheses, and field-value leaves carry
/// their own parentheses, so a single equality compiles to `((X = 'v'))`.
pub struct ConditionCompiler<'a> {
    collection: &'a CollectionMetadata,
    table: &'a FieldMappingTable,
    raw_names: bool,
}

impl<'a> ConditionCompiler<'a> {
    pub fn new(collection: &'a CollectionMetadata, table: &'a FieldMappingTable) -> Self {
        Self {
            collection,
            table,
            raw_names: false,
        }
    }

    /// Compile the active conditions. Returns `None` when nothing remains.
    ///
    /// A condition on a field with no external name is a configuration
    /// error rather than a silently dropped filter.
    pub fn compile(&self, conditions: &[Condition]) -> Result<Option<String>> {
        self.group(conditions, Conjunction::And)
    }

    fn group(&self, conditions: &[Condition], conjunction: Conjunction) -> Result<Option<String>> {
        let mut fragments = Vec::new();
        for condition in active(conditions) {
            if let Some(fragment) = self.condition(condition)? {
                fragments.push(fragment);
            }
        }
        if fragments.is_empty() {
            return Ok(None);
        }
        let joiner = format!(") {} (", conjunction.as_str());
        Ok(Some(format!("({})", fragments.join(&joiner))))
    }

    fn condition(&self, condition: &Condition) -> Result<Option<String>> {
        match &condition.kind {
            ConditionKind::FieldValue(fc) => self.field_value(fc).map(Some),
            ConditionKind::Group(group) => self.group(&group.conditions, group.conjunction),
            ConditionKind::Search(search) => Ok(self.search(search)),
            ConditionKind::Subquery(sub) => self.subquery(sub).map(Some),
        }
    }

    fn external(&self, field: &str) -> Result<String> {
        if let Some(external) = self.table.external(field) {
            return Ok(external.to_string());
        }
        if self.raw_names && soql::is_safe_field_name(field) {
            return Ok(field.to_string());
        }
        Err(Error::config(format!(
            "condition field has no external name: {}",
            field
        )))
    }

    fn field_value(&self, fc: &FieldCondition) -> Result<String> {
        let name = self.external(&fc.field)?;
        let fragment = match fc.operator {
            Operator::In | Operator::NotIn => {
                let values = if fc.values.is_empty() {
                    "null".to_string()
                } else {
                    fc.values
                        .iter()
                        .map(|v| self.literal(&fc.field, v))
                        .collect::<Vec<_>>()
                        .join(",")
                };
                format!("{} {} ({})", name, sql_operator(fc.operator), values)
            }
            Operator::IsBlank => format!("({} = null)", name),
            Operator::IsNotBlank => format!("({} != null)", name),
            op => format!(
                "({} {} {})",
                name,
                sql_operator(op),
                self.literal(&fc.field, &fc.value)
            ),
        };
        Ok(fragment)
    }

    fn search(&self, search: &SearchCondition) -> Option<String> {
        let needle = soql::escape_string(&search.value);
        let clauses: Vec<String> = search
            .fields
            .iter()
            .filter_map(|f| self.table.external(f))
            .map(|f| format!("{} LIKE '%{}%'", f, needle))
            .collect();
        if clauses.is_empty() {
            None
        } else {
            Some(clauses.join(" OR "))
        }
    }

    fn subquery(&self, sub: &SubqueryCondition) -> Result<String> {
        let name = self.external(&sub.field)?;
        if !soql::is_safe_field_name(&sub.subfield) {
            return Err(Error::config(format!("Invalid subquery field: {}", sub.subfield)));
        }
        if !soql::is_safe_sobject_name(&sub.subcollection) {
            return Err(Error::config(format!(
                "Invalid subquery collection: {}",
                sub.subcollection
            )));
        }
        let inner = ConditionCompiler {
            raw_names: true,
            ..*self
        };
        let mut select = format!("SELECT {} FROM {}", sub.subfield, sub.subcollection);
        if let Some(filter) = inner.group(&sub.conditions, sub.conjunction)? {
            select.push_str(" WHERE ");
            select.push_str(&filter);
        }
        Ok(format!("{} IN ({})", name, select))
    }

    /// Render a literal for `field`. NUMBER and CHECKBOX values are bare,
    /// null is always bare, everything else is single-quoted and escaped.
    fn literal(&self, field: &str, value: &Value) -> String {
        let value = unwrap_reference(value);
        let quoted = self
            .collection
            .field(field)
            .map(|f| !f.field_type.is_unquoted())
            .unwrap_or(true);
        match value {
            Value::Null => "null".to_string(),
            Value::Bool(b) if !quoted => b.to_string(),
            Value::Number(n) if !quoted => n.to_string(),
            Value::String(s) if !quoted && is_bare_literal(&s) => s,
            Value::String(s) => format!("'{}'", soql::escape_string(&s)),
            other => format!("'{}'", soql::escape_string(&other.to_string())),
        }
    }
}

fn sql_operator(op: Operator) -> &'static str {
    match op {
        Operator::Gt => ">",
        Operator::Lt => "<",
        Operator::Gte => ">=",
        Operator::Lte => "<=",
        Operator::NotEq => "!=",
        Operator::In => "IN",
        Operator::NotIn => "NOT IN",
        _ => "=",
    }
}

/// Numbers and booleans supplied as strings for unquoted field types.
fn is_bare_literal(s: &str) -> bool {
    s == "true" || s == "false" || s.parse::<f64>().is_ok_and(f64::is_finite)
}
