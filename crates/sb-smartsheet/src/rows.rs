//! Sheet rows to platform records and back.

use serde_json::{json, Value};

use saasbridge_core::{
    value_to_id, Coercer, CollectionMetadata, FieldMappingTable, MetadataProvider, Record, ID_FIELD,
};

/// Column and row ids are numeric in the API; mapping records store them
/// as strings.
pub(crate) fn api_id(id: &str) -> Value {
    match id.parse::<u64>() {
        Ok(n) => json!(n),
        Err(_) => Value::String(id.to_string()),
    }
}

/// Internal record for one row: the row id plus every cell whose column
/// is mapped, coerced through `coercer`. Cells without a value are left out.
pub fn row_to_record<P>(
    row: &Value,
    coercer: &Coercer<'_, P>,
    collection: &CollectionMetadata,
    table: &FieldMappingTable,
) -> Record
where
    P: MetadataProvider + ?Sized,
{
    let mut external = Record::new();
    let cells = row.get("cells").and_then(Value::as_array);
    for cell in cells.into_iter().flatten() {
        let Some(column) = cell.get("columnId").and_then(value_to_id) else {
            continue;
        };
        if let Some(value) = cell.get("value") {
            external.insert(column, value.clone());
        }
    }
    let mut record = coercer.to_internal_with_table(&external, collection, table);
    if let Some(id) = row.get("id").and_then(value_to_id) {
        record.insert(ID_FIELD.to_string(), Value::String(id));
    }
    record
}

/// Cells for the fields of `record` that the collection declares, the
/// table maps, and the operation may write. MAP fields produce one cell
/// per mapped path that is present.
pub fn record_to_cells<P>(
    record: &Record,
    coercer: &Coercer<'_, P>,
    collection: &CollectionMetadata,
    table: &FieldMappingTable,
    is_update: bool,
) -> Vec<Value>
where
    P: MetadataProvider + ?Sized,
{
    coercer
        .to_external_with_table(record, collection, table, is_update)
        .into_iter()
        .map(|(column, value)| cell(&column, value))
        .collect()
}

fn cell(column: &str, value: Value) -> Value {
    json!({"columnId": api_id(column), "value": value})
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::SheetMapping;
    use saasbridge_core::{record, Dialect, FieldMetadata, FieldType};

    fn tasks() -> CollectionMetadata {
        CollectionMetadata::new("luigi/foo", "tasks")
            .with_field(FieldMetadata::new("luigi/foo", "name", FieldType::Text))
            .with_field(FieldMetadata::new("luigi/foo", "address", FieldType::Map))
            .with_field(FieldMetadata::new("luigi/foo", "owner", FieldType::Reference))
            .with_field(FieldMetadata::new("luigi/foo", "due", FieldType::Timestamp))
            .with_field(FieldMetadata::new("luigi/foo", "rownum", FieldType::Number).read_only())
            .with_field(FieldMetadata::new("luigi/foo", "code", FieldType::Text).not_updateable())
    }

    fn mapping() -> SheetMapping {
        SheetMapping::new("s1")
            .with_column("luigi/foo.name", "101")
            .with_column("luigi/foo.owner", "103")
            .with_column("luigi/foo.due", "104")
            .with_column("luigi/foo.rownum", "105")
            .with_column("luigi/foo.code", "106")
            .with_paths("luigi/foo.address", [("street", "201"), ("geo->city", "202")])
    }

    fn load(row: &Value) -> Record {
        let collection = tasks();
        let dialect = Dialect::new("id");
        let coercer = Coercer::new(&collection, &dialect);
        row_to_record(row, &coercer, &collection, &mapping().table())
    }

    fn cells(rec: &Record, is_update: bool) -> Vec<Value> {
        let collection = tasks();
        let dialect = Dialect::new("id");
        let coercer = Coercer::new(&collection, &dialect);
        record_to_cells(rec, &coercer, &collection, &mapping().table(), is_update)
    }

    #[test]
    fn test_row_to_record_with_paths() {
        let row = json!({
            "id": 8831,
            "cells": [
                {"columnId": 101, "value": "Ship it"},
                {"columnId": 201, "value": "1 Main St"},
                {"columnId": 202, "value": "Springfield"},
                {"columnId": 999, "value": "unmapped"},
                {"columnId": 103}
            ]
        });
        assert_eq!(
            Value::Object(load(&row)),
            json!({
                ID_FIELD: "8831",
                "luigi/foo.name": "Ship it",
                "luigi/foo.address": {"street": "1 Main St", "geo": {"city": "Springfield"}}
            })
        );
    }

    #[test]
    fn test_row_to_record_coerces_timestamps_and_references() {
        let row = json!({
            "id": 8832,
            "cells": [
                {"columnId": 103, "value": "u1"},
                {"columnId": 104, "value": "2024-01-15T10:30:00Z"}
            ]
        });
        let record = load(&row);
        assert_eq!(record["luigi/foo.due"], json!(1705314600));
        assert_eq!(record["luigi/foo.owner"], json!({ID_FIELD: "u1"}));
    }

    #[test]
    fn test_row_without_cells_keeps_id() {
        assert_eq!(Value::Object(load(&json!({"id": "123"}))), json!({ID_FIELD: "123"}));
    }

    #[test]
    fn test_record_to_cells_fans_out_map_fields() {
        let rec = record([
            ("luigi/foo.name", json!("Ship it")),
            ("luigi/foo.address", json!({"street": "1 Main St"})),
            ("luigi/foo.owner", json!({ID_FIELD: "u1"})),
            ("luigi/foo.undeclared", json!("x")),
            (ID_FIELD, json!("8831")),
        ]);
        let cells = cells(&rec, false);
        assert_eq!(cells.len(), 3);
        assert!(cells.contains(&json!({"columnId": 101, "value": "Ship it"})));
        assert!(cells.contains(&json!({"columnId": 201, "value": "1 Main St"})));
        assert!(cells.contains(&json!({"columnId": 103, "value": "u1"})));
    }

    #[test]
    fn test_record_to_cells_formats_timestamps() {
        let rec = record([("luigi/foo.due", json!(1705314600))]);
        assert_eq!(
            cells(&rec, false),
            vec![json!({"columnId": 104, "value": "2024-01-15T10:30:00.000Z"})]
        );
    }

    #[test]
    fn test_record_to_cells_respects_writability() {
        let rec = record([
            ("luigi/foo.name", json!("x")),
            ("luigi/foo.rownum", json!(7)),
            ("luigi/foo.code", json!("T-1")),
        ]);

        let inserted = cells(&rec, false);
        assert_eq!(inserted.len(), 2);
        assert!(inserted.contains(&json!({"columnId": 101, "value": "x"})));
        assert!(inserted.contains(&json!({"columnId": 106, "value": "T-1"})));

        assert_eq!(cells(&rec, true), vec![json!({"columnId": 101, "value": "x"})]);
    }
}
