//! Smartsheet sheets and rows.

use serde_json::{json, Value};
use tracing::{debug, error, info, instrument};

use saasbridge_client::security::url as url_security;
use saasbridge_client::{Credentials, HttpRequest, HttpResponse, Transport};
use saasbridge_core::{
    find_field_condition, record, value_to_id, Coercer, CollectionMetadata, Dialect, Error,
    ErrorKind, FieldCondition, FieldMappingTable, LoadRequest, LoadSink, Operator, Page, Result,
    SaveRequest, ID_FIELD,
};

use crate::mapping::{MappingLookup, SheetMapping};
use crate::rows::{api_id, record_to_cells, row_to_record};

/// API root used when the credentials carry no base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.smartsheet.com/2.0";

pub const SHEET_NAME_FIELD: &str = "uesio/smartsheet.name";
pub const SHEET_COLUMNS_FIELD: &str = "uesio/smartsheet.columns";

/// Exposes sheets, and the rows of one sheet, as platform collections.
///
/// Row collections name their sheet through their external name, or
/// through a [`SheetMapping`] that also assigns columns to fields.
#[derive(Debug, Clone)]
pub struct SmartsheetAdapter<T> {
    transport: T,
    credentials: Credentials,
    dialect: Dialect,
}

impl<T: Transport> SmartsheetAdapter<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            dialect: Dialect::new("id"),
        }
    }

    fn base_url(&self) -> &str {
        self.credentials.base_url().unwrap_or(DEFAULT_BASE_URL)
    }

    /// List sheets, or load a single sheet with its columns when the load
    /// carries an id condition.
    #[instrument(skip(self, request, sink), fields(collection = %request.collection))]
    pub async fn load_sheets<S>(&self, request: &LoadRequest, sink: &mut S) -> Result<()>
    where
        S: LoadSink + ?Sized,
    {
        let single = find_field_condition(&request.conditions, ID_FIELD).and_then(|c| match c.operator {
            Operator::Eq => value_to_id(&c.value),
            Operator::In => c.values.first().and_then(value_to_id),
            _ => None,
        });

        if let Some(sheet_id) = single {
            let url = format!(
                "{}/sheets/{}?rowNumbers=0",
                self.base_url(),
                url_security::encode_param(&sheet_id)
            );
            let response = self.transport.request(HttpRequest::get(url)).await?;
            debug!(code = response.code, sheet = %sheet_id, "Sheet response");
            if response.code != 200 {
                sink.add_error(format!("failed to load sheet {}: {}", sheet_id, failure_message(&response)));
                return Ok(());
            }
            if response.body.is_object() {
                sink.add_record(record([
                    (ID_FIELD, response.body.get("id").and_then(value_to_id).map_or(Value::Null, Value::String)),
                    (SHEET_NAME_FIELD, response.body.get("name").cloned().unwrap_or(Value::Null)),
                    (SHEET_COLUMNS_FIELD, response.body.get("columns").cloned().unwrap_or(Value::Null)),
                ]));
            }
            return Ok(());
        }

        let page = Page::new(request.batch_size, request.batch_number);
        let url = format!("{}/sheets?{}", self.base_url(), encode_query(&page_params(&page))?);
        let response = self.transport.request(HttpRequest::get(url)).await?;
        debug!(code = response.code, "Sheets response");
        if response.code != 200 {
            sink.add_error(format!("failed to list sheets: {}", failure_message(&response)));
            return Ok(());
        }
        let sheets = response.body.get("data").and_then(Value::as_array);
        let emitted = page.assemble(sheets.into_iter().flatten(), sink, |sheet| {
            record([
                (ID_FIELD, sheet.get("id").and_then(value_to_id).map_or(Value::Null, Value::String)),
                (SHEET_NAME_FIELD, sheet.get("name").cloned().unwrap_or(Value::Null)),
            ])
        });
        debug!(emitted, "Listed sheets");
        Ok(())
    }

    /// Load one page of rows.
    ///
    /// Cells map to fields through `mapping` when given, otherwise through
    /// the external names of the collection's fields. An `EQ`/`IN`
    /// condition on the id field restricts the load to those rows.
    #[instrument(skip(self, request, mapping, sink), fields(collection = %request.collection))]
    pub async fn load_rows<S>(
        &self,
        request: &LoadRequest,
        mapping: Option<&SheetMapping>,
        sink: &mut S,
    ) -> Result<()>
    where
        S: LoadSink + ?Sized,
    {
        let collection = &request.collection_metadata;
        let sheet_id = match mapping {
            Some(mapping) => mapping.sheet_id.as_str(),
            None => sheet_name(collection)?,
        };

        let page = Page::new(request.batch_size, request.batch_number);
        let mut params = page_params(&page);
        if let Some(row_ids) = find_field_condition(&request.conditions, ID_FIELD).and_then(row_ids) {
            params.push(("rowIds".to_string(), row_ids));
        }
        let url = format!(
            "{}/sheets/{}?{}",
            self.base_url(),
            url_security::encode_param(sheet_id),
            encode_query(&params)?
        );
        info!(sheet = %sheet_id, batch_number = page.batch_number(), batch_size = ?page.batch_size(), "Loading rows");

        let response = self.transport.request(HttpRequest::get(url)).await?;
        debug!(code = response.code, status = %response.status, "Rows response");
        if response.code != 200 {
            sink.add_error(format!("failed to load sheet {}: {}", sheet_id, failure_message(&response)));
            return Ok(());
        }

        let table = match mapping {
            Some(mapping) => mapping.table(),
            None => FieldMappingTable::build(collection, &self.dialect),
        };
        let metadata = request.metadata();
        let coercer = Coercer::new(&metadata, &self.dialect);
        let rows = response.body.get("rows").and_then(Value::as_array);
        let emitted = page.assemble(rows.into_iter().flatten(), sink, |row| {
            row_to_record(row, &coercer, collection, &table)
        });
        debug!(emitted, "Assembled rows");
        Ok(())
    }

    /// Write inserts, updates and deletes to the mapped sheet, one request
    /// per kind.
    ///
    /// The collection must have a mapping record. The first non-success
    /// response is reported as a request-level error and stops the save.
    #[instrument(skip(self, request, mappings), fields(collection = %request.collection))]
    pub async fn save_rows<M>(&self, request: &mut SaveRequest, mappings: &M) -> Result<()>
    where
        M: MappingLookup,
    {
        if request.is_empty() {
            return Ok(());
        }
        let key = request.collection_metadata.key();
        let mapping = mappings.find_mapping(&key).await?.ok_or_else(|| {
            Error::new(ErrorKind::MissingMapping(format!(
                "No mapping provided for collection: {}",
                key
            )))
        })?;
        let table = mapping.table();
        let url = format!(
            "{}/sheets/{}/rows",
            self.base_url(),
            url_security::encode_param(&mapping.sheet_id)
        );
        let (insert_rows, update_rows) = {
            let metadata = request.metadata();
            let coercer = Coercer::new(&metadata, &self.dialect);
            let collection = &request.collection_metadata;
            let inserts: Vec<Value> = request
                .inserts
                .iter()
                .map(|op| {
                    json!({
                        "toTop": true,
                        "cells": record_to_cells(op.all(), &coercer, collection, &table, false),
                    })
                })
                .collect();
            let updates: Vec<Value> = request
                .updates
                .iter()
                .map(|op| {
                    json!({
                        "id": api_id(op.id()),
                        "toTop": true,
                        "cells": record_to_cells(op.all(), &coercer, collection, &table, true),
                    })
                })
                .collect();
            (inserts, updates)
        };

        if !insert_rows.is_empty() {
            info!(rows = insert_rows.len(), "Inserting rows");
            let response = self
                .transport
                .request(HttpRequest::post(&url).json_value(Value::Array(insert_rows)))
                .await?;
            if !self.check(request, &response) {
                return Ok(());
            }
            let created = response.body.get("result").and_then(Value::as_array);
            for (op, row) in request.inserts.iter_mut().zip(created.into_iter().flatten()) {
                if let Some(id) = row.get("id").and_then(value_to_id) {
                    op.set_all(record([(ID_FIELD, Value::String(id))]));
                }
            }
        }

        if !update_rows.is_empty() {
            info!(rows = update_rows.len(), "Updating rows");
            let response = self
                .transport
                .request(HttpRequest::put(&url).json_value(Value::Array(update_rows)))
                .await?;
            if !self.check(request, &response) {
                return Ok(());
            }
        }

        if !request.deletes.is_empty() {
            let ids: Vec<String> = request
                .deletes
                .iter()
                .map(|op| url_security::encode_param(op.id()))
                .collect();
            info!(rows = ids.len(), "Deleting rows");
            let response = self
                .transport
                .request(HttpRequest::delete(format!("{}?ids={}", url, ids.join(","))))
                .await?;
            self.check(request, &response);
        }
        Ok(())
    }

    fn check(&self, request: &mut SaveRequest, response: &HttpResponse) -> bool {
        debug!(code = response.code, status = %response.status, "Rows write response");
        if response.code == 200 {
            return true;
        }
        let message = failure_message(response);
        error!(code = response.code, message = %message, "Smartsheet write failed");
        request.add_error(message);
        false
    }
}

/// `page`/`pageSize` with one row of lookahead, or `includeAll`.
fn page_params(page: &Page) -> Vec<(String, String)> {
    match page.fetch_limit() {
        Some(limit) => vec![
            ("page".to_string(), (page.batch_number() + 1).to_string()),
            ("pageSize".to_string(), limit.to_string()),
        ],
        None => vec![("includeAll".to_string(), "true".to_string())],
    }
}

fn row_ids(condition: &FieldCondition) -> Option<String> {
    match condition.operator {
        Operator::Eq => value_to_id(&condition.value),
        Operator::In if !condition.values.is_empty() => {
            let ids: Vec<String> = condition.values.iter().filter_map(value_to_id).collect();
            (!ids.is_empty()).then(|| ids.join(","))
        }
        _ => None,
    }
}

fn encode_query(params: &[(String, String)]) -> Result<String> {
    serde_urlencoded::to_string(params).map_err(|e| Error::new(ErrorKind::Other(e.to_string())))
}

fn failure_message(response: &HttpResponse) -> String {
    response
        .error_message()
        .unwrap_or_else(|| response.status.clone())
}

fn sheet_name(collection: &CollectionMetadata) -> Result<&str> {
    collection
        .external_name
        .as_deref()
        .filter(|name| !name.is_empty())
        .ok_or_else(|| Error::config(format!("collection {} has no sheet id", collection.key())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MappingSet;
    use saasbridge_client::RequestMethod;
    use saasbridge_core::testing::MockTransport;
    use saasbridge_core::{Condition, FieldMetadata, FieldType, LoadResult};

    const SHEETS: &str = "https://api.smartsheet.com/2.0/sheets";

    fn tasks() -> CollectionMetadata {
        CollectionMetadata::new("luigi/foo", "tasks")
            .with_external_name("somesheetid")
            .with_field(FieldMetadata::new("uesio/smartsheet", "name", FieldType::Text).with_external_name("taskname"))
            .with_field(FieldMetadata::new("uesio/smartsheet", "status", FieldType::Text).with_external_name("taskstatus"))
    }

    fn rows() -> Value {
        json!({"rows": [
            {"id": 1, "cells": [
                {"columnId": "taskname", "displayValue": "Test", "value": "Test"},
                {"columnId": "taskstatus", "displayValue": "In Progress", "value": "in_progress"}
            ]},
            {"id": 2, "cells": [
                {"columnId": "taskname", "displayValue": "Another test", "value": "Another test"},
                {"columnId": "taskstatus", "displayValue": "Completed", "value": "completed"}
            ]}
        ]})
    }

    fn adapter(transport: &MockTransport) -> SmartsheetAdapter<&MockTransport> {
        SmartsheetAdapter::new(transport, Credentials::default().with_access_token("token"))
    }

    #[tokio::test]
    async fn test_rows_lookahead_page() {
        let transport = MockTransport::new().with_json(200, rows());
        let mut sink = LoadResult::default();
        let request = LoadRequest::new(tasks()).with_batch(1, 0);
        adapter(&transport).load_rows(&request, None, &mut sink).await.unwrap();

        assert_eq!(
            transport.last_request().unwrap().url,
            format!("{SHEETS}/somesheetid?page=1&pageSize=2")
        );
        assert_eq!(sink.records.len(), 1);
        assert_eq!(
            Value::Object(sink.records[0].clone()),
            json!({ID_FIELD: "1", "uesio/smartsheet.name": "Test", "uesio/smartsheet.status": "in_progress"})
        );
        assert!(sink.has_more_records);
    }

    #[tokio::test]
    async fn test_rows_short_page_and_row_ids() {
        let transport = MockTransport::new().with_json(200, rows());
        let mut sink = LoadResult::default();
        let request = LoadRequest::new(tasks())
            .with_batch(10, 2)
            .with_condition(Condition::values(ID_FIELD, Operator::In, vec![json!("1"), json!("2")]));
        adapter(&transport).load_rows(&request, None, &mut sink).await.unwrap();

        assert_eq!(
            transport.last_request().unwrap().url,
            format!("{SHEETS}/somesheetid?page=3&pageSize=11&rowIds=1%2C2")
        );
        assert_eq!(sink.records.len(), 2);
        assert!(!sink.has_more_records);
    }

    #[tokio::test]
    async fn test_rows_unpaginated_without_rows() {
        let transport = MockTransport::new().with_json(200, json!({"columns": []}));
        let mut sink = LoadResult::default();
        adapter(&transport)
            .load_rows(&LoadRequest::new(tasks()), None, &mut sink)
            .await
            .unwrap();
        assert_eq!(transport.last_request().unwrap().url, format!("{SHEETS}/somesheetid?includeAll=true"));
        assert!(sink.records.is_empty());
        assert!(sink.errors.is_empty());
    }

    #[tokio::test]
    async fn test_rows_through_mapping() {
        let transport = MockTransport::new().with_json(
            200,
            json!({"rows": [{"id": 5, "cells": [{"columnId": 77, "value": "Mapped"}]}]}),
        );
        let mapping = SheetMapping::new("4583").with_column("uesio/smartsheet.name", "77");
        let mut sink = LoadResult::default();
        adapter(&transport)
            .load_rows(&LoadRequest::new(tasks()), Some(&mapping), &mut sink)
            .await
            .unwrap();
        assert!(transport.last_request().unwrap().url.starts_with(&format!("{SHEETS}/4583?")));
        assert_eq!(sink.records[0]["uesio/smartsheet.name"], json!("Mapped"));
    }

    #[tokio::test]
    async fn test_list_and_single_sheet() {
        let transport = MockTransport::new()
            .with_json(200, json!({"data": [{"id": 11, "name": "Roadmap"}, {"id": 12, "name": "Budget"}]}))
            .with_json(200, json!({"id": 11, "name": "Roadmap", "columns": [{"id": 1, "title": "Task"}]}));
        let sheets = CollectionMetadata::new("uesio/smartsheet", "sheet");

        let mut list = LoadResult::default();
        adapter(&transport).load_sheets(&LoadRequest::new(sheets.clone()), &mut list).await.unwrap();
        assert_eq!(transport.last_request().unwrap().url, format!("{SHEETS}?includeAll=true"));
        assert_eq!(list.records.len(), 2);
        assert_eq!(list.records[1][ID_FIELD], json!("12"));
        assert_eq!(list.records[1][SHEET_NAME_FIELD], json!("Budget"));

        let mut single = LoadResult::default();
        let request = LoadRequest::new(sheets).with_condition(Condition::eq(ID_FIELD, json!("11")));
        adapter(&transport).load_sheets(&request, &mut single).await.unwrap();
        assert_eq!(transport.last_request().unwrap().url, format!("{SHEETS}/11?rowNumbers=0"));
        assert_eq!(single.records.len(), 1);
        assert_eq!(single.records[0][SHEET_COLUMNS_FIELD], json!([{"id": 1, "title": "Task"}]));
    }

    fn leads() -> CollectionMetadata {
        CollectionMetadata::new("acme/crm", "lead")
            .with_field(FieldMetadata::new("acme/crm", "name", FieldType::Text))
            .with_field(FieldMetadata::new("acme/crm", "address", FieldType::Map))
    }

    fn lead_mappings() -> MappingSet {
        MappingSet::new().with(
            "acme/crm.lead",
            SheetMapping::new("900")
                .with_column("acme/crm.name", "101")
                .with_paths("acme/crm.address", [("city", "102")]),
        )
    }

    #[tokio::test]
    async fn test_save_rows() {
        let transport = MockTransport::new()
            .with_json(200, json!({"message": "SUCCESS", "result": [{"id": 7001}]}))
            .with_json(200, json!({"message": "SUCCESS"}))
            .with_json(200, json!({"message": "SUCCESS"}));
        let mut request = SaveRequest::new(leads())
            .with_insert("tmp1", record([("acme/crm.name", json!("Ada")), ("acme/crm.address", json!({"city": "London"}))]))
            .with_update("6001", record([("acme/crm.name", json!("Grace"))]))
            .with_delete("5001")
            .with_delete("5002");
        adapter(&transport).save_rows(&mut request, &lead_mappings()).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].method, RequestMethod::Post);
        assert_eq!(sent[0].url, format!("{SHEETS}/900/rows"));
        let inserted = sent[0].json_body().unwrap();
        assert_eq!(inserted[0]["toTop"], json!(true));
        let cells = inserted[0]["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 2);
        assert!(cells.contains(&json!({"columnId": 102, "value": "London"})));

        assert_eq!(sent[1].method, RequestMethod::Put);
        assert_eq!(
            sent[1].json_body(),
            Some(&json!([{"id": 6001, "toTop": true, "cells": [{"columnId": 101, "value": "Grace"}]}]))
        );
        assert_eq!(sent[2].method, RequestMethod::Delete);
        assert_eq!(sent[2].url, format!("{SHEETS}/900/rows?ids=5001,5002"));

        assert_eq!(request.inserts[0].get(ID_FIELD), Some(&json!("7001")));
        assert!(request.errors.is_empty());
    }

    #[tokio::test]
    async fn test_save_rows_drops_fields_the_operation_cannot_write() {
        let transport = MockTransport::new()
            .with_json(200, json!({"message": "SUCCESS", "result": [{"id": 7002}]}))
            .with_json(200, json!({"message": "SUCCESS"}));
        let collection = leads()
            .with_field(FieldMetadata::new("acme/crm", "source", FieldType::Text).not_updateable())
            .with_field(FieldMetadata::new("acme/crm", "created", FieldType::Timestamp).read_only());
        let mappings = MappingSet::new().with(
            "acme/crm.lead",
            SheetMapping::new("900")
                .with_column("acme/crm.name", "101")
                .with_column("acme/crm.source", "103")
                .with_column("acme/crm.created", "104"),
        );
        let mut request = SaveRequest::new(collection)
            .with_insert(
                "tmp1",
                record([
                    ("acme/crm.source", json!("web")),
                    ("acme/crm.created", json!(1705314600)),
                ]),
            )
            .with_update(
                "6001",
                record([("acme/crm.name", json!("Grace")), ("acme/crm.source", json!("phone"))]),
            );
        adapter(&transport).save_rows(&mut request, &mappings).await.unwrap();

        let sent = transport.requests();
        assert_eq!(
            sent[0].json_body(),
            Some(&json!([{"toTop": true, "cells": [{"columnId": 103, "value": "web"}]}]))
        );
        assert_eq!(
            sent[1].json_body(),
            Some(&json!([{"id": 6001, "toTop": true, "cells": [{"columnId": 101, "value": "Grace"}]}]))
        );
        assert!(request.errors.is_empty());
    }

    #[tokio::test]
    async fn test_save_without_mapping_is_fatal() {
        let transport = MockTransport::new();
        let mut request = SaveRequest::new(tasks()).with_delete("1");
        let err = adapter(&transport)
            .save_rows(&mut request, &lead_mappings())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingMapping(ref m) if m == "No mapping provided for collection: luigi/foo.tasks"));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_save_stops_at_first_failure() {
        let transport = MockTransport::new().with_json(400, json!({"errorCode": 1006, "message": "Not Found"}));
        let mut request = SaveRequest::new(leads())
            .with_insert("tmp1", record([("acme/crm.name", json!("Ada"))]))
            .with_delete("5001");
        adapter(&transport).save_rows(&mut request, &lead_mappings()).await.unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(request.errors, vec!["Not Found".to_string()]);
    }
}
