//! ClickUp folders and tasks.

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use saasbridge_client::security::url as url_security;
use saasbridge_client::{Credentials, HttpRequest, HttpResponse, Transport};
use saasbridge_core::predicate::matches_all;
use saasbridge_core::{
    Coercer, CollectionMetadata, Condition, Dialect, Error, ErrorKind, FieldMappingTable,
    LoadRequest, LoadSink, MetadataView, Record, RelationshipRule, Result, SaveRequest,
    TimestampFormat, CREATED_AT_FIELD, UNIQUE_KEY_FIELD, UPDATED_AT_FIELD,
};

use crate::filter::RestFilterCompiler;

/// Credential holding the space folders live in.
pub const SPACE_ID_CREDENTIAL: &str = "defaultSpaceId";

/// External name of the task field that references its list.
const LIST_EXTERNAL_NAME: &str = "list";

/// Naming conventions of ClickUp records.
pub fn clickup_dialect() -> Dialect {
    Dialect::new("id")
        .with_default("name", UNIQUE_KEY_FIELD)
        .with_default("date_created", CREATED_AT_FIELD)
        .with_default("date_updated", UPDATED_AT_FIELD)
        .with_relationship(RelationshipRule::None)
        .with_timestamps(TimestampFormat::EpochMillis)
}

/// Exposes ClickUp folders and tasks as platform collections.
///
/// Folders live under the space named by the `defaultSpaceId` credential.
/// Tasks are read per list: a load must carry an equality condition on the
/// task's list reference, which becomes the `/list/<id>/task` path.
#[derive(Debug, Clone)]
pub struct ClickUpAdapter<T> {
    transport: T,
    credentials: Credentials,
    list_field: Option<String>,
    dialect: Dialect,
}

impl<T: Transport> ClickUpAdapter<T> {
    pub fn new(transport: T, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            list_field: None,
            dialect: clickup_dialect(),
        }
    }

    /// Route conditions on `field` into the task list path instead of the
    /// field whose external name is `list`.
    pub fn with_list_field(mut self, field: impl Into<String>) -> Self {
        self.list_field = Some(field.into());
        self
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    fn list_field<'a>(&'a self, collection: &'a CollectionMetadata) -> Result<&'a str> {
        self.list_field
            .as_deref()
            .or_else(|| collection.field_id_by_external_name(LIST_EXTERNAL_NAME))
            .ok_or_else(|| Error::config(format!("collection {} has no list field", collection.key())))
    }

    /// Load folders of the configured space, filtered client-side.
    #[instrument(skip(self, request, sink), fields(collection = %request.collection))]
    pub async fn load_folders<S>(&self, request: &LoadRequest, sink: &mut S) -> Result<()>
    where
        S: LoadSink + ?Sized,
    {
        let base_url = self.credentials.require_base_url()?;
        let space_id = self.credentials.require(SPACE_ID_CREDENTIAL)?;

        let url = format!(
            "{}/space/{}/folder?archived=false",
            base_url,
            url_security::encode_param(space_id)
        );
        let response = self.transport.request(HttpRequest::get(url)).await?;
        debug!(code = response.code, status = %response.status, "Folders response");

        if response.code != 200 {
            sink.add_error(format!("failed to fetch folders: {}", response.status));
            return Ok(());
        }
        let emitted = self.emit(request, &response, "folders", &request.conditions, sink);
        debug!(emitted, "Loaded folders");
        Ok(())
    }

    /// Load one page of tasks from the list named by the list condition.
    ///
    /// Conditions ClickUp can filter on become query parameters; the rest
    /// are evaluated against the coerced records.
    #[instrument(skip(self, request, sink), fields(collection = %request.collection))]
    pub async fn load_tasks<S>(&self, request: &LoadRequest, sink: &mut S) -> Result<()>
    where
        S: LoadSink + ?Sized,
    {
        let base_url = self.credentials.require_base_url()?;
        let collection = &request.collection_metadata;
        let list_field = self.list_field(collection)?;
        let table = FieldMappingTable::build(collection, &self.dialect);
        let filter = RestFilterCompiler::new(collection, &table)
            .with_path_field(list_field)
            .with_timestamps(self.dialect.timestamps)
            .compile(&request.conditions);

        let Some(list_id) = filter.path_id.as_deref() else {
            return Err(Error::new(ErrorKind::MissingCondition(format!(
                "an equality condition on {} is required to load tasks",
                list_field
            ))));
        };

        let mut params = vec![
            ("archived".to_string(), "false".to_string()),
            ("page".to_string(), request.batch_number.to_string()),
        ];
        params.extend(filter.params.iter().cloned());
        let query = serde_urlencoded::to_string(&params)
            .map_err(|e| Error::new(ErrorKind::Other(e.to_string())))?;
        let url = format!(
            "{}/list/{}/task?{}",
            base_url,
            url_security::encode_param(list_id),
            query
        );
        info!(
            list = %list_id,
            pushed = filter.params.len(),
            residual = filter.residual.len(),
            "Fetching tasks"
        );

        let response = self.transport.request(HttpRequest::get(url)).await?;
        debug!(code = response.code, status = %response.status, "Tasks response");

        if response.code != 200 {
            let message = response
                .error_message()
                .unwrap_or_else(|| response.status.clone());
            sink.add_error(format!("failed to fetch tasks: {}", message));
            return Ok(());
        }

        let emitted = self.emit(request, &response, "tasks", &filter.residual, sink);
        if response.body.get("last_page").and_then(Value::as_bool) == Some(false) {
            sink.set_has_more_records();
        }
        debug!(emitted, "Loaded tasks");
        Ok(())
    }

    fn emit<S>(
        &self,
        request: &LoadRequest,
        response: &HttpResponse,
        key: &str,
        residual: &[Condition],
        sink: &mut S,
    ) -> usize
    where
        S: LoadSink + ?Sized,
    {
        let Some(rows) = response.body.get(key).and_then(Value::as_array) else {
            warn!(key, "Response has no rows");
            return 0;
        };
        let metadata = request.metadata();
        let coercer = Coercer::new(&metadata, &self.dialect);
        let table = FieldMappingTable::build(&request.collection_metadata, &self.dialect);
        let mut emitted = 0;
        for row in rows.iter().filter_map(Value::as_object) {
            let record = coercer.to_internal_with_table(row, &request.collection_metadata, &table);
            if matches_all(residual, &record) {
                sink.add_record(record);
                emitted += 1;
            }
        }
        emitted
    }

    /// Save folders with one REST call per operation.
    ///
    /// Failures are attached to the operation that caused them and do not
    /// stop the remaining operations.
    #[instrument(skip(self, request), fields(collection = %request.collection))]
    pub async fn save_folders(&self, request: &mut SaveRequest) -> Result<()> {
        let base_url = self.credentials.require_base_url()?.to_string();
        let space_id = if request.inserts.is_empty() {
            None
        } else {
            Some(self.credentials.require(SPACE_ID_CREDENTIAL)?.to_string())
        };
        info!(
            inserts = request.inserts.len(),
            updates = request.updates.len(),
            deletes = request.deletes.len(),
            "Saving folders"
        );

        let collection = request.collection_metadata.clone();
        let related = request.related_metadata.clone();
        let metadata = MetadataView {
            primary: &collection,
            related: &related,
        };
        let coercer = Coercer::new(&metadata, &self.dialect);
        let table = FieldMappingTable::build(&collection, &self.dialect);
        let read_back = |body: &Value| -> Option<Record> {
            body.as_object()
                .map(|row| coercer.to_internal_with_table(row, &collection, &table))
        };

        if let Some(space_id) = space_id {
            let url = format!(
                "{}/space/{}/folder",
                base_url,
                url_security::encode_param(&space_id)
            );
            for op in request.inserts.iter_mut() {
                let body = coercer.to_external_with_table(op.all(), &collection, &table, false);
                let outcome = self
                    .transport
                    .request(HttpRequest::post(&url).json_value(Value::Object(body)))
                    .await;
                match outcome {
                    Ok(response) if response.is_success() => {
                        if let Some(values) = read_back(&response.body) {
                            op.set_all(values);
                        }
                    }
                    Ok(response) => op.add_error(failure_message(&response)),
                    Err(err) => {
                        warn!(id = op.id(), error = %err, "Folder insert failed");
                        op.add_error(err.to_string());
                    }
                }
            }
        }

        for op in request.updates.iter_mut() {
            let url = format!("{}/folder/{}", base_url, url_security::encode_param(op.id()));
            let body = coercer.to_external_with_table(op.all(), &collection, &table, true);
            match self
                .transport
                .request(HttpRequest::put(url).json_value(Value::Object(body)))
                .await
            {
                Ok(response) if response.is_success() => {
                    if let Some(values) = read_back(&response.body) {
                        op.set_all(values);
                    }
                }
                Ok(response) => op.add_error(failure_message(&response)),
                Err(err) => {
                    warn!(id = op.id(), error = %err, "Folder update failed");
                    op.add_error(err.to_string());
                }
            }
        }

        for op in request.deletes.iter_mut() {
            let url = format!("{}/folder/{}", base_url, url_security::encode_param(op.id()));
            match self.transport.request(HttpRequest::delete(url)).await {
                Ok(response) if response.is_success() => {}
                Ok(response) => op.add_error(failure_message(&response)),
                Err(err) => {
                    warn!(id = op.id(), error = %err, "Folder delete failed");
                    op.add_error(err.to_string());
                }
            }
        }
        Ok(())
    }
}

fn failure_message(response: &HttpResponse) -> String {
    response
        .error_message()
        .unwrap_or_else(|| response.status.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use saasbridge_client::RequestMethod;
    use saasbridge_core::testing::MockTransport;
    use saasbridge_core::{
        record, FieldMetadata, FieldType, LoadResult, Operator, ID_FIELD,
    };
    use serde_json::json;

    const BASE: &str = "https://api.clickup.com/api/v2";

    fn folder() -> CollectionMetadata {
        CollectionMetadata::new("uesio/clickup", "folder")
            .with_field(FieldMetadata::new("uesio/clickup", "name", FieldType::Text).with_external_name("name"))
            .with_field(
                FieldMetadata::new("uesio/clickup", "task_count", FieldType::Number)
                    .with_external_name("task_count")
                    .read_only(),
            )
            .with_field(FieldMetadata::new("uesio/clickup", "hidden", FieldType::Checkbox).with_external_name("hidden"))
    }

    fn list() -> CollectionMetadata {
        CollectionMetadata::new("uesio/clickup", "list")
            .with_field(FieldMetadata::new("uesio/clickup", "name", FieldType::Text).with_external_name("name"))
    }

    fn task() -> CollectionMetadata {
        CollectionMetadata::new("uesio/clickup", "task")
            .with_field(FieldMetadata::new("uesio/clickup", "name", FieldType::Text).with_external_name("name"))
            .with_field(
                FieldMetadata::new("uesio/clickup", "list", FieldType::Reference)
                    .with_external_name("list")
                    .with_reference("uesio/clickup.list"),
            )
            .with_field(
                FieldMetadata::new("uesio/clickup", "due_date", FieldType::Timestamp)
                    .with_external_name("due_date"),
            )
            .with_field(FieldMetadata::new("uesio/clickup", "priority", FieldType::Text).with_external_name("priority"))
    }

    fn credentials() -> Credentials {
        Credentials::new(BASE).with(SPACE_ID_CREDENTIAL, "555")
    }

    fn adapter(transport: &MockTransport) -> ClickUpAdapter<&MockTransport> {
        ClickUpAdapter::new(transport, credentials())
    }

    #[tokio::test]
    async fn test_tasks_list_condition_routes_to_path() {
        let transport = MockTransport::new().with_json(
            200,
            json!({
                "tasks": [
                    {"id": "t1", "name": "Write docs", "list": {"id": "901", "name": "Backlog"}, "due_date": "1705314600000", "priority": "high"},
                    {"id": "t2", "name": "Ship", "list": {"id": "901", "name": "Backlog"}, "due_date": null, "priority": "low"}
                ],
                "last_page": true
            }),
        );
        let request = LoadRequest::new(task())
            .with_related(list())
            .with_condition(Condition::eq("uesio/clickup.list", json!({ID_FIELD: "901"})))
            .with_condition(Condition::field("uesio/clickup.due_date", Operator::Gt, json!(1705000000)))
            .with_condition(Condition::field("uesio/clickup.priority", Operator::NotEq, json!("low")));
        let mut sink = LoadResult::default();
        adapter(&transport).load_tasks(&request, &mut sink).await.unwrap();

        let sent = transport.last_request().unwrap();
        assert_eq!(sent.method, RequestMethod::Get);
        assert_eq!(
            sent.url,
            format!("{BASE}/list/901/task?archived=false&page=0&due_date_gt=1705000000000")
        );
        assert!(!sent.url.contains("list="));

        assert_eq!(sink.records.len(), 1);
        let first = &sink.records[0];
        assert_eq!(first[ID_FIELD], json!("t1"));
        assert_eq!(first["uesio/clickup.due_date"], json!(1705314600));
        assert_eq!(first["uesio/clickup.list"][ID_FIELD], json!("901"));
        assert!(!sink.has_more_records);
    }

    #[tokio::test]
    async fn test_tasks_without_list_condition_fails_before_request() {
        let transport = MockTransport::new();
        let request = LoadRequest::new(task()).with_condition(Condition::eq("uesio/clickup.name", json!("x")));
        let err = adapter(&transport)
            .load_tasks(&request, &mut LoadResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::MissingCondition(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_tasks_more_records_and_page_number() {
        let transport = MockTransport::new().with_json(200, json!({"tasks": [], "last_page": false}));
        let request = LoadRequest::new(task())
            .with_condition(Condition::eq("uesio/clickup.list", json!("77")))
            .with_batch(100, 3);
        let mut sink = LoadResult::default();
        adapter(&transport).load_tasks(&request, &mut sink).await.unwrap();

        assert!(transport.last_request().unwrap().url.ends_with("/list/77/task?archived=false&page=3"));
        assert!(sink.has_more_records);
    }

    #[tokio::test]
    async fn test_folders_filtered_client_side() {
        let transport = MockTransport::new().with_json(
            200,
            json!({"folders": [
                {"id": "f1", "name": "Marketing", "task_count": "4", "hidden": false, "space": {"id": "555"}},
                {"id": "f2", "name": "Sales", "task_count": "0", "hidden": true}
            ]}),
        );
        let request = LoadRequest::new(folder())
            .with_condition(Condition::field("uesio/clickup.hidden", Operator::NotEq, json!(true)));
        let mut sink = LoadResult::default();
        adapter(&transport).load_folders(&request, &mut sink).await.unwrap();

        assert_eq!(transport.last_request().unwrap().url, format!("{BASE}/space/555/folder?archived=false"));
        assert_eq!(sink.records.len(), 1);
        assert_eq!(sink.records[0][ID_FIELD], json!("f1"));
        assert_eq!(sink.records[0]["uesio/clickup.name"], json!("Marketing"));
        assert!(!sink.records[0].contains_key("space"));
    }

    #[tokio::test]
    async fn test_folders_require_space_credential() {
        let transport = MockTransport::new();
        let adapter = ClickUpAdapter::new(&transport, Credentials::new(BASE));
        let err = adapter
            .load_folders(&LoadRequest::new(folder()), &mut LoadResult::default())
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Config(_)));
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_folders_non_success_reports_status() {
        let transport = MockTransport::new().with_json(401, json!({"err": "Token invalid"}));
        let mut sink = LoadResult::default();
        adapter(&transport)
            .load_folders(&LoadRequest::new(folder()), &mut sink)
            .await
            .unwrap();
        assert_eq!(sink.errors, vec!["failed to fetch folders: 401 Unauthorized".to_string()]);
        assert!(sink.records.is_empty());
    }

    #[tokio::test]
    async fn test_save_folders_per_operation() {
        let transport = MockTransport::new()
            .with_json(200, json!({"id": "f9", "name": "New", "task_count": "0"}))
            .with_json(400, json!({"err": "Folder name taken", "ECODE": "FOLDER_002"}))
            .with_failure("connection reset");
        let mut request = SaveRequest::new(folder())
            .with_insert("tmp1", record([("uesio/clickup.name", json!("New")), ("uesio/clickup.task_count", json!(3))]))
            .with_update("f1", record([("uesio/clickup.name", json!("Renamed"))]))
            .with_delete("f2");
        adapter(&transport).save_folders(&mut request).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].method, RequestMethod::Post);
        assert_eq!(sent[0].url, format!("{BASE}/space/555/folder"));
        assert_eq!(sent[0].json_body(), Some(&json!({"name": "New"})));
        assert_eq!(sent[1].method, RequestMethod::Put);
        assert_eq!(sent[1].url, format!("{BASE}/folder/f1"));
        assert_eq!(sent[2].method, RequestMethod::Delete);
        assert_eq!(sent[2].url, format!("{BASE}/folder/f2"));

        let insert = &request.inserts[0];
        assert!(!insert.has_errors());
        assert_eq!(insert.get(ID_FIELD), Some(&json!("f9")));
        assert_eq!(request.updates[0].errors(), ["Folder name taken".to_string()]);
        assert_eq!(request.deletes[0].errors().len(), 1);
    }
}
