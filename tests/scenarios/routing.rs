//! Foreign key routing for REST-filter integrations.

use saasbridge::core::testing::MockTransport;
use saasbridge::core::{
    CollectionMetadata, Condition, FieldMappingTable, FieldMetadata, FieldType, LoadRequest,
    LoadResult, ID_FIELD,
};
use saasbridge::clickup::{clickup_dialect, ClickUpAdapter, RestFilterCompiler};
use saasbridge::client::Credentials;
use serde_json::json;

use super::common::{init_tracing, CLICKUP_BASE};

fn tasks() -> CollectionMetadata {
    CollectionMetadata::new("uesio/clickup", "task")
        .with_field(FieldMetadata::new("uesio/clickup", "name", FieldType::Text).with_external_name("name"))
        .with_field(
            FieldMetadata::new("uesio/clickup", "list", FieldType::Reference)
                .with_external_name("list")
                .with_reference("uesio/clickup.list"),
        )
}

#[test]
fn test_reference_equality_compiles_to_path_segment() {
    let collection = tasks();
    let table = FieldMappingTable::build(&collection, &clickup_dialect());
    let filter = RestFilterCompiler::new(&collection, &table)
        .with_path_field("uesio/clickup.list")
        .compile(&[Condition::eq("uesio/clickup.list", json!({ID_FIELD: "901234"}))]);

    assert_eq!(filter.path_id.as_deref(), Some("901234"));
    assert!(filter.params.is_empty());
    assert!(filter.residual.is_empty());
}

#[tokio::test]
async fn test_reference_equality_lands_in_request_path() {
    init_tracing();
    let transport = MockTransport::new().with_json(
        200,
        json!({"tasks": [{"id": "abc1", "name": "Triage", "list": {"id": "901234"}}], "last_page": true}),
    );
    let adapter = ClickUpAdapter::new(&transport, Credentials::new(CLICKUP_BASE));
    let request = LoadRequest::new(tasks())
        .with_condition(Condition::eq("uesio/clickup.list", json!("901234")));
    let mut sink = LoadResult::default();
    adapter.load_tasks(&request, &mut sink).await.expect("load should succeed");

    let url = transport.last_request().expect("one request").url;
    assert!(url.starts_with(&format!("{CLICKUP_BASE}/list/901234/task?")), "{url}");
    assert!(!url.contains("list="), "foreign key must not be a filter parameter: {url}");
    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0]["uesio/clickup.list"][ID_FIELD], json!("901234"));
}
