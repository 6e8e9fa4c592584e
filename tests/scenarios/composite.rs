//! Salesforce composite saves.

use saasbridge::core::testing::MockTransport;
use saasbridge::core::{record, CollectionMetadata, FieldMetadata, FieldType, SaveRequest};
use saasbridge::salesforce::SalesforceAdapter;
use serde_json::json;

use super::common::{init_tracing, salesforce_credentials};

fn account() -> CollectionMetadata {
    CollectionMetadata::new("luigi/foo", "account")
        .with_external_name("Account")
        .with_field(FieldMetadata::new("luigi/foo", "name", FieldType::Text).with_external_name("Name"))
        .with_field(
            FieldMetadata::new("luigi/foo", "created", FieldType::Timestamp)
                .with_external_name("CreatedDate")
                .read_only(),
        )
}

#[tokio::test]
async fn test_insert_without_writable_fields_keeps_follow_up_read() {
    init_tracing();
    let transport = MockTransport::new().with_json(
        200,
        json!({"compositeResponse": [
            {"referenceId": "insert_tmp1", "httpStatusCode": 201, "body": {"id": "001N", "success": true, "errors": []}},
            {"referenceId": "insertquery_tmp1", "httpStatusCode": 200, "body": {"attributes": {"type": "Account"}, "Id": "001N", "Name": "Auto"}}
        ]}),
    );
    let mut request = SaveRequest::new(account()).with_insert(
        "tmp1",
        record([("luigi/foo.created", json!(1705314600)), ("luigi/foo.unknown", json!("x"))]),
    );
    let adapter = SalesforceAdapter::new(&transport, salesforce_credentials());
    adapter.save(&mut request).await.expect("save should succeed");

    let sent = transport.last_request().expect("one request");
    let body = sent.json_body().expect("composite body");
    let subrequests = body["compositeRequest"].as_array().expect("subrequests");
    assert_eq!(subrequests.len(), 2);
    assert_eq!(subrequests[0]["method"], json!("POST"));
    assert_eq!(subrequests[0]["body"], json!({}));
    assert_eq!(subrequests[1]["method"], json!("GET"));
    assert_eq!(
        subrequests[1]["url"],
        json!("/services/data/v59.0/sobjects/Account/@{insert_tmp1.id}")
    );

    let insert = &request.inserts[0];
    assert!(!insert.has_errors());
    assert_eq!(insert.get("luigi/foo.name"), Some(&json!("Auto")));
}

#[tokio::test]
async fn test_failed_insert_carries_error_and_ignores_follow_up() {
    init_tracing();
    let transport = MockTransport::new().with_json(
        200,
        json!({"compositeResponse": [
            {"referenceId": "insertquery_tmp1", "httpStatusCode": 200, "body": {"Id": "001X", "Name": "Should not apply"}},
            {"referenceId": "insert_tmp1", "httpStatusCode": 400, "body": [
                {"errorCode": "REQUIRED_FIELD_MISSING", "message": "Required fields are missing: [Name]", "fields": ["Name"]}
            ]}
        ]}),
    );
    let mut request = SaveRequest::new(account())
        .with_insert("tmp1", record([("luigi/foo.name", json!(""))]));
    let adapter = SalesforceAdapter::new(&transport, salesforce_credentials());
    adapter.save(&mut request).await.expect("save should succeed");

    let insert = &request.inserts[0];
    assert_eq!(insert.errors().len(), 1);
    assert!(insert.errors()[0].contains("REQUIRED_FIELD_MISSING"));
    assert_eq!(insert.get("luigi/foo.name"), Some(&json!("")));
    assert!(insert.get("uesio/core.id").is_none());
    assert!(request.errors.is_empty());
}
