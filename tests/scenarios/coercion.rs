//! Unmapped external fields on load.

use saasbridge::core::testing::MockTransport;
use saasbridge::core::{
    CollectionMetadata, FieldMetadata, FieldRequest, FieldType, LoadRequest, LoadResult, ID_FIELD,
};
use saasbridge::salesforce::SalesforceAdapter;
use serde_json::json;

use super::common::{init_tracing, salesforce_credentials};

#[tokio::test]
async fn test_unmapped_external_field_is_dropped() {
    init_tracing();
    let account = CollectionMetadata::new("luigi/foo", "account")
        .with_external_name("Account")
        .with_field(FieldMetadata::new("luigi/foo", "name", FieldType::Text).with_external_name("Name"));
    let transport = MockTransport::new().with_json(
        200,
        json!({"totalSize": 1, "done": true, "records": [{
            "attributes": {"type": "Account", "url": "/services/data/v59.0/sobjects/Account/001A"},
            "Id": "001A",
            "Name": "Acme",
            "Secret__c": "do not surface"
        }]}),
    );
    let adapter = SalesforceAdapter::new(&transport, salesforce_credentials());
    let request = LoadRequest::new(account).with_fields(vec![FieldRequest::new("luigi/foo.name")]);
    let mut sink = LoadResult::default();
    adapter.load(&request, &mut sink).await.expect("load should succeed");

    assert!(sink.errors.is_empty());
    assert_eq!(sink.records.len(), 1);
    let record = &sink.records[0];
    assert_eq!(record.len(), 2);
    assert_eq!(record[ID_FIELD], json!("001A"));
    assert_eq!(record["luigi/foo.name"], json!("Acme"));
    assert!(record.values().all(|v| v != &json!("do not surface")));
}
