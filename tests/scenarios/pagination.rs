//! Lookahead pagination through the Smartsheet rows loader.

use saasbridge::client::Credentials;
use saasbridge::core::testing::MockTransport;
use saasbridge::core::{CollectionMetadata, FieldMetadata, FieldType, LoadRequest};
use saasbridge::smartsheet::SmartsheetAdapter;
use serde_json::{json, Value};

use super::common::{init_tracing, CountingSink};

fn sheet() -> CollectionMetadata {
    CollectionMetadata::new("luigi/foo", "tasks")
        .with_external_name("somesheetid")
        .with_field(FieldMetadata::new("luigi/foo", "name", FieldType::Text).with_external_name("taskname"))
}

fn two_rows() -> Value {
    json!({"rows": [
        {"id": 1, "cells": [{"columnId": "taskname", "value": "Test"}]},
        {"id": 2, "cells": [{"columnId": "taskname", "value": "Another test"}]}
    ]})
}

async fn load(batch_size: usize) -> (MockTransport, CountingSink) {
    init_tracing();
    let transport = MockTransport::new().with_json(200, two_rows());
    let mut sink = CountingSink::default();
    let adapter = SmartsheetAdapter::new(&transport, Credentials::default());
    adapter
        .load_rows(&LoadRequest::new(sheet()).with_batch(batch_size, 0), None, &mut sink)
        .await
        .expect("load should succeed");
    (transport, sink)
}

#[tokio::test]
async fn test_batch_of_one_emits_one_and_signals_more_once() {
    let (transport, sink) = load(1).await;

    let url = transport.last_request().expect("one request").url;
    assert!(url.contains("pageSize=2"), "lookahead page size in {url}");
    assert_eq!(sink.records.len(), 1);
    assert_eq!(sink.records[0]["luigi/foo.name"], json!("Test"));
    assert_eq!(sink.more_calls, 1);
    assert!(sink.errors.is_empty());
}

#[tokio::test]
async fn test_short_page_never_signals_more() {
    let (transport, sink) = load(10).await;

    assert!(transport.last_request().expect("one request").url.contains("pageSize=11"));
    assert_eq!(sink.records.len(), 2);
    assert_eq!(sink.more_calls, 0);
}
