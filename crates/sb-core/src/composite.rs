//! Composite write batching.
//!
//! Inserts, updates and deletes are packed into one atomic request. Every
//! write that produces a record is paired with a follow-up read so the
//! post-save values come back in the same round trip. Results are matched
//! to operations by reference id, never by position.

use std::collections::{HashMap, HashSet};

use saasbridge_client::security::url::encode_param;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::record::Record;
use crate::request::{ChangeOperation, SaveRequest};

/// A composite request containing multiple subrequests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    #[serde(rename = "collateSubrequests", skip_serializing_if = "Option::is_none")]
    pub collate_subrequests: Option<bool>,
    #[serde(rename = "compositeRequest")]
    pub subrequests: Vec<CompositeSubrequest>,
}

/// A single subrequest within a composite request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSubrequest {
    pub method: String,
    pub url: String,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

/// Response from a composite request.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeResponse {
    #[serde(rename = "compositeResponse")]
    pub responses: Vec<CompositeSubresponse>,
}

/// Response from a single subrequest.
#[derive(Debug, Clone, Deserialize)]
pub struct CompositeSubresponse {
    #[serde(default)]
    pub body: Value,
    #[serde(rename = "httpHeaders", default)]
    pub http_headers: Value,
    #[serde(rename = "httpStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

/// What a subrequest does, which fixes its reference id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Delete,
    Insert,
    InsertQuery,
    Update,
    UpdateQuery,
}

impl RefKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            RefKind::Delete => "delete_",
            RefKind::Insert => "insert_",
            RefKind::InsertQuery => "insertquery_",
            RefKind::Update => "update_",
            RefKind::UpdateQuery => "updatequery_",
        }
    }

    /// Reference id for the operation correlated by `id`.
    pub fn reference_id(&self, id: &str) -> String {
        sanitize_reference_id(&format!("{}{}", self.prefix(), id))
    }
}

/// Strip every character outside `[A-Za-z0-9_]`.
pub fn sanitize_reference_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Accumulates subrequests against one resource path.
#[derive(Debug, Clone)]
pub struct CompositeBatch {
    resource: String,
    subrequests: Vec<CompositeSubrequest>,
    seen: HashSet<String>,
    collisions: Vec<String>,
}

impl CompositeBatch {
    /// `resource` is the collection path subrequest URLs are built on, e.g.
    /// `/services/data/v59.0/sobjects/Account`.
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            subrequests: Vec::new(),
            seen: HashSet::new(),
            collisions: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subrequests.is_empty()
    }

    pub fn subrequests(&self) -> &[CompositeSubrequest] {
        &self.subrequests
    }

    /// Reference ids used by more than one subrequest. Results for these
    /// cannot be told apart, so a batch with any must not be sent.
    pub fn collisions(&self) -> &[String] {
        &self.collisions
    }

    fn push(&mut self, method: &str, url: String, reference_id: String, body: Option<Value>) {
        if !self.seen.insert(reference_id.clone()) {
            warn!(reference_id = %reference_id, "Duplicate composite reference id");
            self.collisions.push(reference_id.clone());
        }
        self.subrequests.push(CompositeSubrequest {
            method: method.to_string(),
            url,
            reference_id,
            body,
        });
    }

    /// `DELETE resource/id`.
    pub fn add_delete(&mut self, id: &str) {
        let url = format!("{}/{}", self.resource, encode_param(id));
        self.push("DELETE", url, RefKind::Delete.reference_id(id), None);
    }

    /// `POST resource` plus a read of the created record through the
    /// insert's result reference.
    pub fn add_insert(&mut self, id: &str, body: Record) {
        let insert_ref = RefKind::Insert.reference_id(id);
        let query_url = format!("{}/@{{{}.id}}", self.resource, insert_ref);
        self.push("POST", self.resource.clone(), insert_ref, Some(Value::Object(body)));
        self.push("GET", query_url, RefKind::InsertQuery.reference_id(id), None);
    }

    /// `PATCH resource/id` plus a read of the same fields. An update with
    /// no writable fields reads the whole record back.
    pub fn add_update(&mut self, id: &str, body: Record) {
        let url = format!("{}/{}", self.resource, encode_param(id));
        let query_url = if body.is_empty() {
            url.clone()
        } else {
            let fields = body.keys().map(String::as_str).collect::<Vec<_>>().join(",");
            format!("{url}?fields={fields}")
        };
        self.push("PATCH", url, RefKind::Update.reference_id(id), Some(Value::Object(body)));
        self.push("GET", query_url, RefKind::UpdateQuery.reference_id(id), None);
    }

    /// Finish the batch as an all-or-none request.
    pub fn into_request(self) -> CompositeRequest {
        CompositeRequest {
            all_or_none: true,
            collate_subrequests: None,
            subrequests: self.subrequests,
        }
    }
}

/// Subresponses indexed by reference id.
#[derive(Debug, Clone, Default)]
pub struct CompositeResults {
    by_ref: HashMap<String, CompositeSubresponse>,
}

impl From<CompositeResponse> for CompositeResults {
    fn from(response: CompositeResponse) -> Self {
        let by_ref = response
            .responses
            .into_iter()
            .map(|sub| (sub.reference_id.clone(), sub))
            .collect();
        Self { by_ref }
    }
}

impl CompositeResults {
    pub fn get(&self, kind: RefKind, id: &str) -> Option<&CompositeSubresponse> {
        self.by_ref.get(&kind.reference_id(id))
    }

    pub fn len(&self) -> usize {
        self.by_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_ref.is_empty()
    }

    /// Write per-operation outcomes onto `request`.
    ///
    /// Deletes succeed on 204, inserts on 201, updates on 204. A failed
    /// write gets its raw error body attached and its follow-up read is not
    /// applied. For successful writes the follow-up read, coerced with
    /// `coerce`, is merged onto the operation's record. A missing write
    /// result counts as success.
    pub fn apply(&self, request: &mut SaveRequest, mut coerce: impl FnMut(&Record) -> Record) {
        for op in &mut request.deletes {
            self.check(op, RefKind::Delete, 204);
        }
        for op in &mut request.inserts {
            if self.check(op, RefKind::Insert, 201) {
                self.merge_query(op, RefKind::InsertQuery, &mut coerce);
            }
        }
        for op in &mut request.updates {
            if self.check(op, RefKind::Update, 204) {
                self.merge_query(op, RefKind::UpdateQuery, &mut coerce);
            }
        }
    }

    fn check(&self, op: &mut ChangeOperation, kind: RefKind, expected: u16) -> bool {
        match self.get(kind, op.id()) {
            Some(result) if result.http_status_code != expected => {
                debug!(
                    reference_id = %result.reference_id,
                    status = result.http_status_code,
                    "Subrequest failed"
                );
                op.add_error(result.body.to_string());
                false
            }
            Some(_) => true,
            None => {
                warn!(id = op.id(), prefix = kind.prefix(), "No result for subrequest, assuming success");
                true
            }
        }
    }

    fn merge_query(
        &self,
        op: &mut ChangeOperation,
        kind: RefKind,
        coerce: &mut impl FnMut(&Record) -> Record,
    ) {
        let Some(result) = self.get(kind, op.id()) else {
            return;
        };
        match &result.body {
            Value::Object(body) => op.set_all(coerce(body)),
            other => warn!(
                reference_id = %result.reference_id,
                status = result.http_status_code,
                body = %other,
                "Follow-up read returned no record"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::CollectionMetadata;
    use crate::record::record;
    use serde_json::json;

    const RESOURCE: &str = "/services/data/v59.0/sobjects/Account";

    #[test]
    fn test_sanitize_reference_id() {
        assert_eq!(sanitize_reference_id("insert_tmp-1.a b"), "insert_tmp1ab");
        assert_eq!(RefKind::UpdateQuery.reference_id("001/xyz"), "updatequery_001xyz");
    }

    #[test]
    fn test_batch_shape() {
        let mut batch = CompositeBatch::new(RESOURCE);
        batch.add_delete("001D");
        batch.add_insert("tmp-1", record([("Name", json!("Acme"))]));
        batch.add_update("001U", record([("Name", json!("Acme 2")), ("Type", json!("Customer"))]));

        let request = batch.into_request();
        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(
            wire,
            json!({
                "allOrNone": true,
                "compositeRequest": [
                    {"method": "DELETE", "url": format!("{RESOURCE}/001D"), "referenceId": "delete_001D"},
                    {"method": "POST", "url": RESOURCE, "referenceId": "insert_tmp1", "body": {"Name": "Acme"}},
                    {"method": "GET", "url": format!("{RESOURCE}/@{{insert_tmp1.id}}"), "referenceId": "insertquery_tmp1"},
                    {"method": "PATCH", "url": format!("{RESOURCE}/001U"), "referenceId": "update_001U", "body": {"Name": "Acme 2", "Type": "Customer"}},
                    {"method": "GET", "url": format!("{RESOURCE}/001U?fields=Name,Type"), "referenceId": "updatequery_001U"}
                ]
            })
        );
    }

    #[test]
    fn test_sanitized_ids_that_collide_are_reported() {
        let mut batch = CompositeBatch::new(RESOURCE);
        batch.add_insert("tmp1", record([("Name", json!("A"))]));
        assert!(batch.collisions().is_empty());

        batch.add_insert("tmp-1", record([("Name", json!("B"))]));
        assert_eq!(batch.collisions(), ["insert_tmp1", "insertquery_tmp1"]);
        assert_eq!(batch.subrequests().len(), 4);
    }

    #[test]
    fn test_same_id_across_kinds_does_not_collide() {
        let mut batch = CompositeBatch::new(RESOURCE);
        batch.add_delete("001X");
        batch.add_update("001X", record([("Name", json!("A"))]));
        assert!(batch.collisions().is_empty());
    }

    #[test]
    fn test_empty_insert_keeps_follow_up_read() {
        let mut batch = CompositeBatch::new(RESOURCE);
        batch.add_insert("t1", Record::new());
        let subrequests = batch.subrequests();
        assert_eq!(subrequests.len(), 2);
        assert_eq!(subrequests[0].body, Some(json!({})));
        assert_eq!(subrequests[1].method, "GET");
    }

    #[test]
    fn test_empty_update_reads_whole_record() {
        let mut batch = CompositeBatch::new(RESOURCE);
        batch.add_update("001U", Record::new());
        assert_eq!(batch.subrequests()[1].url, format!("{RESOURCE}/001U"));
    }

    fn results(body: Value) -> CompositeResults {
        serde_json::from_value::<CompositeResponse>(body).unwrap().into()
    }

    #[test]
    fn test_apply_demultiplexes_by_reference_id() {
        let mut request = SaveRequest::new(CollectionMetadata::new("luigi/foo", "account"))
            .with_insert("t1", record([("luigi/foo.name", json!("Acme"))]))
            .with_update("001U", record([("luigi/foo.name", json!("Acme 2"))]))
            .with_delete("001D");

        // Deliberately out of order.
        let results = results(json!({"compositeResponse": [
            {"referenceId": "updatequery_001U", "httpStatusCode": 200, "body": {"Name": "Acme 2", "Id": "001U"}},
            {"referenceId": "insertquery_t1", "httpStatusCode": 200, "body": {"Name": "Acme", "Id": "001N"}},
            {"referenceId": "delete_001D", "httpStatusCode": 404, "body": [{"errorCode": "NOT_FOUND"}]},
            {"referenceId": "insert_t1", "httpStatusCode": 201, "body": {"id": "001N", "success": true}},
            {"referenceId": "update_001U", "httpStatusCode": 204, "body": null}
        ]}));
        assert_eq!(results.len(), 5);

        results.apply(&mut request, |r| {
            record([("uesio/core.id", r["Id"].clone()), ("echo", json!(true))])
        });

        assert_eq!(request.deletes[0].errors(), [r#"[{"errorCode":"NOT_FOUND"}]"#.to_string()]);
        assert_eq!(request.inserts[0].get("uesio/core.id"), Some(&json!("001N")));
        assert_eq!(request.inserts[0].get("luigi/foo.name"), Some(&json!("Acme")));
        assert_eq!(request.updates[0].get("echo"), Some(&json!(true)));
        assert!(!request.updates[0].has_errors());
    }

    #[test]
    fn test_failed_insert_skips_follow_up_read() {
        let mut request = SaveRequest::new(CollectionMetadata::new("luigi/foo", "account"))
            .with_insert("t1", record([("luigi/foo.name", json!("Acme"))]));

        let results = results(json!({"compositeResponse": [
            {"referenceId": "insert_t1", "httpStatusCode": 400, "body": [{"message": "Required fields are missing"}]},
            {"referenceId": "insertquery_t1", "httpStatusCode": 400, "body": [{"message": "rolled back"}]}
        ]}));
        results.apply(&mut request, |_| record([("applied", json!(true))]));

        let insert = &request.inserts[0];
        assert_eq!(insert.errors().len(), 1);
        assert!(insert.errors()[0].contains("Required fields are missing"));
        assert!(insert.get("applied").is_none());
    }

    #[test]
    fn test_missing_result_counts_as_success() {
        let mut request = SaveRequest::new(CollectionMetadata::new("luigi/foo", "account"))
            .with_delete("001D")
            .with_update("001U", Record::new());
        results(json!({"compositeResponse": []})).apply(&mut request, |r| r.clone());
        assert!(!request.deletes[0].has_errors());
        assert!(!request.updates[0].has_errors());
    }
}
