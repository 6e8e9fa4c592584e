//! Recording transport for adapter tests.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

use saasbridge_client::{Error, ErrorKind, HttpRequest, HttpResponse, Result, Transport};

/// Transport that replays canned responses in order and records every
/// request it receives. An exhausted queue yields a connection error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn with_response(self, response: HttpResponse) -> Self {
        self.push(Ok(response));
        self
    }

    /// Queue a JSON response.
    pub fn with_json(self, code: u16, body: serde_json::Value) -> Self {
        self.with_response(HttpResponse::new(code, body))
    }

    /// Queue a transport failure.
    pub fn with_failure(self, message: &str) -> Self {
        self.push(Err(Error::new(ErrorKind::Connection(message.to_string()))));
        self
    }

    fn push(&self, response: Result<HttpResponse>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(response);
        }
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests().pop()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn respond(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or_else(|| {
                Err(Error::new(ErrorKind::Connection(
                    "no canned response left".to_string(),
                )))
            })
    }
}

impl Transport for MockTransport {
    fn request(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send {
        let response = self.respond(request);
        async move { response }
    }
}
