//! Transport response: `{code, status, body}`.

use std::collections::HashMap;
use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::error::Result;

/// Response returned by a [`Transport`](crate::Transport).
///
/// The body is decoded as JSON when possible; anything else is kept as a
/// JSON string holding the raw text, and an empty body is `Null`.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub code: u16,
    /// Status line text (e.g. "200 OK").
    pub status: String,
    /// Response headers, names lowercased.
    pub headers: HashMap<String, String>,
    /// Decoded body.
    pub body: serde_json::Value,
}

impl HttpResponse {
    /// Create a response with a JSON body and the canonical status text.
    pub fn new(code: u16, body: serde_json::Value) -> Self {
        Self {
            code,
            status: canonical_status(code),
            headers: HashMap::new(),
            body,
        }
    }

    /// Create a response from raw body text.
    pub fn from_text(code: u16, text: &str) -> Self {
        Self::new(code, decode_body(text))
    }

    /// Add a header (name is lowercased).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_lowercase(), value.into());
        self
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Get a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Get the Retry-After header as a Duration.
    pub fn retry_after(&self) -> Option<Duration> {
        self.header("retry-after")?
            .parse::<u64>()
            .ok()
            .map(Duration::from_secs)
    }

    /// Deserialize the body into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.body.clone()).map_err(Into::into)
    }

    /// The body rendered as text: raw text bodies as-is, JSON re-serialized.
    pub fn body_text(&self) -> String {
        match &self.body {
            serde_json::Value::String(text) => text.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Best-effort human readable error message from the body.
    ///
    /// Tries the structured shapes the supported APIs return (`{"error": ..}`,
    /// `{"message": ..}`, `{"err": ..}`, `[{"errorCode": .., "message": ..}]`),
    /// including JSON that arrived as a text body, and falls back to the raw
    /// body text. The result is sanitized and truncated.
    pub fn error_message(&self) -> Option<String> {
        let structured = match &self.body {
            serde_json::Value::String(text) => serde_json::from_str::<serde_json::Value>(text)
                .ok()
                .and_then(|parsed| structured_message(&parsed)),
            other => structured_message(other),
        };
        let message = structured.unwrap_or_else(|| self.body_text());
        if message.is_empty() {
            None
        } else {
            Some(sanitize_error_message(&message))
        }
    }
}

fn structured_message(body: &serde_json::Value) -> Option<String> {
    match body {
        serde_json::Value::Object(map) => ["error", "message", "err"]
            .iter()
            .find_map(|key| map.get(*key))
            .map(|value| match value {
                serde_json::Value::String(s) => s.clone(),
                other => structured_message(other).unwrap_or_else(|| other.to_string()),
            }),
        serde_json::Value::Array(items) => items.first().and_then(|first| {
            let message = first.get("message")?.as_str()?;
            Some(match first.get("errorCode").and_then(|c| c.as_str()) {
                Some(code) => format!("{} - {}", code, message),
                None => message.to_string(),
            })
        }),
        _ => None,
    }
}

/// Decode raw body text into a JSON value, keeping non-JSON text as a string.
pub(crate) fn decode_body(text: &str) -> serde_json::Value {
    if text.trim().is_empty() {
        return serde_json::Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| serde_json::Value::String(text.to_string()))
}

pub(crate) fn canonical_status(code: u16) -> String {
    match reqwest::StatusCode::from_u16(code) {
        Ok(status) => status.to_string(),
        Err(_) => code.to_string(),
    }
}

/// Sanitize an error message to prevent exposing sensitive data.
///
/// This function:
/// - Truncates messages longer than 500 characters
/// - Removes potential tokens (anything that looks like an access token)
/// - Removes potential session IDs
fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();

    if let Ok(token_pattern) = regex_lite::Regex::new(r"00[A-Za-z0-9]{13,}[!][A-Za-z0-9_.]+") {
        sanitized = token_pattern
            .replace_all(&sanitized, "[REDACTED_TOKEN]")
            .to_string();
    }

    if let Ok(bearer_pattern) = regex_lite::Regex::new(r"(sk|pk|rk)_(live|test)_[A-Za-z0-9]{8,}") {
        sanitized = bearer_pattern
            .replace_all(&sanitized, "[REDACTED_KEY]")
            .to_string();
    }

    if let Ok(session_pattern) = regex_lite::Regex::new(r"sid=[A-Za-z0-9]{20,}") {
        sanitized = session_pattern
            .replace_all(&sanitized, "sid=[REDACTED]")
            .to_string();
    }

    if sanitized.len() > MAX_LENGTH {
        let mut cut = MAX_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
