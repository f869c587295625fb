//! Debug inspection of forwarded bodies.
//!
//! Everything here works on borrowed copies and only ever logs. Bodies that
//! are not JSON, not UTF-8, empty, or malformed are tolerated silently.

use axum::http::{HeaderMap, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;

/// Marker prefix of a server-sent-event data line.
pub const SSE_DATA_PREFIX: &str = "data: ";

/// A completion request split into its prompt, suffix and everything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptDump {
    /// The request object without `prompt` and `suffix`.
    pub fields: Map<String, Value>,
    pub prompt: String,
    pub suffix: String,
}

/// Split a completion request body, if it is a JSON object with a `prompt`.
pub fn prompt_dump(body: &[u8]) -> Option<PromptDump> {
    let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(body) else {
        return None;
    };
    if !fields.contains_key("prompt") {
        return None;
    }
    let prompt = fields.remove("prompt").map(text_of).unwrap_or_default();
    let suffix = fields.remove("suffix").map(text_of).unwrap_or_default();
    Some(PromptDump {
        fields,
        prompt,
        suffix,
    })
}

/// Strings as-is; other values (arrays of prompts, null) as compact JSON.
fn text_of(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Human-readable form of a response body.
///
/// Bodies containing `data: ` lines are rendered as a pretty JSON array with
/// one element per line: the parsed event for data lines (the raw line if it
/// does not parse) and the raw text for every other line.
pub fn render_response_body(body: &[u8]) -> String {
    let text = match std::str::from_utf8(body) {
        Ok(text) => text,
        Err(_) => return String::from_utf8_lossy(body).into_owned(),
    };

    let lines: Vec<&str> = text.split('\n').collect();
    if !lines.iter().any(|line| line.starts_with(SSE_DATA_PREFIX)) {
        return text.to_string();
    }

    let events: Vec<Value> = lines.into_iter().map(parse_event_line).collect();
    serde_json::to_string_pretty(&events).unwrap_or_else(|_| text.to_string())
}

fn parse_event_line(line: &str) -> Value {
    line.strip_prefix(SSE_DATA_PREFIX)
        .and_then(|data| serde_json::from_str(data).ok())
        .unwrap_or_else(|| Value::String(line.to_string()))
}

/// Log an inbound request body.
pub fn log_request(body: &[u8]) {
    let Some(dump) = prompt_dump(body) else {
        return;
    };
    let fields = serde_json::to_string_pretty(&dump.fields).unwrap_or_default();
    debug!(
        target: "switchyard::inspect",
        "Request fields:\n{fields}\n------\nPrompt:\n\n{}\n------\nSuffix:\n\n{}",
        dump.prompt,
        dump.suffix
    );
}

/// Log an upstream response.
pub fn log_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) {
    let header_map: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), Value::String(value))
        })
        .collect();
    let headers = serde_json::to_string_pretty(&header_map).unwrap_or_default();

    debug!(
        target: "switchyard::inspect",
        status = status.as_u16(),
        "Response headers:\n{headers}\nResponse body:\n{}",
        render_response_body(body)
    );
}
