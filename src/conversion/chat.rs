//! Chat completion request inspection
//!
//! The request body is forwarded verbatim; the proxy only reads the fields it
//! needs to pick a forwarding mode and to log.

use serde_json::Value;

/// Whether the caller asked for a streamed response
///
/// Only a literal `true` selects streaming.
pub fn wants_stream(request: &Value) -> bool {
    request
        .get("stream")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Model name for log lines, if the caller sent one
pub fn requested_model(request: &Value) -> Option<&str> {
    request.get("model").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_flag() {
        assert!(wants_stream(&json!({"model": "m", "stream": true})));
        assert!(!wants_stream(&json!({"model": "m", "stream": false})));
        assert!(!wants_stream(&json!({"model": "m"})));
        assert!(!wants_stream(&json!({"stream": null})));
        assert!(!wants_stream(&json!({"stream": "true"})));
    }

    #[test]
    fn test_requested_model() {
        assert_eq!(requested_model(&json!({"model": "gpt-4o"})), Some("gpt-4o"));
        assert_eq!(requested_model(&json!([1, 2])), None);
    }
}
