//! Normalized result of one control-panel call.
//!
//! UAPI answers either with a flat object or with the payload wrapped in a
//! `result` key depending on call and version. Both shapes collapse into
//! [`ApiResult`] here so nothing downstream has to care.

use serde_json::Value;

const UNKNOWN_API_ERROR: &str = "Unknown error from cPanel API";

/// Tagged outcome of a trigger call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// Connection, TLS or timeout failure before any HTTP status was seen
    TransportError(String),
    /// Non-200 HTTP status
    HttpError(u16),
    /// 200 with a body that is not a JSON object
    ProtocolError(String),
    /// Well-formed answer; `status == false` is a job-reported failure
    ApiResult(ApiResult),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub status: bool,
    pub pid: Option<String>,
    pub errors: Vec<String>,
    /// Body exactly as received
    pub raw: Value,
}

impl ApiResult {
    /// Errors joined for a status line, with a fallback when the panel gave none
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            UNKNOWN_API_ERROR.to_string()
        } else {
            self.errors.join("; ")
        }
    }
}

impl ApiOutcome {
    /// Classify a 200 response body
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(value @ Value::Object(_)) => ApiOutcome::ApiResult(normalize(value)),
            Ok(other) => ApiOutcome::ProtocolError(format!(
                "Invalid JSON response from cPanel API: expected an object, got {}",
                json_kind(&other)
            )),
            Err(e) => ApiOutcome::ProtocolError(format!(
                "Invalid JSON response from cPanel API: {}",
                e
            )),
        }
    }

    /// True only for a well-formed answer reporting success
    pub fn is_success(&self) -> bool {
        matches!(self, ApiOutcome::ApiResult(r) if r.status)
    }

    /// One-line description for logs and notifications
    pub fn describe(&self) -> String {
        match self {
            ApiOutcome::TransportError(msg) => format!("Transport error: {}", msg),
            ApiOutcome::HttpError(code) => format!("HTTP {} received from cPanel API", code),
            ApiOutcome::ProtocolError(msg) => msg.clone(),
            ApiOutcome::ApiResult(r) if r.status => format!(
                "Backup process initiated via API. PID: {}",
                r.pid.as_deref().unwrap_or("Unknown")
            ),
            ApiOutcome::ApiResult(r) => format!("API reported error: {}", r.error_summary()),
        }
    }

    /// Diagnostic payload for failure reports: the raw response when there is one
    pub fn diagnostic(&self) -> String {
        match self {
            ApiOutcome::ApiResult(r) => {
                let raw = serde_json::to_string_pretty(&r.raw).unwrap_or_else(|_| r.raw.to_string());
                format!("{}\n{}", self.describe(), raw)
            }
            _ => self.describe(),
        }
    }
}

/// Unwrap an optional `result` envelope and pull out status, pid and errors
pub fn normalize(response: Value) -> ApiResult {
    let payload = match response.get("result") {
        Some(inner @ Value::Object(_)) => inner,
        _ => &response,
    };

    let status = payload.get("status").map(truthy).unwrap_or(false);
    let pid = payload
        .get("data")
        .and_then(|d| d.get("pid"))
        .and_then(scalar_string);
    let errors = match payload.get("errors") {
        Some(Value::Array(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(single) => scalar_string(single).into_iter().collect(),
        None => Vec::new(),
    };

    ApiResult {
        status,
        pid,
        errors,
        raw: response,
    }
}

/// UAPI status is documented as 1/0 but also shows up as bool or string
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        _ => false,
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_of(outcome: ApiOutcome) -> ApiResult {
        match outcome {
            ApiOutcome::ApiResult(r) => r,
            other => panic!("expected ApiResult, got {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_success() {
        let r = result_of(ApiOutcome::from_body(
            r#"{"result":{"status":1,"data":{"pid":"123"},"errors":null}}"#,
        ));
        assert!(r.status);
        assert_eq!(r.pid.as_deref(), Some("123"));
        assert!(r.errors.is_empty());
    }

    #[test]
    fn test_flat_success_with_numeric_pid() {
        let r = normalize(json!({"status": true, "data": {"pid": 4711}}));
        assert!(r.status);
        assert_eq!(r.pid.as_deref(), Some("4711"));
    }

    #[test]
    fn test_flat_failure_with_errors() {
        let r = normalize(json!({"status": 0, "errors": ["Backup already running", "Try later"]}));
        assert!(!r.status);
        assert_eq!(r.errors, vec!["Backup already running", "Try later"]);
        assert_eq!(r.error_summary(), "Backup already running; Try later");
    }

    #[test]
    fn test_wrapped_failure_with_single_error_string() {
        let r = normalize(json!({"result": {"status": "0", "errors": "Access denied"}}));
        assert!(!r.status);
        assert_eq!(r.errors, vec!["Access denied"]);
    }

    #[test]
    fn test_missing_status_is_failure() {
        let r = normalize(json!({"result": {"data": {}}}));
        assert!(!r.status);
        assert_eq!(r.error_summary(), "Unknown error from cPanel API");
    }

    #[test]
    fn test_non_object_result_key_is_not_an_envelope() {
        let r = normalize(json!({"result": "ok", "status": 1}));
        assert!(r.status);
    }

    #[test]
    fn test_raw_body_is_preserved() {
        let body = json!({"result": {"status": 0, "errors": ["nope"], "metadata": {"x": 1}}});
        let r = normalize(body.clone());
        assert_eq!(r.raw, body);
    }

    #[test]
    fn test_malformed_body_is_protocol_error() {
        assert!(matches!(
            ApiOutcome::from_body("<html>Login</html>"),
            ApiOutcome::ProtocolError(_)
        ));
        assert!(matches!(ApiOutcome::from_body(""), ApiOutcome::ProtocolError(_)));
        assert!(matches!(
            ApiOutcome::from_body("[1,2,3]"),
            ApiOutcome::ProtocolError(msg) if msg.contains("an array")
        ));
    }

    #[test]
    fn test_describe_and_success() {
        let ok = ApiOutcome::from_body(r#"{"result":{"status":1,"data":{"pid":"123"}}}"#);
        assert!(ok.is_success());
        assert_eq!(ok.describe(), "Backup process initiated via API. PID: 123");

        let failed = ApiOutcome::from_body(r#"{"status":0}"#);
        assert!(!failed.is_success());
        assert_eq!(failed.describe(), "API reported error: Unknown error from cPanel API");

        assert!(!ApiOutcome::HttpError(403).is_success());
        assert_eq!(
            ApiOutcome::HttpError(403).describe(),
            "HTTP 403 received from cPanel API"
        );
    }

    #[test]
    fn test_diagnostic_embeds_raw_json() {
        let outcome = ApiOutcome::from_body(r#"{"status":0,"errors":["disk quota"]}"#);
        let diag = outcome.diagnostic();
        assert!(diag.starts_with("API reported error: disk quota"));
        assert!(diag.contains("\"errors\""));

        let transport = ApiOutcome::TransportError("connection refused".to_string());
        assert_eq!(transport.diagnostic(), "Transport error: connection refused");
    }
}
