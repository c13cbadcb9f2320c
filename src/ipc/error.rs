use crate::error::{PortalError, PortalResult};
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Turns a handler outcome into the response envelope.
pub fn respond(id: &str, method: &str, outcome: PortalResult<serde_json::Value>) -> serde_json::Value {
    match outcome {
        Ok(result) => ok(id, result),
        Err(e) => {
            match &e {
                PortalError::Storage(cause) => {
                    tracing::error!(request = id, method, error = %format!("{cause:#}"), "storage failure")
                }
                other => tracing::debug!(request = id, method, code = other.code(), "request rejected"),
            }
            err(id, e.code(), e.public_message(), None)
        }
    }
}
