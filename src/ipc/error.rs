use serde_json::json;

use crate::error::CoreError;

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

/// Maps engine failures onto stable IPC codes; typed core errors keep
/// their own codes, anything else is an internal failure.
pub fn engine_err(id: &str, e: anyhow::Error) -> serde_json::Value {
    match e.downcast_ref::<CoreError>() {
        Some(core) => err(id, core.code(), core.to_string(), None),
        None => err(id, "internal", e.to_string(), None),
    }
}
