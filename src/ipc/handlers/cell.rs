use serde_json::json;

use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Field, Partition};

fn handle_edit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let record_id = match req.params.get("recordId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing recordId", None),
    };
    let partition_raw = match req.params.get("partition").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing partition", None),
    };
    let partition = match Partition::parse(partition_raw) {
        Ok(p) => p,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };
    let field_raw = match req.params.get("field").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing field", None),
    };
    let field = match Field::parse(field_raw) {
        Ok(f) => f,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };
    let value = match req.params.get("value").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing value", None),
    };

    match engine.record_edit(&record_id, partition, field, &value) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => engine_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "cell.edit" => Some(handle_edit(state, req)),
        _ => None,
    }
}
