use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

/// Drains the IPC client's bus subscription. Events arrive in publish
/// order for this subscriber; other subscribers drain independently.
fn handle_drain(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(events) = state.events.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let drained: Vec<serde_json::Value> = events
        .try_iter()
        .map(|e| serde_json::to_value(&e).unwrap_or_else(|_| json!({ "kind": "unserializable" })))
        .collect();
    ok(&req.id, json!({ "events": drained }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "events.drain" => Some(handle_drain(state, req)),
        _ => None,
    }
}
