use serde_json::json;

use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_undo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match engine.undo() {
        Ok(report) => ok(&req.id, json!({ "applied": report })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_redo(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match engine.redo() {
        Ok(report) => ok(&req.id, json!({ "applied": report })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_state(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(
        &req.id,
        json!({
            "canUndo": engine.can_undo(),
            "canRedo": engine.can_redo(),
            "undoDepth": engine.undo_depth(),
            "redoDepth": engine.redo_depth(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "history.undo" => Some(handle_undo(state, req)),
        "history.redo" => Some(handle_redo(state, req)),
        "history.state" => Some(handle_state(state, req)),
        _ => None,
    }
}
