use serde_json::json;
use std::path::PathBuf;

use crate::engine::Engine;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match Engine::open(&path) {
        Ok(engine) => {
            state.workspace = Some(path.clone());
            state.events = Some(engine.subscribe());
            state.engine = Some(engine);
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let loaded: Vec<&str> = engine
        .loaded_partitions()
        .into_iter()
        .map(|p| p.as_str())
        .collect();
    ok(
        &req.id,
        json!({
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "loadedPartitions": loaded,
            "undoDepth": engine.undo_depth(),
            "redoDepth": engine.redo_depth(),
            "canUndo": engine.can_undo(),
            "canRedo": engine.can_redo(),
            "pendingRepair": engine.repair_notice().is_some(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "status" => Some(handle_status(state, req)),
        _ => None,
    }
}
