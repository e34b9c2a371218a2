use serde_json::json;

use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

fn handle_notice(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, json!({ "notice": engine.repair_notice() }))
}

fn handle_acknowledge(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match engine.acknowledge_repair() {
        Ok(reloaded) => {
            let reloaded: Vec<&str> = reloaded.into_iter().map(|p| p.as_str()).collect();
            ok(&req.id, json!({ "reloaded": reloaded }))
        }
        Err(e) => engine_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "repair.notice" => Some(handle_notice(state, req)),
        "repair.acknowledge" => Some(handle_acknowledge(state, req)),
        _ => None,
    }
}
