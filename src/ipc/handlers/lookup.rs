use serde_json::json;

use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};

fn rename_params(req: &Request) -> Result<(String, String), serde_json::Value> {
    let old_name = match req.params.get("oldName").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return Err(err(&req.id, "bad_params", "missing oldName", None)),
    };
    let new_name = match req.params.get("newName").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return Err(err(&req.id, "bad_params", "missing newName", None)),
    };
    Ok((old_name, new_name))
}

fn handle_owner_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let owner_id = match req.params.get("ownerId").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing ownerId", None),
    };
    let new_name = match req.params.get("newName").and_then(|v| v.as_str()) {
        Some(v) => v.to_string(),
        None => return err(&req.id, "bad_params", "missing newName", None),
    };

    match engine.rename_owner(&owner_id, &new_name) {
        Ok(updated) => ok(&req.id, json!({ "updatedRows": updated })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_rename_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (old_name, new_name) = match rename_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.rename_teacher(&old_name, &new_name) {
        Ok(affected) => ok(&req.id, json!({ "affected": affected })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_rename_subject(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (old_name, new_name) = match rename_params(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match engine.rename_subject(&old_name, &new_name) {
        Ok(affected) => ok(&req.id, json!({ "affected": affected })),
        Err(e) => engine_err(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "owner.rename" => Some(handle_owner_rename(state, req)),
        "lookup.renameTeacher" => Some(handle_rename_teacher(state, req)),
        "lookup.renameSubject" => Some(handle_rename_subject(state, req)),
        _ => None,
    }
}
