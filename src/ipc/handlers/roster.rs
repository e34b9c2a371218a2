use serde_json::json;

use crate::engine::PasteRow;
use crate::history::DeleteScope;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Partition;
use crate::ordering::SortKey;

fn parse_partition(req: &Request) -> Result<Partition, serde_json::Value> {
    let raw = match req.params.get("partition").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return Err(err(&req.id, "bad_params", "missing partition", None)),
    };
    Partition::parse(raw).map_err(|e| err(&req.id, e.code(), e.to_string(), None))
}

fn parse_record_ids(req: &Request) -> Result<Vec<String>, serde_json::Value> {
    let Some(arr) = req.params.get("recordIds").and_then(|v| v.as_array()) else {
        return Err(err(&req.id, "bad_params", "missing recordIds[]", None));
    };
    let mut ids = Vec::with_capacity(arr.len());
    for v in arr {
        match v.as_str() {
            Some(s) => ids.push(s.to_string()),
            None => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    "recordIds entries must be strings",
                    None,
                ))
            }
        }
    }
    Ok(ids)
}

fn handle_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match engine.load_partition(partition) {
        Ok(rows) => ok(
            &req.id,
            json!({
                "partition": partition.as_str(),
                "sortKey": engine.sort_key(partition).serialize(),
                "rows": rows,
            }),
        ),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_sort(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let raw = match req.params.get("sortKey").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing sortKey", None),
    };
    let key = match SortKey::parse(raw) {
        Ok(k) => k,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };

    match engine.sort_partition(partition, key) {
        Ok(()) => ok(
            &req.id,
            json!({ "partition": partition.as_str(), "sortKey": key.serialize() }),
        ),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_delete_rows(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let record_ids = match parse_record_ids(req) {
        Ok(ids) => ids,
        Err(resp) => return resp,
    };
    let scope_raw = match req.params.get("scope").and_then(|v| v.as_str()) {
        Some(v) => v,
        None => return err(&req.id, "bad_params", "missing scope", None),
    };
    let scope = match DeleteScope::parse(scope_raw) {
        Ok(s) => s,
        Err(e) => return err(&req.id, e.code(), e.to_string(), None),
    };

    match engine.delete_rows(partition, &record_ids, scope) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_paste(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(rows_value) = req.params.get("rows") else {
        return err(&req.id, "bad_params", "missing rows[]", None);
    };
    let rows: Vec<PasteRow> = match serde_json::from_value(rows_value.clone()) {
        Ok(rows) => rows,
        Err(e) => return err(&req.id, "bad_params", e.to_string(), None),
    };

    match engine.paste_rows(partition, rows) {
        Ok(records) => ok(&req.id, json!({ "inserted": records })),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_promote(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let Some(arr) = req.params.get("ownerIds").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing ownerIds[]", None);
    };
    let owner_ids: Vec<String> = arr
        .iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect();
    if owner_ids.len() != arr.len() {
        return err(&req.id, "bad_params", "ownerIds entries must be strings", None);
    }

    match engine.promote_owners(partition, &owner_ids) {
        Ok(moved) => ok(
            &req.id,
            json!({
                "moved": moved,
                "to": partition.next().map(|p| p.as_str()),
            }),
        ),
        Err(e) => engine_err(&req.id, e),
    }
}

fn handle_pending_reload(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(engine) = state.engine.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let partition = match parse_partition(req) {
        Ok(p) => p,
        Err(resp) => return resp,
    };
    let record_ids = engine.take_pending_reload(partition);
    ok(&req.id, json!({ "recordIds": record_ids }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.load" => Some(handle_load(state, req)),
        "roster.sort" => Some(handle_sort(state, req)),
        "roster.deleteRows" => Some(handle_delete_rows(state, req)),
        "roster.paste" => Some(handle_paste(state, req)),
        "roster.promote" => Some(handle_promote(state, req)),
        "roster.pendingReload" => Some(handle_pending_reload(state, req)),
        _ => None,
    }
}
