use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, require_str};
use crate::ipc::types::{AppState, Request};
use crate::store::{CollectionKey, KeyValueStorage};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let collections: Vec<&str> = match state.store.as_ref() {
        Some(store) => CollectionKey::ALL
            .into_iter()
            .filter(|k| store.storage().contains(k.as_str()).unwrap_or(false))
            .map(|k| k.as_str())
            .collect(),
        None => Vec::new(),
    };
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "storeOpen": state.store.is_some(),
            "collections": collections,
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match require_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(resp) => return resp,
    };

    match state.open_workspace(&path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(
            &req.id,
            "db_open_failed",
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        ),
    }
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    let closed = state.close_workspace();
    ok(&req.id, json!({ "closed": closed }))
}

fn handle_store_initialize(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    match store.initialize() {
        Ok(report) => ok(&req.id, json!({ "seeded": report })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        "store.initialize" => Some(handle_store_initialize(state, req)),
        _ => None,
    }
}
