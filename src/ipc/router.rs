use super::handlers;
use super::types::{AppState, Request};
use crate::ipc::error::err;
use tracing::debug;

pub fn handle_request(state: &mut AppState, req: Request) -> serde_json::Value {
    state.changed.borrow_mut().clear();
    let mut resp = dispatch(state, &req);

    let mut changed: Vec<&'static str> = Vec::new();
    for key in state.changed.borrow_mut().drain(..) {
        if !changed.contains(&key.as_str()) {
            changed.push(key.as_str());
        }
    }
    let succeeded = resp.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
    if succeeded && !changed.is_empty() {
        resp["changed"] = serde_json::json!(changed);
    }
    debug!(id = %req.id, method = %req.method, ok = succeeded, "request handled");
    resp
}

fn dispatch(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Some(resp) = handlers::core::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::students::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::payments::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::fees::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::reports::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::auth::try_handle(state, req) {
        return resp;
    }
    if let Some(resp) = handlers::backup::try_handle(state, req) {
        return resp;
    }

    err(
        &req.id,
        "not_implemented",
        format!("unknown method: {}", req.method),
        None,
    )
}
