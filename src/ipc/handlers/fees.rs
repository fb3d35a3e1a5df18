use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, param_class_level, parse_param};
use crate::ipc::types::{AppState, Request};
use crate::model::ClassFee;
use serde_json::json;

fn handle_fees_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    match store.get_fee_structures() {
        Ok(fees) => ok(&req.id, json!({ "fees": fees })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_fees_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let class_level = match param_class_level(req, "classLevel") {
        Ok(Some(v)) => v,
        Ok(None) => return err(&req.id, "bad_params", "missing classLevel", None),
        Err(resp) => return resp,
    };
    match store.get_fee_structure(class_level) {
        Ok(fee) => ok(&req.id, json!({ "fee": fee })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_fees_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let fees: Vec<ClassFee> = match parse_param(req, "fees") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let count = fees.len();
    match store.update_fee_structure(fees) {
        Ok(()) => ok(&req.id, json!({ "count": count })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "fees.list" => Some(handle_fees_list(state, req)),
        "fees.get" => Some(handle_fees_get(state, req)),
        "fees.update" => Some(handle_fees_update(state, req)),
        _ => None,
    }
}
