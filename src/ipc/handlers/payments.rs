use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, param_str, parse_param, require_str};
use crate::ipc::types::{AppState, Request};
use crate::model::NewPayment;
use serde_json::json;

fn handle_payments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let payments = match param_str(req, "studentId") {
        Some(student_id) => store.get_payments_by_student_id(student_id),
        None => store.get_payments(),
    };
    match payments {
        Ok(payments) => ok(&req.id, json!({ "payments": payments })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_payments_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let new: NewPayment = match parse_param(req, "payment") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.record_payment(new) {
        Ok(payment) => ok(&req.id, json!({ "payment": payment })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_payments_sync_months(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let student_id = match require_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(months) = req.params.get("months").and_then(|v| v.as_array()) else {
        return err(&req.id, "bad_params", "missing months", None);
    };
    let mut names: Vec<&str> = Vec::with_capacity(months.len());
    for m in months {
        let Some(name) = m.as_str() else {
            return err(
                &req.id,
                "bad_params",
                "months must be an array of month names",
                Some(json!({ "value": m })),
            );
        };
        names.push(name);
    }

    match store.update_monthly_payments(student_id, names) {
        Ok(created) => ok(&req.id, json!({ "created": created })),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "payments.list" => Some(handle_payments_list(state, req)),
        "payments.record" => Some(handle_payments_record(state, req)),
        "payments.syncMonths" => Some(handle_payments_sync_months(state, req)),
        _ => None,
    }
}
