use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, param_class_level, param_str, require_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{ClassFee, Payment, Student};
use crate::store::{FeeStore, KeyValueStorage, StoreError, StoreResult};
use crate::summary::{self, FeeStatus, StudentRecord};
use chrono::NaiveDate;
use serde_json::json;
use std::path::PathBuf;

struct Snapshot {
    students: Vec<Student>,
    payments: Vec<Payment>,
    fees: Vec<ClassFee>,
}

fn snapshot<S: KeyValueStorage>(store: &FeeStore<S>) -> StoreResult<Snapshot> {
    Ok(Snapshot {
        students: store.get_students()?,
        payments: store.get_payments()?,
        fees: store.get_fee_structures()?,
    })
}

fn param_status(req: &Request) -> Result<Option<FeeStatus>, serde_json::Value> {
    match param_str(req, "status") {
        None => Ok(None),
        Some(s) => FeeStatus::parse(s).map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "status must be one of Paid, Partial, Defaulter, Unpaid",
                Some(json!({ "status": s })),
            )
        }),
    }
}

fn param_date(req: &Request, key: &str) -> Result<NaiveDate, serde_json::Value> {
    let raw = require_str(req, key)?;
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be YYYY-MM-DD", key),
            Some(json!({ "value": raw })),
        )
    })
}

fn filtered_records(req: &Request, snap: &Snapshot) -> Result<Vec<StudentRecord>, serde_json::Value> {
    let status = param_status(req)?;
    let term = param_str(req, "term").unwrap_or("");
    let records = summary::student_records(&snap.students, &snap.payments, &snap.fees);
    Ok(summary::filter_records(records, term, status))
}

fn handle_reports_records(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let snap = match snapshot(store) {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    match filtered_records(req, &snap) {
        Ok(records) => ok(&req.id, json!({ "records": records })),
        Err(resp) => resp,
    }
}

fn handle_reports_monthly_breakdown(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let student_id = match require_str(req, "studentId") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let snap = match snapshot(store) {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let Some(student) = snap.students.iter().find(|s| s.id == student_id) else {
        return store_err(&req.id, &StoreError::StudentNotFound(student_id.to_string()));
    };
    let Some(months) = summary::monthly_breakdown(student, &snap.payments, &snap.fees) else {
        return store_err(&req.id, &StoreError::FeeStructureNotFound(student.class_level));
    };
    let record = summary::student_record(student, &snap.payments, &snap.fees);
    ok(
        &req.id,
        json!({
            "record": record,
            "months": months,
        }),
    )
}

fn handle_reports_dashboard(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    match snapshot(store) {
        Ok(snap) => ok(
            &req.id,
            json!(summary::dashboard(&snap.students, &snap.payments, &snap.fees)),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_reports_collection_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let start = match param_date(req, "startDate") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let end = match param_date(req, "endDate") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    if end < start {
        return err(&req.id, "bad_params", "endDate is before startDate", None);
    }
    match store.get_payments() {
        Ok(payments) => ok(
            &req.id,
            json!(summary::collection_summary(&payments, start, end)),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_reports_defaulters(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let class_level = match param_class_level(req, "classLevel") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match snapshot(store) {
        Ok(snap) => {
            let records =
                summary::defaulter_list(&snap.students, &snap.payments, &snap.fees, class_level);
            ok(&req.id, json!({ "records": records }))
        }
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_reports_export_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let snap = match snapshot(store) {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let records = match filtered_records(req, &snap) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let mut buf = Vec::new();
    if let Err(e) = summary::export_records_csv(&mut buf, &records) {
        return err(&req.id, "io_failed", e.to_string(), None);
    }
    let text = String::from_utf8_lossy(&buf).to_string();

    let Some(out_path) = param_str(req, "outPath") else {
        return ok(&req.id, json!({ "rows": records.len(), "csv": text }));
    };
    let out = PathBuf::from(out_path);
    if let Some(parent) = out.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": out_path })),
            );
        }
    }
    if let Err(e) = std::fs::write(&out, &buf) {
        return err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path })),
        );
    }
    ok(&req.id, json!({ "rows": records.len(), "path": out_path }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.records" => Some(handle_reports_records(state, req)),
        "reports.monthlyBreakdown" => Some(handle_reports_monthly_breakdown(state, req)),
        "reports.dashboard" => Some(handle_reports_dashboard(state, req)),
        "reports.collectionSummary" => Some(handle_reports_collection_summary(state, req)),
        "reports.defaulters" => Some(handle_reports_defaulters(state, req)),
        "reports.exportCsv" => Some(handle_reports_export_csv(state, req)),
        _ => None,
    }
}
