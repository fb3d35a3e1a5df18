use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, require_str};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::info;

const ADMIN_ID: &str = "admin01";
const ADMIN_NAME: &str = "Admin";

fn invalid(req: &Request, message: &str) -> serde_json::Value {
    err(&req.id, "invalid_credentials", message, None)
}

fn login_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let student_id = match require_str(req, "studentId") {
        Ok(v) => v.to_ascii_uppercase(),
        Err(resp) => return resp,
    };
    let password = req.params.get("password").and_then(|v| v.as_str());

    let student = match store.get_student_by_id(&student_id) {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    match student {
        Some(s) if password.is_some() && s.password.as_deref() == password => {
            info!(student_id = %s.id, "student signed in");
            ok(
                &req.id,
                json!({ "id": s.id, "role": "student", "name": s.name }),
            )
        }
        _ => invalid(req, "Invalid School ID or Password."),
    }
}

fn login_admin(state: &mut AppState, req: &Request) -> serde_json::Value {
    let email = req.params.get("email").and_then(|v| v.as_str()).map(str::trim);
    let password = req.params.get("password").and_then(|v| v.as_str());

    if email == Some(state.config.admin_email.as_str())
        && password == Some(state.config.admin_password.as_str())
    {
        info!("admin signed in");
        ok(
            &req.id,
            json!({ "id": ADMIN_ID, "role": "admin", "name": ADMIN_NAME }),
        )
    } else {
        invalid(req, "Invalid Admin Email or Password.")
    }
}

fn handle_auth_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    match req.params.get("role").and_then(|v| v.as_str()) {
        Some("student") => login_student(state, req),
        Some("admin") => login_admin(state, req),
        _ => err(
            &req.id,
            "bad_params",
            "role must be student or admin",
            None,
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.login" => Some(handle_auth_login(state, req)),
        _ => None,
    }
}
