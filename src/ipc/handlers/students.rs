use crate::ipc::error::{ok, store_err};
use crate::ipc::helpers::{no_workspace, param_class_level, param_str, parse_param, require_str};
use crate::ipc::types::{AppState, Request};
use crate::model::{NewStudent, Student};
use crate::summary;
use serde_json::json;

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    match store.get_students() {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let id = match require_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.get_student_by_id(id) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let new: NewStudent = match parse_param(req, "student") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.add_student(new) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let mut student: Student = match parse_param(req, "student") {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    // Omitted password keeps the current one.
    if student.password.is_none() {
        match store.get_student_by_id(&student.id) {
            Ok(Some(existing)) => student.password = existing.password,
            Ok(None) => {}
            Err(e) => return store_err(&req.id, &e),
        }
    }

    match store.update_student(student.clone()) {
        Ok(()) => ok(&req.id, json!({ "student": student })),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let id = match require_str(req, "id") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match store.delete_student(id) {
        Ok(deleted) => ok(&req.id, json!(deleted)),
        Err(e) => store_err(&req.id, &e),
    }
}

fn handle_students_search(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let class_level = match param_class_level(req, "class") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let term = param_str(req, "term").unwrap_or("");
    let section = param_str(req, "section");

    let students = match store.get_students() {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let matches = summary::search_students(&students, term, class_level, section);
    ok(&req.id, json!({ "students": matches }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.list" => Some(handle_students_list(state, req)),
        "students.get" => Some(handle_students_get(state, req)),
        "students.create" => Some(handle_students_create(state, req)),
        "students.update" => Some(handle_students_update(state, req)),
        "students.delete" => Some(handle_students_delete(state, req)),
        "students.search" => Some(handle_students_search(state, req)),
        _ => None,
    }
}
