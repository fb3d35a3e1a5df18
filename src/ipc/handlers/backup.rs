use crate::backup;
use crate::ipc::error::{err, ok, store_err};
use crate::ipc::helpers::{no_workspace, require_str};
use crate::ipc::types::{AppState, Request};
use crate::store::CollectionKey;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_backup_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_ref() else {
        return no_workspace(req);
    };
    let out_path = match require_str(req, "outPath") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };

    let collections = match store.export_collections() {
        Ok(v) => v,
        Err(e) => return store_err(&req.id, &e),
    };
    let export = match backup::write_bundle(&collections, &PathBuf::from(&out_path), store.now()) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "io_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path })),
            )
        }
    };
    info!(path = %out_path, "fee bundle exported");

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "counts": export.counts,
        }),
    )
}

fn handle_backup_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(store) = state.store.as_mut() else {
        return no_workspace(req);
    };
    let in_path = match require_str(req, "inPath") {
        Ok(v) => v.to_string(),
        Err(resp) => return resp,
    };

    let src = PathBuf::from(&in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Checked in full before the store is touched.
    let collections = match backup::read_bundle(&src) {
        Ok(v) => v,
        Err(e) => {
            warn!(path = %in_path, error = %e, "bundle import failed");
            return err(
                &req.id,
                "invalid_bundle",
                format!("{e:#}"),
                Some(json!({ "path": in_path })),
            );
        }
    };
    let counts: serde_json::Map<String, serde_json::Value> = CollectionKey::ALL
        .into_iter()
        .map(|k| (k.as_str().to_string(), json!(collections.count(k))))
        .collect();

    match store.restore(collections) {
        Ok(()) => ok(
            &req.id,
            json!({
                "bundleFormat": backup::BUNDLE_FORMAT,
                "counts": counts,
            }),
        ),
        Err(e) => store_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportBundle" => Some(handle_backup_export_bundle(state, req)),
        "backup.importBundle" => Some(handle_backup_import_bundle(state, req)),
        _ => None,
    }
}
