use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{book, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::tabular;
use serde_json::json;
use std::path::PathBuf;

fn workspace_param(state: &AppState, req: &Request) -> Option<PathBuf> {
    req.params
        .get("workspacePath")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| state.workspace.clone())
}

fn handle_backup_export_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match req.params.get("outPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing outPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let out = PathBuf::from(&out_path);
    match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(export) => ok(
            &req.id,
            json!({
                "path": out_path,
                "bundleFormat": export.bundle_format,
                "entryCount": export.entry_count,
                "dbSha256": export.db_sha256
            }),
        ),
        Err(e) => err(
            &req.id,
            "io_failed",
            e.to_string(),
            Some(json!({ "path": out_path })),
        ),
    }
}

fn handle_backup_import_workspace_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match req.params.get("inPath").and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => return err(&req.id, "bad_params", "missing inPath", None),
    };
    let Some(workspace_path) = workspace_param(state, req) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
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

    // Release the open database before its file is replaced.
    let previous = state.workspace.clone();
    state.close_workspace();

    let import = match backup::import_workspace_bundle(&src, &workspace_path) {
        Ok(v) => v,
        Err(e) => {
            if let Some(prev) = previous {
                if let Err(reopen) = state.open_workspace(&prev) {
                    tracing::error!(error = %reopen, "could not reopen workspace after failed import");
                }
            }
            return err(
                &req.id,
                "io_failed",
                e.to_string(),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    match state.open_workspace(&workspace_path) {
        Ok(()) => ok(
            &req.id,
            json!({
                "workspacePath": workspace_path.to_string_lossy(),
                "bundleFormatDetected": import.bundle_format_detected,
                "dbSha256": import.db_sha256
            }),
        ),
        Err(e) => err(&req.id, "db_open_failed", e.to_string(), None),
    }
}

fn exchange_export_class_csv(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let out_path = required_str(params, "outPath")?;
    let (headers, rows) = book(state)?.export_class(&class_id)?;
    let text = tabular::to_csv(&headers, &rows);
    let out = PathBuf::from(&out_path);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "io_failed",
            message: e.to_string(),
            details: Some(json!({ "path": parent.to_string_lossy() })),
        })?;
    }
    std::fs::write(&out, text).map_err(|e| HandlerErr {
        code: "io_failed",
        message: e.to_string(),
        details: Some(json!({ "path": out_path })),
    })?;
    Ok(json!({
        "path": out_path,
        "rowsExported": rows.len(),
        "columns": headers
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_backup_export_workspace_bundle(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_backup_import_workspace_bundle(state, req)),
        "exchange.exportClassCsv" => Some(respond(
            &req.id,
            exchange_export_class_csv(state, &req.params),
        )),
        _ => None,
    }
}
