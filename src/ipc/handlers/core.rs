use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "analysisBusy": state.guard.is_busy()
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match state.open_workspace(&path) {
        Ok(()) => {
            let (classes, students) = state
                .book
                .as_ref()
                .map(|b| (b.roster().classes().len(), b.roster().students().len()))
                .unwrap_or_default();
            ok(
                &req.id,
                json!({
                    "workspacePath": path.to_string_lossy(),
                    "classCount": classes,
                    "studentCount": students
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_workspace_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.close_workspace();
    ok(&req.id, json!({}))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "workspace.close" => Some(handle_workspace_close(state, req)),
        _ => None,
    }
}
