use crate::analysis::{self, LoadedUpload, Upload};
use crate::ipc::helpers::{book, optional_date, optional_session, optional_str, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::{today_label, Session};
use crate::reconcile::PendingAnalysis;
use chrono::Local;
use serde_json::json;
use std::path::PathBuf;

/// Runs one analysis under the guard. A result whose workspace went away
/// while it was running is discarded. With the sequential request loop the
/// guard never trips here; see `crate::guard`.
fn run_guarded(
    state: &mut AppState,
    upload: &Upload,
    params: &serde_json::Value,
) -> Result<PendingAnalysis, HandlerErr> {
    book(state)?;
    let ticket = state.guard.begin()?;
    let requested = optional_str(params, "classId");
    let default_date = optional_date(params).unwrap_or_else(today_label);
    let default_session = match optional_session(params) {
        Ok(s) => s.unwrap_or_else(|| Session::for_time(&Local::now())),
        Err(e) => {
            state.guard.finish(ticket);
            return Err(e);
        }
    };

    let result = match state.book.as_ref() {
        Some(book) => analysis::analyze(
            book,
            state.oracle.as_ref(),
            upload,
            requested.as_deref(),
            &default_date,
            default_session,
        )
        .map_err(HandlerErr::from),
        None => Err(HandlerErr::no_workspace()),
    };
    if !state.guard.finish(ticket) {
        tracing::warn!("workspace changed during analysis, result dropped");
        return Err(HandlerErr {
            code: "stale",
            message: "workspace changed while the analysis was running".to_string(),
            details: None,
        });
    }
    result
}

fn analysis_analyze_file(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let path = PathBuf::from(required_str(params, "path")?);
    let mime = optional_str(params, "mimeType");
    let LoadedUpload {
        name,
        kind,
        size,
        upload,
    } = analysis::load_upload(&path, mime.as_deref())?;

    let pending = run_guarded(state, &upload, params)?;
    if let Some(book) = state.book.as_mut() {
        book.add_file(&name, kind.file_kind(), None, None, Some(size))?;
    }
    Ok(json!({ "fileName": name, "pending": pending }))
}

fn analysis_analyze_text(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let text = required_str(params, "text")?;
    let upload = analysis::text_upload(&text)?;
    let pending = run_guarded(state, &upload, params)?;
    Ok(json!({ "pending": pending }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "analysis.analyzeFile" => analysis_analyze_file(state, &req.params),
        "analysis.analyzeText" => analysis_analyze_text(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
