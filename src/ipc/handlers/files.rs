use crate::book::FilePatch;
use crate::ipc::helpers::{book, book_mut, optional_str, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::FileKind;
use serde_json::json;

fn files_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "files": book(state)?.files() }))
}

fn files_add(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let kind_raw = optional_str(params, "type").unwrap_or_else(|| "document".to_string());
    let kind = FileKind::parse(&kind_raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown file type: {}", kind_raw)))?;
    let file = book_mut(state)?.add_file(
        &name,
        kind,
        optional_str(params, "url"),
        optional_str(params, "content"),
        optional_str(params, "size"),
    )?;
    Ok(json!({ "file": file }))
}

fn files_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let file_id = required_str(params, "fileId")?;
    let patch = FilePatch {
        name: optional_str(params, "name"),
        content: params
            .get("content")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        url: optional_str(params, "url"),
    };
    let file = book_mut(state)?.update_file(&file_id, patch)?;
    Ok(json!({ "file": file }))
}

fn files_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let file_id = required_str(params, "fileId")?;
    book_mut(state)?.delete_file(&file_id)?;
    Ok(json!({ "fileId": file_id }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "files.list" => files_list(state),
        "files.add" => files_add(state, &req.params),
        "files.update" => files_update(state, &req.params),
        "files.delete" => files_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
