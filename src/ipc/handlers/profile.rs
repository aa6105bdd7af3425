use crate::ipc::helpers::{book, book_mut, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn profile_get(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "teacherName": book(state)?.teacher_name() }))
}

fn profile_set_teacher_name(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let book = book_mut(state)?;
    book.set_teacher_name(&name)?;
    Ok(json!({ "teacherName": book.teacher_name() }))
}

fn search(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let query = required_str(params, "query")?;
    let hits = book(state)?.search(&query);
    Ok(json!({
        "query": query,
        "classes": hits.classes,
        "students": hits.students,
        "files": hits.files
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "profile.get" => profile_get(state),
        "profile.setTeacherName" => profile_set_teacher_name(state, &req.params),
        "search" => search(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
