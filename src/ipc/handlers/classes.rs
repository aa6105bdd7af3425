use crate::error::AttendanceError;
use crate::ipc::error::ok;
use crate::ipc::helpers::{book, book_mut, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(book) = state.book.as_ref() else {
        return ok(&req.id, json!({ "classes": [] }));
    };
    let roster = book.roster();
    let classes: Vec<serde_json::Value> = roster
        .classes()
        .iter()
        .map(|c| {
            json!({
                "id": c.id,
                "name": c.name,
                "totalStudents": c.total_students,
                "studentCount": roster.student_count(&c.id)
            })
        })
        .collect();
    ok(&req.id, json!({ "classes": classes }))
}

fn classes_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = required_str(params, "name")?;
    let class = book_mut(state)?.add_class(&name)?;
    Ok(json!({ "classId": class.id, "class": class }))
}

fn classes_rename(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let name = required_str(params, "name")?;
    book_mut(state)?.rename_class(&class_id, &name)?;
    Ok(json!({ "classId": class_id, "name": name.trim() }))
}

fn classes_delete(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let removed = book_mut(state)?.delete_class(&class_id)?;
    Ok(json!({ "classId": class_id, "removedStudents": removed }))
}

fn classes_get(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let roster = book(state)?.roster();
    let class = roster
        .class(&class_id)
        .ok_or_else(|| AttendanceError::not_found("class", class_id.as_str()))?;
    Ok(json!({ "class": class, "studentCount": roster.student_count(&class_id) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "classes.list" => return Some(handle_classes_list(state, req)),
        "classes.get" => classes_get(state, &req.params),
        "classes.create" => classes_create(state, &req.params),
        "classes.rename" => classes_rename(state, &req.params),
        "classes.delete" => classes_delete(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
