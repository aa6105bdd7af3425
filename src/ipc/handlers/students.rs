use crate::error::AttendanceError;
use crate::ipc::helpers::{book, book_mut, optional_str, required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster::StudentField;
use crate::tabular::{self, Sheet};
use serde_json::json;

fn students_list(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let roster = book(state)?.roster();
    if roster.class(&class_id).is_none() {
        return Err(AttendanceError::not_found("class", class_id).into());
    }
    Ok(json!({ "students": roster.students_in(&class_id) }))
}

fn students_create(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let name = required_str(params, "name")?;
    let roll_no = match params.get("rollNo") {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => required_str(params, "rollNo")?,
    };
    let student = book_mut(state)?.add_student(&class_id, &name, &roll_no)?;
    Ok(json!({ "student": student }))
}

fn students_update(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let field_raw = required_str(params, "field")?;
    let field = StudentField::parse(&field_raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("field must be name or rollNo, got {}", field_raw)))?;
    let value = required_str(params, "value")?;
    let student = book_mut(state)?.update_student(&student_id, field, &value)?;
    Ok(json!({ "student": student }))
}

/// Class-list sheet as CSV. With `classId` the rows are appended to that
/// class; otherwise a new class is created, named after `className` or the
/// file name.
fn students_import(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let csv = required_str(params, "csv")?;
    let sheet = Sheet::from_csv(&csv);
    let rows = tabular::require_rows(tabular::roster_rows(&sheet), "valid student data")?;
    let book = book_mut(state)?;

    if let Some(class_id) = optional_str(params, "classId") {
        let created = book.import_students(&class_id, &rows)?;
        return Ok(json!({ "classId": class_id, "imported": created.len(), "students": created }));
    }
    let name = optional_str(params, "className")
        .or_else(|| optional_str(params, "fileName").and_then(|f| tabular::file_stem(&f)))
        .unwrap_or_default();
    let (class, created) = book.import_class(&name, &rows)?;
    Ok(json!({
        "classId": class.id,
        "class": class,
        "imported": created.len(),
        "students": created
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "students.list" => students_list(state, &req.params),
        "students.create" => students_create(state, &req.params),
        "students.update" => students_update(state, &req.params),
        "students.import" => students_import(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
