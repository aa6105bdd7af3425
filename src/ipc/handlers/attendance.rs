use crate::book::SessionContext;
use crate::error::AttendanceError;
use crate::ipc::helpers::{
    book, book_mut, optional_date, optional_session, required_status, required_str, respond,
    session_context, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::model::{today_label, Observation};
use serde_json::json;

fn attendance_session_open(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ctx = session_context(params)?;
    let rows = book(state)?.session_roster(&ctx)?;
    Ok(json!({
        "classId": ctx.class_id,
        "date": ctx.date,
        "session": ctx.session,
        "rows": rows
    }))
}

fn attendance_set_status(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let status = required_status(params)?;
    // The class is not needed to key a record; the context only fills defaults.
    let ctx = SessionContext::new("", optional_date(params), optional_session(params)?);
    book_mut(state)?.set_status(&student_id, &ctx.date, ctx.session, status)?;
    Ok(json!({
        "studentId": student_id,
        "date": ctx.date,
        "session": ctx.session,
        "status": status
    }))
}

fn attendance_mark_all(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ctx = session_context(params)?;
    let status = required_status(params)?;
    let updated = book_mut(state)?.mark_all(&ctx, status)?;
    Ok(json!({
        "classId": ctx.class_id,
        "date": ctx.date,
        "session": ctx.session,
        "updated": updated
    }))
}

fn attendance_reconcile(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ctx = session_context(params)?;
    let raw = params
        .get("observations")
        .cloned()
        .ok_or_else(|| HandlerErr::bad_params("missing observations"))?;
    let observations: Vec<Observation> = serde_json::from_value(raw)
        .map_err(|e| HandlerErr::bad_params(format!("observations must be an array: {}", e)))?;
    let summary = book_mut(state)?.reconcile(&observations, &ctx)?;
    Ok(json!({
        "date": ctx.date,
        "session": ctx.session,
        "summary": summary
    }))
}

fn attendance_session_stats(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    let date = optional_date(params).unwrap_or_else(today_label);
    let stats = book(state)?.day_stats(&class_id, &date)?;
    Ok(json!({ "classId": class_id, "date": date, "fn": stats.forenoon, "an": stats.afternoon }))
}

fn attendance_student_history(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = required_str(params, "studentId")?;
    let history = book(state)?.student_history(&student_id)?;
    Ok(serde_json::to_value(history).map_err(AttendanceError::from)?)
}

fn records_prune_orphans(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let removed = book_mut(state)?.prune_orphans()?;
    Ok(json!({ "removed": removed }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "attendance.sessionOpen" => attendance_session_open(state, &req.params),
        "attendance.setStatus" => attendance_set_status(state, &req.params),
        "attendance.markAll" => attendance_mark_all(state, &req.params),
        "attendance.reconcile" => attendance_reconcile(state, &req.params),
        "attendance.sessionStats" => attendance_session_stats(state, &req.params),
        "attendance.studentHistory" => attendance_student_history(state, &req.params),
        "records.pruneOrphans" => records_prune_orphans(state),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
