use crate::book::{AttendanceBook, SessionContext};
use crate::error::AttendanceError;
use crate::ipc::error::{err, ok};
use crate::ipc::types::AppState;
use crate::model::{normalize_date_label, AttendanceStatus, Session};
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn no_workspace() -> Self {
        Self {
            code: "no_workspace",
            message: "select a workspace first".to_string(),
            details: None,
        }
    }
}

impl From<AttendanceError> for HandlerErr {
    fn from(e: AttendanceError) -> Self {
        let details = match &e {
            AttendanceError::NotFound { what, key } => Some(json!({ "what": what, "key": key })),
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Trimmed string param; blank counts as absent.
pub fn optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_status(params: &serde_json::Value) -> Result<AttendanceStatus, HandlerErr> {
    let raw = required_str(params, "status")?;
    AttendanceStatus::parse(&raw)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown status: {}", raw)))
}

pub fn optional_session(params: &serde_json::Value) -> Result<Option<Session>, HandlerErr> {
    match optional_str(params, "session") {
        None => Ok(None),
        Some(raw) => Session::parse(&raw)
            .map(Some)
            .ok_or_else(|| HandlerErr::bad_params(format!("unknown session: {}", raw))),
    }
}

pub fn optional_date(params: &serde_json::Value) -> Option<String> {
    optional_str(params, "date").and_then(|d| normalize_date_label(&d))
}

pub fn session_context(params: &serde_json::Value) -> Result<SessionContext, HandlerErr> {
    let class_id = required_str(params, "classId")?;
    Ok(SessionContext::new(
        class_id,
        optional_date(params),
        optional_session(params)?,
    ))
}

pub fn book(state: &AppState) -> Result<&AttendanceBook, HandlerErr> {
    state.book.as_ref().ok_or_else(HandlerErr::no_workspace)
}

pub fn book_mut(state: &mut AppState) -> Result<&mut AttendanceBook, HandlerErr> {
    state.book.as_mut().ok_or_else(HandlerErr::no_workspace)
}
