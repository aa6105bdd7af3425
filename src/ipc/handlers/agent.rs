use crate::agent;
use crate::ipc::helpers::{required_str, respond, session_context, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn agent_command(state: &mut AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let ctx = session_context(params)?;
    let text = required_str(params, "text")?;
    if text.trim().is_empty() {
        return Err(HandlerErr::bad_params("text must not be empty"));
    }
    let AppState { book, oracle, .. } = state;
    let book = book.as_mut().ok_or_else(HandlerErr::no_workspace)?;
    let reply = agent::run_command(book, oracle.as_ref(), &text, &ctx)?;
    Ok(json!({
        "classId": ctx.class_id,
        "date": ctx.date,
        "session": ctx.session,
        "resolvedBy": reply.resolved_by,
        "actions": reply.actions,
        "updatedCount": reply.outcome.updated_count,
        "unmatchedRolls": reply.outcome.unmatched_rolls,
        "reply": reply.reply
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "agent.command" => agent_command(state, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
