use crate::book::{AttendanceBook, SessionContext};
use crate::command::{interpret_locally, AgentAction, Interpretation};
use crate::error::Result;
use crate::oracle::IntentOracle;
use crate::reconcile::ActionOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedBy {
    Local,
    Oracle,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentReply {
    pub resolved_by: ResolvedBy,
    pub actions: Vec<AgentAction>,
    pub outcome: ActionOutcome,
    pub reply: String,
}

fn summarize(outcome: &ActionOutcome) -> String {
    let mut parts = outcome.applied.clone();
    if !outcome.unmatched_rolls.is_empty() {
        parts.push(format!(
            "Student not found: {}",
            outcome.unmatched_rolls.join(", ")
        ));
    }
    if parts.is_empty() {
        "No changes made.".to_string()
    } else {
        parts.join(". ")
    }
}

/// Runs one utterance against the session. Plain commands are handled
/// locally; anything else is interpreted by the AI service and its tool calls
/// are applied in the order it made them.
pub fn run_command(
    book: &mut AttendanceBook,
    oracle: &dyn IntentOracle,
    utterance: &str,
    ctx: &SessionContext,
) -> Result<AgentReply> {
    let (resolved_by, actions, oracle_text) = match interpret_locally(utterance) {
        Interpretation::Unresolved => {
            let scope = book.roster().students_in(&ctx.class_id);
            let reply = oracle.interpret_command(utterance, &scope)?;
            (ResolvedBy::Oracle, reply.actions, reply.text)
        }
        local => (ResolvedBy::Local, local.into_actions(), None),
    };
    tracing::info!(by = ?resolved_by, actions = actions.len(), "command interpreted");

    let outcome = book.apply_actions(&actions, ctx)?;
    let reply = oracle_text.unwrap_or_else(|| summarize(&outcome));
    Ok(AgentReply {
        resolved_by,
        actions,
        outcome,
        reply,
    })
}
