//! Merging externally sourced observations into the record set.
//!
//! Every source (sheet, AI analysis, chat command) funnels through here so the
//! same roll matching and upsert rule applies to all of them. A batch is
//! applied best-effort: rows that cannot be resolved are reported back and
//! the rest still land.

use crate::command::AgentAction;
use crate::error::{AttendanceError, Result};
use crate::model::{normalize_date_label, AttendanceStatus, ClassInfo, Observation, Session, Student};
use crate::records::RecordStore;
use crate::roll::{match_roll, normalize_roll};
use crate::roster::RosterStore;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileSummary {
    pub class_id: String,
    pub class_name: String,
    pub matched_count: usize,
    pub unmatched_rolls: Vec<String>,
}

/// An observation that passed validation: a normalized roll and a known
/// status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedObservation {
    pub roll_no: String,
    pub status: AttendanceStatus,
}

impl ResolvedObservation {
    /// `Err` carries the label to report as unmatched.
    pub fn from_observation(obs: &Observation) -> std::result::Result<Self, String> {
        let raw_roll = obs.roll_no.as_deref().unwrap_or("");
        let roll_no = normalize_roll(raw_roll);
        if roll_no.is_empty() {
            return Err(raw_roll.to_string());
        }
        let status = match obs.status.as_deref() {
            None => AttendanceStatus::Present,
            Some(s) if s.trim().is_empty() => AttendanceStatus::Present,
            Some(s) => AttendanceStatus::parse(s).ok_or_else(|| raw_roll.to_string())?,
        };
        Ok(Self { roll_no, status })
    }
}

/// The class an analysis batch belongs to: a class-name hint carried by the
/// observations wins, then the explicitly requested class.
pub fn resolve_target_class<'a>(
    roster: &'a RosterStore,
    observations: &[Observation],
    target_class_id: &str,
) -> Option<&'a ClassInfo> {
    observations
        .iter()
        .filter_map(|o| o.class_name.as_deref())
        .find_map(|hint| roster.class_by_hint(hint))
        .or_else(|| roster.class(target_class_id))
}

pub fn reconcile(
    roster: &RosterStore,
    records: &mut RecordStore,
    observations: &[Observation],
    target_class_id: &str,
    date: &str,
    session: Session,
) -> Result<ReconcileSummary> {
    let class = resolve_target_class(roster, observations, target_class_id)
        .ok_or_else(|| AttendanceError::not_found("class", target_class_id))?;
    let scope = roster.students_in(&class.id);

    let mut matched_count = 0usize;
    let mut unmatched_rolls = Vec::new();
    for obs in observations {
        let resolved = match ResolvedObservation::from_observation(obs) {
            Ok(r) => r,
            Err(label) => {
                tracing::warn!(roll = %label, status = ?obs.status, "observation rejected");
                unmatched_rolls.push(label);
                continue;
            }
        };
        match match_roll(&resolved.roll_no, &scope) {
            Some(student) => {
                records.upsert(&student.id, date, session, resolved.status);
                matched_count += 1;
            }
            None => unmatched_rolls.push(resolved.roll_no),
        }
    }

    tracing::info!(
        class = %class.name,
        date,
        session = session.as_str(),
        matched = matched_count,
        unmatched = unmatched_rolls.len(),
        "reconciled batch"
    );
    Ok(ReconcileSummary {
        class_id: class.id.clone(),
        class_name: class.name.clone(),
        matched_count,
        unmatched_rolls,
    })
}

/// "Mark all": every student in scope gets `status`, overwriting whatever was
/// there.
pub fn reconcile_bulk(
    records: &mut RecordStore,
    status: AttendanceStatus,
    scope: &[Student],
    date: &str,
    session: Session,
) -> usize {
    let updates: Vec<(String, AttendanceStatus)> =
        scope.iter().map(|s| (s.id.clone(), status)).collect();
    records.bulk_upsert(&updates, date, session)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub applied: Vec<String>,
    pub unmatched_rolls: Vec<String>,
    pub updated_count: usize,
}

/// Applies chat/voice actions against one class and session, in order, so
/// "mark all present, then 1 absent" leaves roll 1 absent.
pub fn apply_actions(
    roster: &RosterStore,
    records: &mut RecordStore,
    actions: &[AgentAction],
    class_id: &str,
    date: &str,
    session: Session,
) -> Result<ActionOutcome> {
    if roster.class(class_id).is_none() {
        return Err(AttendanceError::not_found("class", class_id));
    }
    let scope = roster.students_in(class_id);
    let mut outcome = ActionOutcome::default();
    for action in actions {
        match action {
            AgentAction::Mark { roll_no, status } => match match_roll(roll_no, &scope) {
                Some(student) => {
                    records.upsert(&student.id, date, session, *status);
                    tracing::debug!(student = %student.name, status = status.as_str(), "live update");
                    outcome.updated_count += 1;
                    outcome.applied.push(action.describe());
                }
                None => {
                    tracing::warn!(roll = %roll_no, "student not found");
                    outcome.unmatched_rolls.push(roll_no.clone());
                }
            },
            AgentAction::MarkAll { status } => {
                outcome.updated_count += reconcile_bulk(records, *status, &scope, date, session);
                outcome.applied.push(action.describe());
            }
        }
    }
    Ok(outcome)
}

/// What an analysis found, waiting for the teacher to confirm class, date
/// and session before it is reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAnalysis {
    pub class_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_class_name: Option<String>,
    pub date: String,
    pub session: Session,
    pub observations: Vec<Observation>,
}

/// Derives the confirmation context from the first observation and
/// normalizes roll numbers for display.
pub fn prepare_pending(
    roster: &RosterStore,
    observations: Vec<Observation>,
    requested_class_id: Option<&str>,
    default_date: &str,
    default_session: Session,
) -> Result<PendingAnalysis> {
    let Some(first) = observations.first() else {
        return Err(AttendanceError::MalformedInput(
            "analysis completed but no attendance data was found".to_string(),
        ));
    };

    let detected_class_name = first.class_name.clone();
    let class_id = detected_class_name
        .as_deref()
        .and_then(|hint| roster.class_by_hint(hint))
        .or_else(|| requested_class_id.and_then(|id| roster.class(id)))
        .or_else(|| roster.classes().first())
        .map(|c| c.id.clone())
        .ok_or_else(|| AttendanceError::not_found("class", requested_class_id.unwrap_or("")))?;
    let date = first
        .date
        .as_deref()
        .and_then(normalize_date_label)
        .unwrap_or_else(|| default_date.to_string());
    let session = first
        .session
        .as_deref()
        .map(Session::from_hint)
        .unwrap_or(default_session);

    let observations = observations
        .into_iter()
        .map(|mut o| {
            o.roll_no = o.roll_no.map(|r| normalize_roll(&r)).filter(|r| !r.is_empty());
            // The confirmed class is authoritative from here on.
            o.class_name = None;
            o
        })
        .collect();

    Ok(PendingAnalysis {
        class_id,
        detected_class_name,
        date,
        session,
        observations,
    })
}
