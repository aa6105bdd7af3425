use crate::model::{AttendanceRecord, AttendanceStatus, Session};
use serde::Serialize;
use std::collections::HashSet;

/// The attendance fact table. `(student_id, date, session)` is the primary
/// key; a missing row means UNMARKED.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<AttendanceRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    pub is_filled: bool,
    pub present: usize,
    pub absent: usize,
    pub total: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentTotals {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    pub on_duty: usize,
    pub percentage: u32,
}

fn rounded_percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

impl RecordStore {
    pub fn new(records: Vec<AttendanceRecord>) -> Self {
        // Collapse duplicate keys from older blobs; the later row wins.
        let mut store = Self::default();
        for r in records {
            store.upsert(&r.student_id, &r.date, r.session, r.status);
        }
        store
    }

    pub fn all(&self) -> &[AttendanceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn upsert(
        &mut self,
        student_id: &str,
        date: &str,
        session: Session,
        status: AttendanceStatus,
    ) {
        if let Some(existing) = self
            .records
            .iter_mut()
            .find(|r| r.student_id == student_id && r.date == date && r.session == session)
        {
            existing.status = status;
            return;
        }
        self.records.push(AttendanceRecord {
            student_id: student_id.to_string(),
            date: date.to_string(),
            session,
            status,
        });
    }

    /// Applies every pair against one `(date, session)`. The returned count is
    /// always the input length; duplicate ids in one batch are last-write-wins.
    pub fn bulk_upsert(
        &mut self,
        updates: &[(String, AttendanceStatus)],
        date: &str,
        session: Session,
    ) -> usize {
        for (student_id, status) in updates {
            self.upsert(student_id, date, session, *status);
        }
        updates.len()
    }

    pub fn query<F>(&self, predicate: F) -> Vec<&AttendanceRecord>
    where
        F: Fn(&AttendanceRecord) -> bool,
    {
        self.records.iter().filter(|r| predicate(r)).collect()
    }

    pub fn status_of(&self, student_id: &str, date: &str, session: Session) -> AttendanceStatus {
        self.records
            .iter()
            .find(|r| r.student_id == student_id && r.date == date && r.session == session)
            .map(|r| r.status)
            .unwrap_or(AttendanceStatus::Unmarked)
    }

    /// Present/absent counts for one session among `student_ids`.
    pub fn session_stats(
        &self,
        student_ids: &HashSet<&str>,
        date: &str,
        session: Session,
    ) -> SessionStats {
        let rows = self.query(|r| {
            r.date == date && r.session == session && student_ids.contains(r.student_id.as_str())
        });
        let present = rows
            .iter()
            .filter(|r| r.status == AttendanceStatus::Present)
            .count();
        let absent = rows
            .iter()
            .filter(|r| r.status == AttendanceStatus::Absent)
            .count();
        let is_filled = !rows.is_empty();
        let total = student_ids.len();
        SessionStats {
            is_filled,
            present,
            absent,
            total,
            percentage: if is_filled {
                rounded_percent(present, total)
            } else {
                0
            },
        }
    }

    /// Lifetime totals for a student. On-duty sessions count as attended.
    pub fn student_totals(&self, student_id: &str) -> StudentTotals {
        let rows = self.query(|r| r.student_id == student_id);
        let count = |status: AttendanceStatus| rows.iter().filter(|r| r.status == status).count();
        let present = count(AttendanceStatus::Present);
        let on_duty = count(AttendanceStatus::OnDuty);
        StudentTotals {
            total: rows.len(),
            present,
            absent: count(AttendanceStatus::Absent),
            on_duty,
            percentage: rounded_percent(present + on_duty, rows.len()),
        }
    }

    /// Drops rows whose student no longer exists. Returns how many went.
    pub fn retain_students(&mut self, live: &HashSet<&str>) -> usize {
        let before = self.records.len();
        self.records.retain(|r| live.contains(r.student_id.as_str()));
        before - self.records.len()
    }
}
