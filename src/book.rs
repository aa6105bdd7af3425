//! The attendance book: roster, records, uploads and profile held together
//! and written back through a [`BlobStore`] after every change.

use crate::command::AgentAction;
use crate::error::{AttendanceError, Result};
use crate::model::{
    today_label, AttendanceRecord, AttendanceStatus, ClassInfo, FileKind, Observation, Session,
    Student, UploadedFile,
};
use crate::records::{RecordStore, SessionStats, StudentTotals};
use crate::reconcile::{self, ActionOutcome, ReconcileSummary};
use crate::roster::{seed_classes, seed_students, ImportRow, RosterStore, StudentField};
use crate::store::{
    load_json, save_json, BlobStore, KEY_CLASSES, KEY_FILES, KEY_RECORDS, KEY_STUDENTS,
    KEY_TEACHER_NAME,
};
use crate::tabular;
use chrono::Local;
use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

pub const DEFAULT_TEACHER_NAME: &str = "Mr. Anderson";

/// The class, day and slot an action applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub class_id: String,
    pub date: String,
    pub session: Session,
}

impl SessionContext {
    /// Missing date and session default to today and the current half-day.
    pub fn new(class_id: impl Into<String>, date: Option<String>, session: Option<Session>) -> Self {
        Self {
            class_id: class_id.into(),
            date: date.unwrap_or_else(today_label),
            session: session.unwrap_or_else(|| Session::for_time(&Local::now())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    pub student: Student,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayStats {
    pub forenoon: SessionStats,
    pub afternoon: SessionStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentHistory {
    pub student: Student,
    pub records: Vec<AttendanceRecord>,
    pub totals: StudentTotals,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHits {
    pub classes: Vec<ClassInfo>,
    pub students: Vec<Student>,
    pub files: Vec<UploadedFile>,
}

#[derive(Debug, Clone, Default)]
pub struct FilePatch {
    pub name: Option<String>,
    pub content: Option<String>,
    pub url: Option<String>,
}

pub struct AttendanceBook {
    store: Box<dyn BlobStore>,
    roster: RosterStore,
    records: RecordStore,
    files: Vec<UploadedFile>,
    teacher_name: String,
}

impl AttendanceBook {
    /// Reads every collection; a missing or unreadable blob falls back to
    /// the seed dataset for that collection.
    pub fn load(store: Box<dyn BlobStore>) -> Self {
        let classes = load_json::<Vec<ClassInfo>>(store.as_ref(), KEY_CLASSES).unwrap_or_else(|| {
            tracing::info!("no saved classes, seeding demo classes");
            seed_classes()
        });
        let students = load_json::<Vec<Student>>(store.as_ref(), KEY_STUDENTS).unwrap_or_else(|| {
            tracing::info!("no saved students, seeding demo roster");
            seed_students()
        });
        let records = load_json::<Vec<AttendanceRecord>>(store.as_ref(), KEY_RECORDS).unwrap_or_default();
        let files = load_json::<Vec<UploadedFile>>(store.as_ref(), KEY_FILES).unwrap_or_default();
        let teacher_name = load_json::<String>(store.as_ref(), KEY_TEACHER_NAME)
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TEACHER_NAME.to_string());

        Self {
            store,
            roster: RosterStore::new(classes, students),
            records: RecordStore::new(records),
            files,
            teacher_name,
        }
    }

    pub fn roster(&self) -> &RosterStore {
        &self.roster
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn teacher_name(&self) -> &str {
        &self.teacher_name
    }

    fn save_classes(&mut self) -> Result<()> {
        save_json(self.store.as_mut(), KEY_CLASSES, self.roster.classes())
    }

    fn save_students(&mut self) -> Result<()> {
        save_json(self.store.as_mut(), KEY_STUDENTS, self.roster.students())
    }

    fn save_records(&mut self) -> Result<()> {
        save_json(self.store.as_mut(), KEY_RECORDS, self.records.all())
    }

    fn save_files(&mut self) -> Result<()> {
        save_json(self.store.as_mut(), KEY_FILES, &self.files)
    }

    fn save_all(&mut self) -> Result<()> {
        self.save_classes()?;
        self.save_students()?;
        self.save_records()?;
        self.save_files()?;
        save_json(self.store.as_mut(), KEY_TEACHER_NAME, &self.teacher_name)
    }

    /// Runs `change` against the book. If it fails, memory is put back as it
    /// was and, after a storage failure, the restored state is rewritten so a
    /// partially saved change does not survive a reload.
    fn commit<T>(&mut self, change: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let roster = self.roster.clone();
        let records = self.records.clone();
        let files = self.files.clone();
        let teacher_name = self.teacher_name.clone();
        match change(self) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.roster = roster;
                self.records = records;
                self.files = files;
                self.teacher_name = teacher_name;
                if matches!(e, AttendanceError::Storage(_)) {
                    if let Err(restore) = self.save_all() {
                        tracing::warn!(error = %restore, "could not rewrite state after failed save");
                    }
                }
                Err(e)
            }
        }
    }

    fn require_class(&self, class_id: &str) -> Result<&ClassInfo> {
        self.roster
            .class(class_id)
            .ok_or_else(|| AttendanceError::not_found("class", class_id))
    }

    pub fn add_class(&mut self, name: &str) -> Result<ClassInfo> {
        let class = self.commit(|book| {
            let class = book.roster.add_class(name)?;
            book.save_classes()?;
            Ok(class)
        })?;
        tracing::info!(class = %class.name, id = %class.id, "class added");
        Ok(class)
    }

    pub fn rename_class(&mut self, class_id: &str, name: &str) -> Result<()> {
        self.commit(|book| {
            book.roster.rename_class(class_id, name)?;
            book.save_classes()
        })
    }

    /// Deletes the class and its students. Their records stay behind as
    /// orphaned history until [`Self::prune_orphans`] is called.
    pub fn delete_class(&mut self, class_id: &str) -> Result<usize> {
        let removed = self.commit(|book| {
            let removed = book.roster.delete_class(class_id)?;
            book.save_classes()?;
            book.save_students()?;
            Ok(removed)
        })?;
        tracing::info!(class_id, students = removed.len(), "class deleted");
        Ok(removed.len())
    }

    pub fn add_student(&mut self, class_id: &str, name: &str, roll_no: &str) -> Result<Student> {
        self.commit(|book| {
            let student = book.roster.add_student(class_id, name, roll_no)?;
            book.save_students()?;
            Ok(student)
        })
    }

    pub fn update_student(&mut self, student_id: &str, field: StudentField, value: &str) -> Result<Student> {
        self.commit(|book| {
            let student = book.roster.update_student_field(student_id, field, value)?;
            book.save_students()?;
            Ok(student)
        })
    }

    pub fn import_students(&mut self, class_id: &str, rows: &[ImportRow]) -> Result<Vec<Student>> {
        self.commit(|book| {
            let created = book.roster.import_students(class_id, rows)?;
            book.save_students()?;
            Ok(created)
        })
    }

    pub fn import_class(&mut self, name: &str, rows: &[ImportRow]) -> Result<(ClassInfo, Vec<Student>)> {
        let (class, created) = self.commit(|book| {
            let imported = book.roster.import_class(name, rows)?;
            book.save_classes()?;
            book.save_students()?;
            Ok(imported)
        })?;
        tracing::info!(class = %class.name, students = created.len(), "class imported");
        Ok((class, created))
    }

    pub fn session_roster(&self, ctx: &SessionContext) -> Result<Vec<SessionRow>> {
        self.require_class(&ctx.class_id)?;
        Ok(self
            .roster
            .students_in(&ctx.class_id)
            .into_iter()
            .map(|student| {
                let status = self.records.status_of(&student.id, &ctx.date, ctx.session);
                SessionRow { student, status }
            })
            .collect())
    }

    pub fn set_status(
        &mut self,
        student_id: &str,
        date: &str,
        session: Session,
        status: AttendanceStatus,
    ) -> Result<()> {
        if self.roster.student(student_id).is_none() {
            return Err(AttendanceError::not_found("student", student_id));
        }
        self.commit(|book| {
            book.records.upsert(student_id, date, session, status);
            book.save_records()
        })
    }

    pub fn mark_all(&mut self, ctx: &SessionContext, status: AttendanceStatus) -> Result<usize> {
        self.require_class(&ctx.class_id)?;
        let scope = self.roster.students_in(&ctx.class_id);
        self.commit(|book| {
            let count = reconcile::reconcile_bulk(&mut book.records, status, &scope, &ctx.date, ctx.session);
            book.save_records()?;
            Ok(count)
        })
    }

    pub fn reconcile(&mut self, observations: &[Observation], ctx: &SessionContext) -> Result<ReconcileSummary> {
        self.commit(|book| {
            let summary = reconcile::reconcile(
                &book.roster,
                &mut book.records,
                observations,
                &ctx.class_id,
                &ctx.date,
                ctx.session,
            )?;
            if summary.matched_count > 0 {
                book.save_records()?;
            }
            Ok(summary)
        })
    }

    pub fn apply_actions(&mut self, actions: &[AgentAction], ctx: &SessionContext) -> Result<ActionOutcome> {
        self.commit(|book| {
            let outcome = reconcile::apply_actions(
                &book.roster,
                &mut book.records,
                actions,
                &ctx.class_id,
                &ctx.date,
                ctx.session,
            )?;
            if outcome.updated_count > 0 {
                book.save_records()?;
            }
            Ok(outcome)
        })
    }

    pub fn prune_orphans(&mut self) -> Result<usize> {
        self.commit(|book| {
            let live: HashSet<&str> = book.roster.students().iter().map(|s| s.id.as_str()).collect();
            let removed = book.records.retain_students(&live);
            if removed > 0 {
                book.save_records()?;
                tracing::info!(removed, "orphaned records pruned");
            }
            Ok(removed)
        })
    }

    pub fn day_stats(&self, class_id: &str, date: &str) -> Result<DayStats> {
        self.require_class(class_id)?;
        let ids: HashSet<&str> = self
            .roster
            .students()
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id.as_str())
            .collect();
        Ok(DayStats {
            forenoon: self.records.session_stats(&ids, date, Session::Forenoon),
            afternoon: self.records.session_stats(&ids, date, Session::Afternoon),
        })
    }

    pub fn student_history(&self, student_id: &str) -> Result<StudentHistory> {
        let student = self
            .roster
            .student(student_id)
            .cloned()
            .ok_or_else(|| AttendanceError::not_found("student", student_id))?;
        let records = self
            .records
            .query(|r| r.student_id == student_id)
            .into_iter()
            .cloned()
            .collect();
        Ok(StudentHistory {
            totals: self.records.student_totals(student_id),
            student,
            records,
        })
    }

    pub fn export_class(&self, class_id: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        self.require_class(class_id)?;
        let students = self.roster.students_in(class_id);
        let ids: HashSet<&str> = students.iter().map(|s| s.id.as_str()).collect();
        let records: Vec<AttendanceRecord> = self
            .records
            .query(|r| ids.contains(r.student_id.as_str()))
            .into_iter()
            .cloned()
            .collect();
        Ok(tabular::export_pivot(&students, &records))
    }

    pub fn add_file(
        &mut self,
        name: &str,
        kind: FileKind,
        url: Option<String>,
        content: Option<String>,
        size: Option<String>,
    ) -> Result<UploadedFile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::MalformedInput(
                "file name must not be empty".to_string(),
            ));
        }
        let file = UploadedFile {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            date: Local::now().format("%-m/%-d/%Y").to_string(),
            url,
            content,
            size,
        };
        self.commit(|book| {
            // Newest first.
            book.files.insert(0, file.clone());
            book.save_files()?;
            Ok(file)
        })
    }

    pub fn update_file(&mut self, file_id: &str, patch: FilePatch) -> Result<UploadedFile> {
        self.commit(|book| {
            let file = book
                .files
                .iter_mut()
                .find(|f| f.id == file_id)
                .ok_or_else(|| AttendanceError::not_found("file", file_id))?;
            if let Some(name) = patch.name.filter(|n| !n.trim().is_empty()) {
                file.name = name.trim().to_string();
            }
            if patch.content.is_some() {
                file.content = patch.content;
            }
            if patch.url.is_some() {
                file.url = patch.url;
            }
            let updated = file.clone();
            book.save_files()?;
            Ok(updated)
        })
    }

    pub fn delete_file(&mut self, file_id: &str) -> Result<()> {
        self.commit(|book| {
            let before = book.files.len();
            book.files.retain(|f| f.id != file_id);
            if book.files.len() == before {
                return Err(AttendanceError::not_found("file", file_id));
            }
            book.save_files()
        })
    }

    pub fn set_teacher_name(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::MalformedInput(
                "teacher name must not be empty".to_string(),
            ));
        }
        self.commit(|book| {
            book.teacher_name = name.to_string();
            save_json(book.store.as_mut(), KEY_TEACHER_NAME, &book.teacher_name)
        })
    }

    pub fn search(&self, query: &str) -> SearchHits {
        let q = query.trim();
        if q.is_empty() {
            return SearchHits::default();
        }
        let needle = q.to_lowercase();
        SearchHits {
            classes: self.roster.search_classes(q).into_iter().cloned().collect(),
            students: self.roster.search_students(q).into_iter().cloned().collect(),
            files: self
                .files
                .iter()
                .filter(|f| f.name.to_lowercase().contains(&needle))
                .cloned()
                .collect(),
        }
    }
}
