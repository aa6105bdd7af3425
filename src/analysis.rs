//! Turning an uploaded file or pasted text into a pending analysis the
//! teacher confirms before anything is written.

use crate::book::AttendanceBook;
use crate::error::{AttendanceError, Result};
use crate::model::{size_label, Session, Student};
use crate::oracle::{classify_upload, guess_mime, AnalysisInput, IntentOracle, UploadKind};
use crate::reconcile::{prepare_pending, PendingAnalysis};
use crate::tabular::{self, Sheet};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Upload {
    /// CSV text parsed locally. `class_hint` comes from the file name.
    Sheet {
        csv: String,
        class_hint: Option<String>,
    },
    Oracle(AnalysisInput),
}

#[derive(Debug, Clone)]
pub struct LoadedUpload {
    pub name: String,
    pub kind: UploadKind,
    pub size: String,
    pub upload: Upload,
}

pub fn load_upload(path: &Path, mime: Option<&str>) -> Result<LoadedUpload> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();
    let mime = mime
        .map(|m| m.to_string())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| guess_mime(&name));
    let kind = classify_upload(&name, &mime)?;

    let lower = name.to_ascii_lowercase();
    if kind == UploadKind::Sheet && !lower.ends_with(".csv") {
        return Err(AttendanceError::MalformedInput(
            "binary spreadsheets are not read directly; save the sheet as CSV".to_string(),
        ));
    }

    let data = std::fs::read(path).map_err(|e| {
        AttendanceError::MalformedInput(format!("cannot read {}: {e}", path.display()))
    })?;
    let size = size_label(data.len() as u64);
    let upload = match kind {
        UploadKind::Sheet => Upload::Sheet {
            csv: String::from_utf8_lossy(&data).into_owned(),
            class_hint: tabular::file_stem(&name),
        },
        UploadKind::Text => Upload::Oracle(AnalysisInput::Text {
            content: String::from_utf8_lossy(&data).into_owned(),
        }),
        UploadKind::Image | UploadKind::Audio | UploadKind::Document => {
            Upload::Oracle(AnalysisInput::Media {
                kind,
                mime_type: mime,
                data,
            })
        }
    };
    Ok(LoadedUpload {
        name,
        kind,
        size,
        upload,
    })
}

pub fn text_upload(text: &str) -> Result<Upload> {
    if text.trim().is_empty() {
        return Err(AttendanceError::MalformedInput("text is empty".to_string()));
    }
    Ok(Upload::Oracle(AnalysisInput::Text {
        content: text.to_string(),
    }))
}

/// Roster handed to the AI service: the requested class, else the first one.
fn oracle_scope(book: &AttendanceBook, requested_class_id: Option<&str>) -> Vec<Student> {
    let roster = book.roster();
    requested_class_id
        .and_then(|id| roster.class(id))
        .or_else(|| roster.classes().first())
        .map(|c| roster.students_in(&c.id))
        .unwrap_or_default()
}

pub fn analyze(
    book: &AttendanceBook,
    oracle: &dyn IntentOracle,
    upload: &Upload,
    requested_class_id: Option<&str>,
    default_date: &str,
    default_session: Session,
) -> Result<PendingAnalysis> {
    let observations = match upload {
        Upload::Sheet { csv, class_hint } => {
            let sheet = Sheet::from_csv(csv);
            if sheet.is_empty() {
                return Err(AttendanceError::MalformedInput("sheet is empty".to_string()));
            }
            tabular::require_rows(
                tabular::attendance_rows(&sheet, class_hint.as_deref()),
                "attendance rows",
            )?
        }
        Upload::Oracle(input) => {
            let scope = oracle_scope(book, requested_class_id);
            oracle.extract_attendance(input, &scope)?
        }
    };
    tracing::info!(observations = observations.len(), "analysis finished");
    prepare_pending(
        book.roster(),
        observations,
        requested_class_id,
        default_date,
        default_session,
    )
}
