use chrono::{DateTime, Local, NaiveDate, Timelike};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
    OnDuty,
    Unmarked,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "PRESENT",
            Self::Absent => "ABSENT",
            Self::Late => "LATE",
            Self::Excused => "EXCUSED",
            Self::OnDuty => "ON_DUTY",
            Self::Unmarked => "UNMARKED",
        }
    }

    /// Case-insensitive parse of a wire status ("present", "On_Duty", ...).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().replace([' ', '-'], "_").as_str() {
            "PRESENT" => Some(Self::Present),
            "ABSENT" => Some(Self::Absent),
            "LATE" => Some(Self::Late),
            "EXCUSED" => Some(Self::Excused),
            "ON_DUTY" | "OD" => Some(Self::OnDuty),
            "UNMARKED" => Some(Self::Unmarked),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Session {
    Forenoon,
    Afternoon,
}

impl Session {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Forenoon => "FORENOON",
            Self::Afternoon => "AFTERNOON",
        }
    }

    pub fn short_label(self) -> &'static str {
        match self {
            Self::Forenoon => "FN",
            Self::Afternoon => "AN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "FORENOON" | "FN" => Some(Self::Forenoon),
            "AFTERNOON" | "AN" => Some(Self::Afternoon),
            _ => None,
        }
    }

    /// Loose reading of a session written on a sheet or spoken aloud.
    /// Anything mentioning "after" or "AN" is the afternoon slot.
    pub fn from_hint(hint: &str) -> Self {
        let up = hint.to_ascii_uppercase();
        if up.contains("AFTER") || up.contains("AN") {
            Self::Afternoon
        } else {
            Self::Forenoon
        }
    }

    pub fn for_time(now: &DateTime<Local>) -> Self {
        if now.hour() < 12 {
            Self::Forenoon
        } else {
            Self::Afternoon
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    pub roll_no: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub id: String,
    pub name: String,
    pub total_students: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_id: String,
    pub date: String,
    pub session: Session,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Note,
    Document,
}

impl FileKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            "video" => Some(Self::Video),
            "note" => Some(Self::Note),
            "document" => Some(Self::Document),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FileKind,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One attendance guess from the AI service or a parsed sheet. Everything is
/// optional and untrusted until the reconciliation step resolves it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default, deserialize_with = "lenient_string")]
    pub roll_no: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub session: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub class_name: Option<String>,
}

impl Observation {
    pub fn new(roll_no: impl Into<String>, status: AttendanceStatus) -> Self {
        Self {
            roll_no: Some(roll_no.into()),
            status: Some(status.as_str().to_string()),
            ..Self::default()
        }
    }
}

/// Models answer with strings, numbers or nulls for the same field.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("null") {
                None
            } else {
                Some(t.to_string())
            }
        }
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Calendar-day label in the format the records are keyed by
/// (`Fri Oct 16 2026`).
pub fn date_label(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

pub fn today_label() -> String {
    date_label(Local::now().date_naive())
}

/// Accepts `YYYY-MM-DD` and returns the display label; any other
/// non-empty label is kept verbatim.
pub fn normalize_date_label(raw: &str) -> Option<String> {
    let t = raw.trim();
    if t.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        Ok(d) => Some(date_label(d)),
        Err(_) => Some(t.to_string()),
    }
}

/// Human size the same way the upload list shows it ("12.3 KB").
pub fn size_label(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}
