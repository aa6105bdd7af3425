use thiserror::Error;

#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("AI service unavailable: {0}")]
    OracleUnavailable(String),

    #[error("{0}")]
    MalformedInput(String),

    #[error("storage failed: {0}")]
    Storage(String),

    #[error("another analysis is already running")]
    Busy,
}

impl AttendanceError {
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }

    /// Stable code used in the IPC error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::OracleUnavailable(_) => "oracle_unavailable",
            Self::MalformedInput(_) => "malformed_input",
            Self::Storage(_) => "storage_failed",
            Self::Busy => "busy",
        }
    }
}

impl From<rusqlite::Error> for AttendanceError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AttendanceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AttendanceError>;
