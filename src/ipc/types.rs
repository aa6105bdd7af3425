use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::book::AttendanceBook;
use crate::config::Config;
use crate::db::SqliteBlobStore;
use crate::guard::AnalysisGuard;
use crate::oracle::{GeminiOracle, IntentOracle, UnavailableOracle};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub config: Config,
    pub workspace: Option<PathBuf>,
    pub book: Option<AttendanceBook>,
    pub oracle: Box<dyn IntentOracle>,
    pub guard: AnalysisGuard,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let oracle: Box<dyn IntentOracle> = match GeminiOracle::from_config(&config) {
            Ok(o) => Box::new(o),
            Err(e) => {
                tracing::warn!(error = %e, "AI features disabled");
                Box::new(UnavailableOracle::new(e.to_string()))
            }
        };
        Self::with_oracle(config, oracle)
    }

    pub fn with_oracle(config: Config, oracle: Box<dyn IntentOracle>) -> Self {
        Self {
            config,
            workspace: None,
            book: None,
            oracle,
            guard: AnalysisGuard::new(),
        }
    }

    /// Opens (or creates) the workspace database and loads the book from it.
    /// Any analysis started against the previous workspace becomes stale.
    pub fn open_workspace(&mut self, path: &Path) -> anyhow::Result<()> {
        self.close_workspace();
        let store = SqliteBlobStore::open(path)?;
        self.book = Some(AttendanceBook::load(Box::new(store)));
        self.workspace = Some(path.to_path_buf());
        tracing::info!(workspace = %path.display(), "workspace opened");
        Ok(())
    }

    pub fn close_workspace(&mut self) {
        self.book = None;
        self.workspace = None;
        self.guard.invalidate();
    }
}
