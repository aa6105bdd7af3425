use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ORACLE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_VISION_MODEL: &str = "gemini-3-pro-preview";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub api_key: Option<String>,
    pub oracle_url: String,
    pub vision_model: String,
    pub text_model: String,
    pub oracle_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            api_key: None,
            oracle_url: DEFAULT_ORACLE_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            oracle_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();
        Self {
            workspace: get("ATTENDANCED_WORKSPACE").map(PathBuf::from),
            api_key: get("GEMINI_API_KEY").or_else(|| get("API_KEY")),
            oracle_url: get("ATTENDANCED_ORACLE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.oracle_url),
            vision_model: get("ATTENDANCED_VISION_MODEL").unwrap_or(defaults.vision_model),
            text_model: get("ATTENDANCED_TEXT_MODEL").unwrap_or(defaults.text_model),
            oracle_timeout: get("ATTENDANCED_ORACLE_TIMEOUT_SECS")
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.oracle_timeout),
            log_format: match get("ATTENDANCED_LOG_FORMAT").as_deref() {
                Some("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
        }
    }
}
