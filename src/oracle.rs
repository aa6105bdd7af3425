//! The AI service seam.
//!
//! Everything the service returns is treated as untrusted: analysis answers
//! become [`Observation`]s and tool calls become [`AgentAction`]s only after
//! validation, and both still go through roll matching before they touch the
//! record store.

use crate::command::{AgentAction, TOOL_MARK, TOOL_MARK_ALL};
use crate::config::Config;
use crate::error::{AttendanceError, Result};
use crate::model::{FileKind, Observation, Student};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::VecDeque;

const TEXT_CONTEXT_LIMIT: usize = 5000;
const SUPPORTED_DOCUMENT_TYPES: [&str; 4] = ["application/pdf", "text/plain", "text/csv", "text/html"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Parsed locally, never sent to the service.
    Sheet,
    Text,
    Image,
    Audio,
    Document,
}

impl UploadKind {
    pub fn file_kind(self) -> FileKind {
        match self {
            Self::Image => FileKind::Image,
            Self::Audio => FileKind::Audio,
            Self::Sheet | Self::Text | Self::Document => FileKind::Document,
        }
    }
}

pub fn guess_mime(file_name: &str) -> String {
    mime_guess::from_path(file_name)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

/// Decides how an upload is handled, rejecting types the service cannot read
/// before anything leaves the machine.
pub fn classify_upload(file_name: &str, mime: &str) -> Result<UploadKind> {
    let name = file_name.to_ascii_lowercase();
    let mime = mime.trim().to_ascii_lowercase();
    if name.ends_with(".csv") || name.ends_with(".xlsx") || name.ends_with(".xls") {
        return Ok(UploadKind::Sheet);
    }
    if name.ends_with(".txt") || mime == "text/plain" {
        return Ok(UploadKind::Text);
    }
    if mime.starts_with("image/") {
        return Ok(UploadKind::Image);
    }
    if mime.starts_with("audio/")
        || name.ends_with(".mp3")
        || name.ends_with(".wav")
        || name.ends_with(".m4a")
    {
        return Ok(UploadKind::Audio);
    }
    if SUPPORTED_DOCUMENT_TYPES.contains(&mime.as_str()) {
        return Ok(UploadKind::Document);
    }
    Err(AttendanceError::MalformedInput(format!(
        "Unsupported file type: {mime}. Please upload an Image, Audio, PDF, or Text file."
    )))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisInput {
    Media {
        kind: UploadKind,
        mime_type: String,
        data: Vec<u8>,
    },
    Text {
        content: String,
    },
}

impl AnalysisInput {
    fn context(&self) -> String {
        match self {
            Self::Media {
                kind: UploadKind::Image,
                ..
            } => "an image of an attendance sheet or whiteboard".to_string(),
            Self::Media {
                kind: UploadKind::Audio,
                ..
            } => "an audio recording of a teacher taking attendance".to_string(),
            Self::Media { .. } => "a document containing attendance info".to_string(),
            Self::Text { content } => {
                let clipped: String = content.chars().take(TEXT_CONTEXT_LIMIT).collect();
                format!("a text document containing attendance info: \"{clipped}...\"")
            }
        }
    }

    fn is_image(&self) -> bool {
        matches!(
            self,
            Self::Media {
                kind: UploadKind::Image,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OracleReply {
    pub actions: Vec<AgentAction>,
    pub text: Option<String>,
    /// Tool calls that failed validation.
    pub rejected_calls: usize,
}

pub trait IntentOracle {
    fn extract_attendance(&self, input: &AnalysisInput, roster: &[Student]) -> Result<Vec<Observation>>;
    fn interpret_command(&self, utterance: &str, roster: &[Student]) -> Result<OracleReply>;
}

pub fn analysis_prompt(roster: &[Student], context: &str) -> String {
    let students: Vec<Value> = roster
        .iter()
        .map(|s| json!({ "rollNo": s.roll_no, "name": s.name }))
        .collect();
    format!(
        "You are an attendance assistant. I am providing {context}.\n\
         Here is the master list of students in the class: {}.\n\
         \n\
         Please analyze the input to extract:\n\
         1. The Class Name (e.g., \"Class 10\", \"ARE\", \"CSE-B\").\n\
         2. The Date (if mentioned/written). Format YYYY-MM-DD. Assume DD/MM/YY if ambiguous.\n\
         3. The Session (if mentioned). Look for \"FN\", \"Forenoon\", \"AN\", \"Afternoon\".\n\
         4. Attendance status of students.\n\
         \n\
         Rules for Status:\n\
         - If the input lists \"Absentees\" or \"Absent\", mark those specific students as ABSENT and everyone else PRESENT.\n\
         - If the input lists \"Present\" students, mark everyone else ABSENT.\n\
         - If status is explicit next to names/rolls, use that.\n\
         \n\
         Return a JSON array of objects with:\n\
         - 'rollNo': Match to the master list.\n\
         - 'status': \"PRESENT\" or \"ABSENT\".\n\
         - 'date': \"YYYY-MM-DD\" or null.\n\
         - 'session': \"FORENOON\" or \"AFTERNOON\" or null.\n\
         - 'className': The extracted class name or null.",
        Value::Array(students)
    )
}

pub fn agent_instruction(roster: &[Student]) -> String {
    let class_list = roster
        .iter()
        .map(|s| format!("Roll {}: {}", s.roll_no, s.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "You are an attendance assistant.\n\
         Current Class List: {class_list}.\n\
         RULES:\n\
         1. For \"Mark all present except 1\", FIRST call '{TOOL_MARK_ALL}(PRESENT)', THEN call '{TOOL_MARK}(1, ABSENT)'.\n\
         2. For \"Mark 1 and 2 present\", call '{TOOL_MARK}' twice.\n\
         3. Confirm actions concisely."
    )
}

fn observation_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "rollNo": { "type": "STRING" },
                "status": { "type": "STRING", "enum": ["PRESENT", "ABSENT"] },
                "date": { "type": "STRING", "nullable": true },
                "session": { "type": "STRING", "nullable": true },
                "className": { "type": "STRING", "nullable": true }
            }
        }
    })
}

fn tool_declarations() -> Value {
    json!([{
        "functionDeclarations": [
            {
                "name": TOOL_MARK,
                "description": "Marks a student as present or absent based on their roll number.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "rollNo": { "type": "STRING", "description": "The roll number of the student" },
                        "status": { "type": "STRING", "enum": ["PRESENT", "ABSENT", "LATE"] }
                    },
                    "required": ["rollNo", "status"]
                }
            },
            {
                "name": TOOL_MARK_ALL,
                "description": "Marks all students in the class with a specific status.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "status": { "type": "STRING", "enum": ["PRESENT", "ABSENT", "LATE"] }
                    },
                    "required": ["status"]
                }
            }
        ]
    }])
}

pub fn analysis_request_body(input: &AnalysisInput, roster: &[Student]) -> Value {
    let prompt = analysis_prompt(roster, &input.context());
    let mut parts = Vec::new();
    if let AnalysisInput::Media { mime_type, data, .. } = input {
        parts.push(json!({
            "inlineData": { "mimeType": mime_type, "data": STANDARD.encode(data) }
        }));
    }
    parts.push(json!({ "text": prompt }));
    json!({
        "contents": [{ "role": "user", "parts": parts }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": observation_schema()
        }
    })
}

pub fn agent_request_body(utterance: &str, roster: &[Student]) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": agent_instruction(roster) }] },
        "contents": [{ "role": "user", "parts": [{ "text": utterance }] }],
        "tools": tool_declarations()
    })
}

fn response_parts(resp: &Value) -> Vec<&Value> {
    resp.pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .map(|parts| parts.iter().collect())
        .unwrap_or_default()
}

fn response_text(resp: &Value) -> Option<String> {
    let text: String = response_parts(resp)
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Reads the JSON array out of a generateContent answer. No text means no
/// observations, not an error.
pub fn parse_analysis_response(resp: &Value) -> Result<Vec<Observation>> {
    let Some(text) = response_text(resp) else {
        return Ok(Vec::new());
    };
    let cleaned = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str::<Vec<Observation>>(cleaned).map_err(|e| {
        AttendanceError::OracleUnavailable(format!("unreadable analysis response: {e}"))
    })
}

pub fn parse_agent_response(resp: &Value) -> OracleReply {
    let mut reply = OracleReply {
        text: response_text(resp),
        ..OracleReply::default()
    };
    for part in response_parts(resp) {
        let Some(call) = part.get("functionCall") else {
            continue;
        };
        let name = call.get("name").and_then(|v| v.as_str()).unwrap_or("");
        let args = call.get("args").cloned().unwrap_or(Value::Null);
        match AgentAction::from_tool_call(name, &args) {
            Some(action) => reply.actions.push(action),
            None => {
                tracing::warn!(tool = name, %args, "dropping invalid tool call");
                reply.rejected_calls += 1;
            }
        }
    }
    reply
}

pub struct GeminiOracle {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
    vision_model: String,
    text_model: String,
}

impl GeminiOracle {
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            AttendanceError::OracleUnavailable(
                "API Key is missing or invalid. Please check your environment variables.".to_string(),
            )
        })?;
        let client = reqwest::blocking::Client::builder()
            .timeout(config.oracle_timeout)
            .build()
            .map_err(|e| AttendanceError::OracleUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.oracle_url.clone(),
            api_key,
            vision_model: config.vision_model.clone(),
            text_model: config.text_model.clone(),
        })
    }

    fn generate(&self, model: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/models/{}:generateContent", self.base_url, model);
        tracing::info!(model, "calling AI service");
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    AttendanceError::OracleUnavailable("request timed out".to_string())
                } else {
                    AttendanceError::OracleUnavailable(e.to_string())
                }
            })?;
        let status = resp.status();
        if !status.is_success() {
            let detail: String = resp.text().unwrap_or_default().chars().take(300).collect();
            return Err(AttendanceError::OracleUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }
        resp.json::<Value>()
            .map_err(|e| AttendanceError::OracleUnavailable(e.to_string()))
    }
}

impl IntentOracle for GeminiOracle {
    fn extract_attendance(&self, input: &AnalysisInput, roster: &[Student]) -> Result<Vec<Observation>> {
        let model = if input.is_image() {
            &self.vision_model
        } else {
            &self.text_model
        };
        let resp = self.generate(model, &analysis_request_body(input, roster))?;
        parse_analysis_response(&resp)
    }

    fn interpret_command(&self, utterance: &str, roster: &[Student]) -> Result<OracleReply> {
        let resp = self.generate(&self.text_model, &agent_request_body(utterance, roster))?;
        Ok(parse_agent_response(&resp))
    }
}

/// Stand-in when no credential is configured; every call fails with the
/// reason it was built with.
pub struct UnavailableOracle {
    reason: String,
}

impl UnavailableOracle {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl IntentOracle for UnavailableOracle {
    fn extract_attendance(&self, _input: &AnalysisInput, _roster: &[Student]) -> Result<Vec<Observation>> {
        Err(AttendanceError::OracleUnavailable(self.reason.clone()))
    }

    fn interpret_command(&self, _utterance: &str, _roster: &[Student]) -> Result<OracleReply> {
        Err(AttendanceError::OracleUnavailable(self.reason.clone()))
    }
}

/// Replays canned answers in order. Used where a real service is not
/// reachable, e.g. tests and offline demos.
#[derive(Default)]
pub struct ScriptedOracle {
    analyses: RefCell<VecDeque<Result<Vec<Observation>>>>,
    replies: RefCell<VecDeque<Result<OracleReply>>>,
    calls: RefCell<usize>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_analysis(&self, answer: Result<Vec<Observation>>) {
        self.analyses.borrow_mut().push_back(answer);
    }

    pub fn push_reply(&self, answer: Result<OracleReply>) {
        self.replies.borrow_mut().push_back(answer);
    }

    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }
}

impl IntentOracle for ScriptedOracle {
    fn extract_attendance(&self, _input: &AnalysisInput, _roster: &[Student]) -> Result<Vec<Observation>> {
        *self.calls.borrow_mut() += 1;
        self.analyses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AttendanceError::OracleUnavailable("no scripted answer".to_string())))
    }

    fn interpret_command(&self, _utterance: &str, _roster: &[Student]) -> Result<OracleReply> {
        *self.calls.borrow_mut() += 1;
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(AttendanceError::OracleUnavailable("no scripted answer".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttendanceStatus;

    fn roster() -> Vec<Student> {
        vec![Student {
            id: "s-1".into(),
            class_id: "c1".into(),
            name: "Aarav Patel".into(),
            roll_no: "1".into(),
        }]
    }

    #[test]
    fn uploads_are_classified_before_any_call() {
        assert_eq!(classify_upload("a.csv", "text/csv").expect("csv"), UploadKind::Sheet);
        assert_eq!(classify_upload("notes.txt", "").expect("txt"), UploadKind::Text);
        assert_eq!(classify_upload("b.jpg", "image/jpeg").expect("jpg"), UploadKind::Image);
        assert_eq!(classify_upload("roll.m4a", "").expect("m4a"), UploadKind::Audio);
        assert_eq!(
            classify_upload("r.pdf", "application/pdf").expect("pdf"),
            UploadKind::Document
        );
        let err = classify_upload("movie.mkv", "video/x-matroska").expect_err("video");
        assert_eq!(err.code(), "malformed_input");
    }

    #[test]
    fn mime_is_guessed_from_extension() {
        assert_eq!(guess_mime("board.png"), "image/png");
        assert_eq!(guess_mime("blob"), "application/octet-stream");
    }

    #[test]
    fn prompts_carry_the_roster() {
        let p = analysis_prompt(&roster(), "an image");
        let listed = p
            .lines()
            .find_map(|l| l.strip_prefix("Here is the master list of students in the class: "))
            .and_then(|l| l.strip_suffix('.'))
            .expect("roster line");
        let listed: Value = serde_json::from_str(listed).expect("roster json");
        assert_eq!(listed, json!([{ "rollNo": "1", "name": "Aarav Patel" }]));
        assert!(agent_instruction(&roster()).contains("Roll 1: Aarav Patel"));
    }

    #[test]
    fn text_input_is_clipped_and_inlined() {
        let input = AnalysisInput::Text {
            content: "x".repeat(6000),
        };
        let body = analysis_request_body(&input, &roster());
        let parts = body["contents"][0]["parts"].as_array().expect("parts");
        assert_eq!(parts.len(), 1);
        let text = parts[0]["text"].as_str().expect("text");
        assert!(text.contains(&"x".repeat(5000)));
        assert!(!text.contains(&"x".repeat(5001)));
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
    }

    #[test]
    fn media_input_is_base64_inline_data() {
        let input = AnalysisInput::Media {
            kind: UploadKind::Image,
            mime_type: "image/png".into(),
            data: b"abc".to_vec(),
        };
        let body = analysis_request_body(&input, &roster());
        assert_eq!(body["contents"][0]["parts"][0]["inlineData"]["data"], "YWJj");
        assert!(input.is_image());
    }

    #[test]
    fn analysis_response_is_parsed_leniently() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [{
                "text": "```json\n[{\"rollNo\": 3, \"status\": \"ABSENT\", \"session\": null}]\n```"
            }]}}]
        });
        let obs = parse_analysis_response(&resp).expect("parse");
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].roll_no.as_deref(), Some("3"));
        assert!(parse_analysis_response(&json!({})).expect("empty").is_empty());
        let bad = json!({ "candidates": [{ "content": { "parts": [{ "text": "sorry" }]}}]});
        assert_eq!(
            parse_analysis_response(&bad).expect_err("bad").code(),
            "oracle_unavailable"
        );
    }

    #[test]
    fn agent_response_keeps_valid_tool_calls_only() {
        let resp = json!({
            "candidates": [{ "content": { "parts": [
                { "functionCall": { "name": "markAllAttendance", "args": { "status": "present" } } },
                { "functionCall": { "name": "markAttendance", "args": { "rollNo": "1", "status": "ABSENT" } } },
                { "functionCall": { "name": "markAttendance", "args": { "status": "ABSENT" } } },
                { "text": "Done." }
            ]}}]
        });
        let reply = parse_agent_response(&resp);
        assert_eq!(
            reply.actions,
            vec![
                AgentAction::MarkAll {
                    status: AttendanceStatus::Present
                },
                AgentAction::Mark {
                    roll_no: "1".into(),
                    status: AttendanceStatus::Absent
                },
            ]
        );
        assert_eq!(reply.rejected_calls, 1);
        assert_eq!(reply.text.as_deref(), Some("Done."));
    }

    #[test]
    fn missing_key_means_unavailable() {
        let err = GeminiOracle::from_config(&Config::default())
            .err()
            .expect("no key");
        assert_eq!(err.code(), "oracle_unavailable");
    }
}
