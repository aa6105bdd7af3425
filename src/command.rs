//! Local-first interpretation of spoken or typed attendance commands.
//!
//! Only plainly unambiguous utterances are resolved here. Anything with an
//! exception clause or mixed statuses is left for the AI service.

use crate::model::AttendanceStatus;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static NUMBER_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|thirteen|fourteen|fifteen|sixteen|seventeen|eighteen|nineteen|twenty)\b",
    )
    .expect("number word pattern")
});
static EXCEPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(except|but)\b").expect("exception pattern"));
static PRESENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(pres\w*|p)\b").expect("present pattern"));
static ABSENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(abs\w*)\b").expect("absent pattern"));
static EVERYONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(all|everyone|everybody)\b").expect("everyone pattern"));
static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("digits pattern"));

fn number_word_value(word: &str) -> &'static str {
    match word {
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "ten" => "10",
        "eleven" => "11",
        "twelve" => "12",
        "thirteen" => "13",
        "fourteen" => "14",
        "fifteen" => "15",
        "sixteen" => "16",
        "seventeen" => "17",
        "eighteen" => "18",
        "nineteen" => "19",
        _ => "20",
    }
}

/// "mark three and Four absent" -> "mark 3 and 4 absent" (lowercased).
pub fn normalize_utterance(text: &str) -> String {
    NUMBER_WORDS
        .replace_all(text, |caps: &regex::Captures| {
            number_word_value(&caps[1].to_lowercase()).to_string()
        })
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    /// Needs the AI service.
    Unresolved,
    /// Mark everyone in the current class.
    Bulk { status: AttendanceStatus },
    /// One update per roll number.
    Point {
        rolls: Vec<u64>,
        status: AttendanceStatus,
    },
}

pub fn interpret_locally(utterance: &str) -> Interpretation {
    let text = normalize_utterance(utterance);

    if EXCEPTION.is_match(&text) || (PRESENT.is_match(&text) && ABSENT.is_match(&text)) {
        return Interpretation::Unresolved;
    }

    let status = if PRESENT.is_match(&text) {
        AttendanceStatus::Present
    } else if ABSENT.is_match(&text) {
        AttendanceStatus::Absent
    } else {
        return Interpretation::Unresolved;
    };

    if EVERYONE.is_match(&text) {
        return Interpretation::Bulk { status };
    }

    let rolls: Vec<u64> = DIGITS
        .find_iter(&text)
        .filter_map(|m| m.as_str().parse::<u64>().ok())
        .collect();
    if rolls.is_empty() {
        return Interpretation::Unresolved;
    }
    Interpretation::Point { rolls, status }
}

/// A single attendance action, whichever interpreter produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AgentAction {
    #[serde(rename_all = "camelCase")]
    Mark {
        roll_no: String,
        status: AttendanceStatus,
    },
    MarkAll { status: AttendanceStatus },
}

pub const TOOL_MARK: &str = "markAttendance";
pub const TOOL_MARK_ALL: &str = "markAllAttendance";

fn tool_status(args: &Value) -> Option<AttendanceStatus> {
    let status = AttendanceStatus::parse(args.get("status")?.as_str()?)?;
    match status {
        AttendanceStatus::Present | AttendanceStatus::Absent | AttendanceStatus::Late => {
            Some(status)
        }
        _ => None,
    }
}

impl AgentAction {
    /// Validates a tool call from the AI service. Unknown tools, missing
    /// arguments and statuses outside the declared enum are dropped.
    pub fn from_tool_call(name: &str, args: &Value) -> Option<Self> {
        match name {
            TOOL_MARK => {
                let roll_no = match args.get("rollNo")? {
                    Value::String(s) => s.trim().to_string(),
                    Value::Number(n) => n.to_string(),
                    _ => return None,
                };
                if roll_no.is_empty() {
                    return None;
                }
                Some(Self::Mark {
                    roll_no,
                    status: tool_status(args)?,
                })
            }
            TOOL_MARK_ALL => Some(Self::MarkAll {
                status: tool_status(args)?,
            }),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Mark { roll_no, status } => format!("Marked Roll {} as {}", roll_no, status.as_str()),
            Self::MarkAll { status } => format!("Marked everyone as {}", status.as_str()),
        }
    }
}

impl Interpretation {
    pub fn into_actions(self) -> Vec<AgentAction> {
        match self {
            Self::Unresolved => Vec::new(),
            Self::Bulk { status } => vec![AgentAction::MarkAll { status }],
            Self::Point { rolls, status } => rolls
                .into_iter()
                .map(|r| AgentAction::Mark {
                    roll_no: r.to_string(),
                    status,
                })
                .collect(),
        }
    }
}
