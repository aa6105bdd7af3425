//! The sheet side of import and export.
//!
//! Sheets arrive as CSV text. A header row is searched for near the top
//! because exported registers usually carry a title block above the table.

use crate::error::{AttendanceError, Result};
use crate::model::{AttendanceRecord, AttendanceStatus, Observation, Student};
use crate::roster::ImportRow;
use once_cell::sync::Lazy;
use regex::Regex;

const HEADER_SCAN_ROWS: usize = 20;

static ROLL_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)roll|id|no").expect("roll header"));
static NAME_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)name|student").expect("name header"));
static STATUS_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)status|attend|p/a").expect("status header"));

pub fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

pub fn parse_csv_record(line: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '"' {
            if in_quotes && chars.peek() == Some(&'"') {
                buf.push('"');
                chars.next();
                continue;
            }
            in_quotes = !in_quotes;
            continue;
        }
        if ch == ',' && !in_quotes {
            out.push(std::mem::take(&mut buf));
            continue;
        }
        buf.push(ch);
    }
    out.push(buf);
    out
}

/// A parsed sheet: raw cell grid, no header interpretation yet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    rows: Vec<Vec<String>>,
}

/// Data rows keyed by the header labels, in column order.
pub type SheetRow = Vec<(String, String)>;

impl Sheet {
    pub fn from_csv(text: &str) -> Self {
        let rows = text
            .trim_start_matches('\u{feff}')
            .lines()
            .map(|l| {
                parse_csv_record(l.trim_end_matches('\r'))
                    .into_iter()
                    .map(|c| c.trim().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.is_empty()))
    }

    fn find_header(&self, accept: impl Fn(&[String]) -> bool) -> usize {
        self.rows
            .iter()
            .take(HEADER_SCAN_ROWS)
            .position(|row| {
                let lower: Vec<String> = row.iter().map(|c| c.to_lowercase()).collect();
                accept(&lower)
            })
            .unwrap_or(0)
    }

    /// Header for a class list: a row naming both a roll column and a name
    /// column. Falls back to the first row.
    pub fn roster_header_row(&self) -> usize {
        self.find_header(|row| {
            row.iter()
                .any(|c| c.contains("roll") || c.contains("id") || c.contains("no"))
                && row.iter().any(|c| c.contains("name") || c.contains("student"))
        })
    }

    /// Header for an attendance sheet: any row mentioning roll or name.
    pub fn attendance_header_row(&self) -> usize {
        self.find_header(|row| row.iter().any(|c| c.contains("roll") || c.contains("name")))
    }

    /// Rows under `header_idx`, each keyed by header label. Blank rows and
    /// unlabeled columns are skipped.
    pub fn rows_from(&self, header_idx: usize) -> Vec<SheetRow> {
        let Some(header) = self.rows.get(header_idx) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .skip(header_idx + 1)
            .filter(|r| r.iter().any(|c| !c.is_empty()))
            .map(|r| {
                header
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| !h.is_empty())
                    .map(|(i, h)| (h.clone(), r.get(i).cloned().unwrap_or_default()))
                    .collect()
            })
            .collect()
    }
}

fn column<'a>(row: &'a SheetRow, pick: impl Fn(&str) -> bool) -> Option<&'a str> {
    row.iter()
        .find(|(h, _)| pick(h))
        .map(|(_, v)| v.as_str())
}

/// Student rows from a class-list sheet, already filtered of unusable rows.
pub fn roster_rows(sheet: &Sheet) -> Vec<ImportRow> {
    sheet
        .rows_from(sheet.roster_header_row())
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let roll_no = column(row, |h| ROLL_HEADER.is_match(h))
                .map(|v| v.to_string())
                .unwrap_or_else(|| (i + 1).to_string());
            let name = column(row, |h| NAME_HEADER.is_match(h) && !ROLL_HEADER.is_match(h))
                .filter(|v| !v.is_empty())
                .unwrap_or("Unknown")
                .to_string();
            ImportRow { name, roll_no }
        })
        .filter(|r| r.is_usable())
        .collect()
}

fn sheet_status(cell: &str) -> AttendanceStatus {
    let v = cell.trim().to_uppercase();
    if v.starts_with('A') || v.contains("ABSENT") {
        AttendanceStatus::Absent
    } else {
        AttendanceStatus::Present
    }
}

/// Observations from an attendance sheet. Rows without a roll are dropped;
/// a missing or unreadable status cell reads as PRESENT.
pub fn attendance_rows(sheet: &Sheet, class_hint: Option<&str>) -> Vec<Observation> {
    sheet
        .rows_from(sheet.attendance_header_row())
        .iter()
        .filter_map(|row| {
            let roll = column(row, |h| ROLL_HEADER.is_match(h))?.trim();
            if roll.is_empty() {
                return None;
            }
            let status = column(row, |h| STATUS_HEADER.is_match(h))
                .map(sheet_status)
                .unwrap_or(AttendanceStatus::Present);
            let mut obs = Observation::new(roll, status);
            obs.class_name = class_hint.map(|s| s.to_string());
            Some(obs)
        })
        .collect()
}

/// Pivot of a class: `Roll No`, `Name`, then one `<date> (FN|AN)` column per
/// recorded session in first-seen order.
pub fn export_pivot(students: &[Student], records: &[AttendanceRecord]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec!["Roll No".to_string(), "Name".to_string()];
    let mut rows = Vec::with_capacity(students.len());
    for student in students {
        let mut row = vec![student.roll_no.clone(), student.name.clone()];
        row.resize(headers.len(), String::new());
        for r in records.iter().filter(|r| r.student_id == student.id) {
            let key = format!("{} ({})", r.date, r.session.short_label());
            let idx = match headers.iter().position(|h| *h == key) {
                Some(idx) => idx,
                None => {
                    headers.push(key);
                    headers.len() - 1
                }
            };
            if row.len() <= idx {
                row.resize(idx + 1, String::new());
            }
            row[idx] = r.status.as_str().to_string();
        }
        rows.push(row);
    }
    for row in &mut rows {
        row.resize(headers.len(), String::new());
    }
    (headers, rows)
}

pub fn to_csv(headers: &[String], rows: &[Vec<String>]) -> String {
    let line = |cells: &[String]| {
        cells
            .iter()
            .map(|c| csv_quote(c))
            .collect::<Vec<_>>()
            .join(",")
    };
    let mut out = line(headers);
    out.push('\n');
    for row in rows {
        out.push_str(&line(row));
        out.push('\n');
    }
    out
}

/// Class name taken from an uploaded file name (`10-A.csv` -> `10-A`).
pub fn file_stem(file_name: &str) -> Option<String> {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    let stem = base.split('.').next().unwrap_or("").trim();
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

pub fn require_rows<T>(rows: Vec<T>, what: &str) -> Result<Vec<T>> {
    if rows.is_empty() {
        return Err(AttendanceError::MalformedInput(format!(
            "no {what} found in sheet"
        )));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Session;

    #[test]
    fn quoted_cells_keep_commas_and_quotes() {
        assert_eq!(
            parse_csv_record(r#"1,"Das, Krishna","say ""hi""""#),
            vec!["1", "Das, Krishna", r#"say "hi""#]
        );
        assert_eq!(csv_quote("a,b"), "\"a,b\"");
        assert_eq!(csv_quote("plain"), "plain");
    }

    #[test]
    fn roster_header_is_found_below_a_title_block() {
        let sheet = Sheet::from_csv(
            "St. Mary's School,,\n\
             Term 1 register,,\n\
             Roll No,Student Name,Remarks\n\
             1,Aarav Patel,\n\
             2,Unknown,\n\
             ,Vivaan Singh,\n\
             ,,\n\
             3,Aditya Sharma,ok\n",
        );
        assert_eq!(sheet.roster_header_row(), 2);
        let rows = roster_rows(&sheet);
        assert_eq!(
            rows,
            vec![
                ImportRow {
                    name: "Aarav Patel".into(),
                    roll_no: "1".into()
                },
                ImportRow {
                    name: "Aditya Sharma".into(),
                    roll_no: "3".into()
                },
            ]
        );
    }

    #[test]
    fn roster_without_roll_column_numbers_rows() {
        let sheet = Sheet::from_csv("Name\nMeera\nNikhil\n");
        let rows = roster_rows(&sheet);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].roll_no, "2");
    }

    #[test]
    fn attendance_sheet_reads_status_letters() {
        let sheet = Sheet::from_csv(
            "Roll,Name,P/A\n\
             1,Aarav,P\n\
             2,Vivaan,A\n\
             3,Aditya,absent\n\
             4,Vihaan,\n\
             ,Nobody,A\n",
        );
        let obs = attendance_rows(&sheet, Some("10-A"));
        assert_eq!(obs.len(), 4);
        let statuses: Vec<_> = obs.iter().map(|o| o.status.clone().unwrap_or_default()).collect();
        assert_eq!(statuses, vec!["PRESENT", "ABSENT", "ABSENT", "PRESENT"]);
        assert!(obs.iter().all(|o| o.class_name.as_deref() == Some("10-A")));
    }

    #[test]
    fn export_pivot_adds_one_column_per_session() {
        let students = vec![
            Student {
                id: "s1".into(),
                class_id: "c".into(),
                name: "Aarav".into(),
                roll_no: "1".into(),
            },
            Student {
                id: "s2".into(),
                class_id: "c".into(),
                name: "Vivaan".into(),
                roll_no: "2".into(),
            },
        ];
        let records = vec![
            AttendanceRecord {
                student_id: "s2".into(),
                date: "Fri Oct 16 2026".into(),
                session: Session::Afternoon,
                status: AttendanceStatus::Absent,
            },
            AttendanceRecord {
                student_id: "s1".into(),
                date: "Fri Oct 16 2026".into(),
                session: Session::Forenoon,
                status: AttendanceStatus::Present,
            },
        ];
        let (headers, rows) = export_pivot(&students, &records);
        assert_eq!(
            headers,
            vec![
                "Roll No",
                "Name",
                "Fri Oct 16 2026 (FN)",
                "Fri Oct 16 2026 (AN)"
            ]
        );
        assert_eq!(rows[0], vec!["1", "Aarav", "PRESENT", ""]);
        assert_eq!(rows[1], vec!["2", "Vivaan", "", "ABSENT"]);
        let csv = to_csv(&headers, &rows);
        assert!(csv.starts_with("Roll No,Name,Fri Oct 16 2026 (FN),Fri Oct 16 2026 (AN)\n"));
    }

    #[test]
    fn file_stem_strips_path_and_extensions() {
        assert_eq!(file_stem("/tmp/CSE-B.xlsx").as_deref(), Some("CSE-B"));
        assert_eq!(file_stem("10-A.att.csv").as_deref(), Some("10-A"));
        assert_eq!(file_stem(".csv"), None);
    }
}
