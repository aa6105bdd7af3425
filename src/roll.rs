//! Roll-number matching.
//!
//! Roll numbers are free-form labels typed by teachers ("07", "Roll 7.",
//! "CS-12") and free-form strings produced by the AI service. Both sides go
//! through the same normalization before comparison.

use crate::model::Student;

/// Canonical form: trimmed, lowercased, alphanumerics only.
pub fn normalize_roll(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn numeric_roll(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok()
}

/// First student in `scope` whose roll matches `candidate`.
///
/// Exact match on the normalized form wins; failing that, a candidate that
/// parses as an integer is compared numerically so "07" and "7" meet.
pub fn match_roll<'a>(candidate: &str, scope: &'a [Student]) -> Option<&'a Student> {
    let wanted = normalize_roll(candidate);
    if !wanted.is_empty() {
        if let Some(s) = scope.iter().find(|s| normalize_roll(&s.roll_no) == wanted) {
            return Some(s);
        }
    }
    let n = numeric_roll(&wanted)?;
    scope
        .iter()
        .find(|s| numeric_roll(&normalize_roll(&s.roll_no)) == Some(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(id: &str, roll: &str) -> Student {
        Student {
            id: id.to_string(),
            class_id: "c1".to_string(),
            name: format!("Student {id}"),
            roll_no: roll.to_string(),
        }
    }

    #[test]
    fn leading_zeros_match_in_both_directions() {
        let seven = vec![student("a", "7")];
        let zero_seven = vec![student("b", "07")];
        assert_eq!(match_roll("07", &seven).map(|s| s.id.as_str()), Some("a"));
        assert_eq!(match_roll("7", &zero_seven).map(|s| s.id.as_str()), Some("b"));
    }

    #[test]
    fn punctuation_and_case_are_ignored() {
        let scope = vec![student("a", "CS-12"), student("b", "13")];
        assert_eq!(match_roll(" cs12 ", &scope).map(|s| s.id.as_str()), Some("a"));
        assert_eq!(match_roll("13.", &scope).map(|s| s.id.as_str()), Some("b"));
    }

    #[test]
    fn first_by_scan_wins_on_duplicate_rolls() {
        let scope = vec![student("first", "5"), student("second", "5")];
        assert_eq!(match_roll("5", &scope).map(|s| s.id.as_str()), Some("first"));
    }

    #[test]
    fn unknown_or_empty_candidates_do_not_match() {
        let scope = vec![student("a", "1")];
        assert!(match_roll("999", &scope).is_none());
        assert!(match_roll("", &scope).is_none());
        assert!(match_roll("--", &scope).is_none());
    }
}
