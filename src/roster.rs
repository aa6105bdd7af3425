use crate::error::{AttendanceError, Result};
use crate::model::{ClassInfo, Student};
use uuid::Uuid;

const SEED_NAMES: [&str; 15] = [
    "Aarav Patel",
    "Vivaan Singh",
    "Aditya Sharma",
    "Vihaan Gupta",
    "Arjun Kumar",
    "Sai Iyer",
    "Reyansh Reddy",
    "Krishna Das",
    "Ishaan Joshi",
    "Shaurya Verma",
    "Rohan Mehta",
    "Atharv Malhotra",
    "Kabir Saxena",
    "Rudra Bhat",
    "Ayan Nair",
];

pub fn seed_classes() -> Vec<ClassInfo> {
    vec![
        ClassInfo {
            id: "c1".to_string(),
            name: "Class 10-A".to_string(),
            total_students: SEED_NAMES.len() as i64,
        },
        ClassInfo {
            id: "c2".to_string(),
            name: "Class 11-B".to_string(),
            total_students: 0,
        },
    ]
}

pub fn seed_students() -> Vec<Student> {
    SEED_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| Student {
            id: format!("s-{}", i + 1),
            class_id: "c1".to_string(),
            name: name.to_string(),
            roll_no: (i + 1).to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StudentField {
    Name,
    RollNo,
}

impl StudentField {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "name" => Some(Self::Name),
            "rollNo" | "roll_no" => Some(Self::RollNo),
            _ => None,
        }
    }
}

/// One row handed over by the tabular codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub name: String,
    pub roll_no: String,
}

impl ImportRow {
    pub fn is_usable(&self) -> bool {
        let name = self.name.trim();
        !name.is_empty() && name != "Unknown" && !self.roll_no.trim().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RosterStore {
    classes: Vec<ClassInfo>,
    students: Vec<Student>,
}

impl RosterStore {
    pub fn new(classes: Vec<ClassInfo>, students: Vec<Student>) -> Self {
        Self { classes, students }
    }

    pub fn seeded() -> Self {
        Self::new(seed_classes(), seed_students())
    }

    pub fn classes(&self) -> &[ClassInfo] {
        &self.classes
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn class(&self, class_id: &str) -> Option<&ClassInfo> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn students_in(&self, class_id: &str) -> Vec<Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .cloned()
            .collect()
    }

    pub fn student_count(&self, class_id: &str) -> usize {
        self.students.iter().filter(|s| s.class_id == class_id).count()
    }

    /// Case-insensitive containment of `hint` in a class name.
    pub fn class_by_hint(&self, hint: &str) -> Option<&ClassInfo> {
        let needle = hint.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.classes
            .iter()
            .find(|c| c.name.to_lowercase().contains(&needle))
    }

    pub fn add_class(&mut self, name: &str) -> Result<ClassInfo> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::MalformedInput(
                "class name must not be empty".to_string(),
            ));
        }
        let class = ClassInfo {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            total_students: 0,
        };
        self.classes.push(class.clone());
        Ok(class)
    }

    pub fn rename_class(&mut self, class_id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AttendanceError::MalformedInput(
                "class name must not be empty".to_string(),
            ));
        }
        let class = self
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .ok_or_else(|| AttendanceError::not_found("class", class_id))?;
        class.name = name.to_string();
        Ok(())
    }

    /// Removes the class and its students. Returns the removed student ids.
    pub fn delete_class(&mut self, class_id: &str) -> Result<Vec<String>> {
        if self.class(class_id).is_none() {
            return Err(AttendanceError::not_found("class", class_id));
        }
        self.classes.retain(|c| c.id != class_id);
        let mut removed = Vec::new();
        self.students.retain(|s| {
            if s.class_id == class_id {
                removed.push(s.id.clone());
                false
            } else {
                true
            }
        });
        Ok(removed)
    }

    pub fn add_student(&mut self, class_id: &str, name: &str, roll_no: &str) -> Result<Student> {
        if self.class(class_id).is_none() {
            return Err(AttendanceError::not_found("class", class_id));
        }
        let row = ImportRow {
            name: name.trim().to_string(),
            roll_no: roll_no.trim().to_string(),
        };
        if !row.is_usable() {
            return Err(AttendanceError::MalformedInput(
                "student needs a name and a roll number".to_string(),
            ));
        }
        let student = Student {
            id: Uuid::new_v4().to_string(),
            class_id: class_id.to_string(),
            name: row.name,
            roll_no: row.roll_no,
        };
        self.students.push(student.clone());
        Ok(student)
    }

    pub fn update_student_field(
        &mut self,
        student_id: &str,
        field: StudentField,
        value: &str,
    ) -> Result<Student> {
        let student = self
            .students
            .iter_mut()
            .find(|s| s.id == student_id)
            .ok_or_else(|| AttendanceError::not_found("student", student_id))?;
        match field {
            StudentField::Name => student.name = value.to_string(),
            StudentField::RollNo => student.roll_no = value.to_string(),
        }
        Ok(student.clone())
    }

    /// Appends the usable rows to an existing class.
    pub fn import_students(&mut self, class_id: &str, rows: &[ImportRow]) -> Result<Vec<Student>> {
        if self.class(class_id).is_none() {
            return Err(AttendanceError::not_found("class", class_id));
        }
        let created: Vec<Student> = rows
            .iter()
            .filter(|r| r.is_usable())
            .map(|r| Student {
                id: Uuid::new_v4().to_string(),
                class_id: class_id.to_string(),
                name: r.name.trim().to_string(),
                roll_no: r.roll_no.trim().to_string(),
            })
            .collect();
        self.students.extend(created.iter().cloned());
        Ok(created)
    }

    /// Creates a class from a sheet. Nothing is created when no row is usable.
    pub fn import_class(&mut self, name: &str, rows: &[ImportRow]) -> Result<(ClassInfo, Vec<Student>)> {
        let usable = rows.iter().filter(|r| r.is_usable()).count();
        if usable == 0 {
            return Err(AttendanceError::MalformedInput(
                "could not find valid student data".to_string(),
            ));
        }
        let name = if name.trim().is_empty() {
            "Imported Class"
        } else {
            name
        };
        let mut class = self.add_class(name)?;
        let created = self.import_students(&class.id, rows)?;
        class.total_students = created.len() as i64;
        if let Some(stored) = self.classes.iter_mut().find(|c| c.id == class.id) {
            stored.total_students = class.total_students;
        }
        Ok((class, created))
    }

    pub fn search_classes(&self, query: &str) -> Vec<&ClassInfo> {
        let q = query.to_lowercase();
        self.classes
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&q))
            .collect()
    }

    pub fn search_students(&self, query: &str) -> Vec<&Student> {
        let q = query.to_lowercase();
        self.students
            .iter()
            .filter(|s| s.name.to_lowercase().contains(&q) || s.roll_no.to_lowercase().contains(&q))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, roll: &str) -> ImportRow {
        ImportRow {
            name: name.to_string(),
            roll_no: roll.to_string(),
        }
    }

    #[test]
    fn seed_has_fifteen_students_in_first_class() {
        let roster = RosterStore::seeded();
        assert_eq!(roster.classes().len(), 2);
        assert_eq!(roster.students_in("c1").len(), 15);
        assert_eq!(roster.students_in("c2").len(), 0);
        assert_eq!(roster.student("s-3").map(|s| s.roll_no.as_str()), Some("3"));
    }

    #[test]
    fn add_class_starts_empty_with_fresh_id() {
        let mut roster = RosterStore::default();
        let a = roster.add_class("Physics").expect("add");
        let b = roster.add_class("Physics").expect("add");
        assert_ne!(a.id, b.id);
        assert_eq!(a.total_students, 0);
        assert!(roster.add_class("  ").is_err());
    }

    #[test]
    fn delete_class_cascades_students_only_in_that_class() {
        let mut roster = RosterStore::seeded();
        let other = roster.add_class("Other").expect("add");
        roster.add_student(&other.id, "Keep Me", "1").expect("student");

        let removed = roster.delete_class("c1").expect("delete");
        assert_eq!(removed.len(), 15);
        assert!(roster.class("c1").is_none());
        assert!(roster.students().iter().all(|s| s.class_id != "c1"));
        assert_eq!(roster.students_in(&other.id).len(), 1);
        assert!(matches!(
            roster.delete_class("c1"),
            Err(AttendanceError::NotFound { .. })
        ));
    }

    #[test]
    fn import_skips_unknown_and_blank_rows() {
        let mut roster = RosterStore::seeded();
        let rows = vec![
            row("Meera", "21"),
            row("Unknown", "22"),
            row("", "23"),
            row("Nikhil", "  "),
        ];
        let created = roster.import_students("c2", &rows).expect("import");
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].name, "Meera");
        // totalStudents is informational and is not recomputed here.
        assert_eq!(roster.class("c2").map(|c| c.total_students), Some(0));
    }

    #[test]
    fn import_class_sets_total_and_rejects_empty_sheets() {
        let mut roster = RosterStore::default();
        let (class, created) = roster
            .import_class("CSE-B", &[row("A", "1"), row("B", "2")])
            .expect("import");
        assert_eq!(created.len(), 2);
        assert_eq!(class.total_students, 2);
        assert_eq!(roster.class(&class.id).map(|c| c.total_students), Some(2));

        let before = roster.classes().len();
        assert!(roster.import_class("Empty", &[row("Unknown", "1")]).is_err());
        assert_eq!(roster.classes().len(), before);
    }

    #[test]
    fn class_hint_matches_by_containment() {
        let roster = RosterStore::seeded();
        assert_eq!(roster.class_by_hint("10-a").map(|c| c.id.as_str()), Some("c1"));
        assert_eq!(roster.class_by_hint("11").map(|c| c.id.as_str()), Some("c2"));
        assert!(roster.class_by_hint("CSE").is_none());
        assert!(roster.class_by_hint(" ").is_none());
    }

    #[test]
    fn update_field_changes_only_that_field() {
        let mut roster = RosterStore::seeded();
        let s = roster
            .update_student_field("s-1", StudentField::RollNo, "01A")
            .expect("update");
        assert_eq!(s.roll_no, "01A");
        assert_eq!(s.name, "Aarav Patel");
        assert!(roster
            .update_student_field("missing", StudentField::Name, "x")
            .is_err());
    }
}
