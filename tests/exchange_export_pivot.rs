mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn export_pivots_sessions_into_columns() {
    let workspace = temp_dir("attendance-export");
    let out = workspace.path().join("exports").join("c1.csv");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());

    let _ = sc.request_ok(
        "1",
        "attendance.setStatus",
        json!({ "studentId": "s-1", "status": "PRESENT", "date": "2026-10-16", "session": "FORENOON" }),
    );
    let _ = sc.request_ok(
        "2",
        "attendance.setStatus",
        json!({ "studentId": "s-2", "status": "ABSENT", "date": "2026-10-16", "session": "AFTERNOON" }),
    );

    let res = sc.request_ok(
        "3",
        "exchange.exportClassCsv",
        json!({ "classId": "c1", "outPath": out.to_string_lossy() }),
    );
    assert_eq!(res["rowsExported"], 15);
    assert_eq!(
        res["columns"],
        json!(["Roll No", "Name", "Fri Oct 16 2026 (FN)", "Fri Oct 16 2026 (AN)"])
    );

    let text = std::fs::read_to_string(&out).expect("read export");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 16);
    assert_eq!(lines[1], "1,Aarav Patel,PRESENT,");
    assert_eq!(lines[2], "2,Vivaan Singh,,ABSENT");
    assert_eq!(lines[3], "3,Aditya Sharma,,");
}

#[test]
fn export_of_unknown_class_is_not_found() {
    let workspace = temp_dir("attendance-export-missing");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());
    assert_eq!(
        sc.request_err(
            "1",
            "exchange.exportClassCsv",
            json!({ "classId": "zz", "outPath": workspace.path().join("x.csv").to_string_lossy() })
        ),
        "not_found"
    );
}
