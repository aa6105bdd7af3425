mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn csv_sheet_is_analyzed_locally_and_confirmed_through_reconcile() {
    let workspace = temp_dir("attendance-analysis-sheet");
    let sheet = workspace.path().join("10-A.csv");
    std::fs::write(&sheet, "Roll No,Name,Status\n1,Aarav,P\n2,Vivaan,A\n99,Ghost,P\n").expect("write sheet");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());

    let res = sc.request_ok(
        "1",
        "analysis.analyzeFile",
        json!({ "path": sheet.to_string_lossy(), "classId": "c2", "date": "2026-10-16", "session": "FORENOON" }),
    );
    let pending = &res["pending"];
    assert_eq!(pending["classId"], "c1");
    assert_eq!(pending["date"], "Fri Oct 16 2026");
    assert_eq!(pending["observations"].as_array().map(|a| a.len()), Some(3));

    let files = sc.request_ok("2", "files.list", json!({}));
    assert_eq!(files["files"][0]["name"], "10-A.csv");
    assert_eq!(files["files"][0]["type"], "document");

    let confirmed = sc.request_ok(
        "3",
        "attendance.reconcile",
        json!({
            "classId": pending["classId"],
            "date": pending["date"],
            "session": pending["session"],
            "observations": pending["observations"]
        }),
    );
    assert_eq!(confirmed["summary"]["matchedCount"], 2);
    assert_eq!(confirmed["summary"]["unmatchedRolls"], json!(["99"]));
}

#[test]
fn media_without_credential_is_unavailable_and_bad_types_are_rejected() {
    let workspace = temp_dir("attendance-analysis-media");
    let image = workspace.path().join("board.png");
    std::fs::write(&image, [0x89, b'P', b'N', b'G']).expect("write image");
    let mut sc = spawn_sidecar();

    assert_eq!(
        sc.request_err("1", "analysis.analyzeText", json!({ "text": "Absent: 3" })),
        "no_workspace"
    );
    sc.select_workspace(workspace.path());

    assert_eq!(
        sc.request_err("2", "analysis.analyzeFile", json!({ "path": image.to_string_lossy() })),
        "oracle_unavailable"
    );
    assert_eq!(
        sc.request_err(
            "3",
            "analysis.analyzeFile",
            json!({ "path": image.to_string_lossy(), "mimeType": "video/mp4" })
        ),
        "malformed_input"
    );
    assert_eq!(
        sc.request_err("4", "analysis.analyzeText", json!({ "text": "Absent: 3" })),
        "oracle_unavailable"
    );

    let health = sc.request_ok("5", "health", json!({}));
    assert_eq!(health["analysisBusy"], false);
}

#[test]
fn teacher_can_confirm_a_different_class_than_the_one_detected() {
    let workspace = temp_dir("attendance-analysis-override");
    let sheet = workspace.path().join("11-B.csv");
    std::fs::write(&sheet, "Roll No,Name,Status\n1,Aarav,A\n2,Vivaan,P\n").expect("write sheet");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());

    let res = sc.request_ok(
        "1",
        "analysis.analyzeFile",
        json!({ "path": sheet.to_string_lossy(), "date": "2026-10-16", "session": "FORENOON" }),
    );
    let pending = &res["pending"];
    assert_eq!(pending["classId"], "c2");
    assert_eq!(pending["detectedClassName"], "11-B");

    let confirmed = sc.request_ok(
        "2",
        "attendance.reconcile",
        json!({
            "classId": "c1",
            "date": pending["date"],
            "session": pending["session"],
            "observations": pending["observations"]
        }),
    );
    assert_eq!(confirmed["summary"]["classId"], "c1");
    assert_eq!(confirmed["summary"]["matchedCount"], 2);

    let open = sc.request_ok(
        "3",
        "attendance.sessionOpen",
        json!({ "classId": "c1", "date": "Fri Oct 16 2026", "session": "FORENOON" }),
    );
    let row = open["rows"]
        .as_array()
        .expect("rows")
        .iter()
        .find(|r| r["student"]["id"] == "s-1")
        .cloned()
        .expect("s-1 row");
    assert_eq!(row["status"], "ABSENT");
}
