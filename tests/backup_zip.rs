mod test_support;

use serde_json::json;
use std::fs::File;
use std::io::Read;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn bundle_export_and_import_restore_the_book() {
    let workspace = temp_dir("attendance-backup-src");
    let restored = temp_dir("attendance-backup-dst");
    let bundle = workspace.path().join("out").join("workspace.zip");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());

    let _ = sc.request_ok("1", "profile.setTeacherName", json!({ "name": "Ms. Rao" }));
    let _ = sc.request_ok(
        "2",
        "attendance.setStatus",
        json!({ "studentId": "s-9", "status": "LATE", "date": "2026-10-16", "session": "FORENOON" }),
    );
    let export = sc.request_ok(
        "3",
        "backup.exportWorkspaceBundle",
        json!({ "outPath": bundle.to_string_lossy() }),
    );
    assert_eq!(export["entryCount"], 2);
    let sha = export["dbSha256"].as_str().expect("sha").to_string();
    assert_eq!(sha.len(), 64);

    let f = File::open(&bundle).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(&sha));
    archive
        .by_name("db/attendance.sqlite3")
        .expect("database entry in bundle");

    let import = sc.request_ok(
        "4",
        "backup.importWorkspaceBundle",
        json!({ "inPath": bundle.to_string_lossy(), "workspacePath": restored.path().to_string_lossy() }),
    );
    assert_eq!(import["dbSha256"], sha);

    let health = sc.request_ok("5", "health", json!({}));
    assert_eq!(health["workspacePath"], restored.path().to_string_lossy().to_string());
    let profile = sc.request_ok("6", "profile.get", json!({}));
    assert_eq!(profile["teacherName"], "Ms. Rao");
    let history = sc.request_ok("7", "attendance.studentHistory", json!({ "studentId": "s-9" }));
    assert_eq!(history["records"][0]["status"], "LATE");
}

#[test]
fn missing_bundle_keeps_current_workspace() {
    let workspace = temp_dir("attendance-backup-missing");
    let mut sc = spawn_sidecar();
    sc.select_workspace(workspace.path());
    assert_eq!(
        sc.request_err(
            "1",
            "backup.importWorkspaceBundle",
            json!({ "inPath": workspace.path().join("nope.zip").to_string_lossy() })
        ),
        "not_found"
    );
    let _ = sc.request_ok("2", "profile.get", json!({}));
}
