mod test_support;

use serde_json::json;
use test_support::{spawn_sidecar, temp_dir};

#[test]
fn corrupt_blob_loads_the_seed_without_an_error() {
    let workspace = temp_dir("attendance-seed-fallback");
    {
        let mut sc = spawn_sidecar();
        sc.select_workspace(workspace.path());
        let _ = sc.request_ok("1", "students.create", json!({ "classId": "c2", "name": "Asha", "rollNo": "1" }));
    }

    let conn = rusqlite::Connection::open(workspace.path().join("attendance.sqlite3")).expect("open db");
    conn.execute("UPDATE blobs SET value = '{broken' WHERE key = 'students'", [])
        .expect("corrupt students");
    drop(conn);

    let mut sc = spawn_sidecar();
    let selected = sc.select_workspace(workspace.path());
    assert_eq!(selected["studentCount"], 15);
    let c2 = sc.request_ok("2", "students.list", json!({ "classId": "c2" }));
    assert_eq!(c2["students"].as_array().map(|a| a.len()), Some(0));
    let profile = sc.request_ok("3", "profile.get", json!({}));
    assert_eq!(profile["teacherName"], "Mr. Anderson");
}

#[test]
fn workspace_env_var_opens_on_startup() {
    use std::io::{BufRead, BufReader, Write};
    use std::process::{Command, Stdio};

    let workspace = temp_dir("attendance-env-workspace");
    let mut child = Command::new(env!("CARGO_BIN_EXE_attendanced"))
        .env("ATTENDANCED_WORKSPACE", workspace.path())
        .env_remove("GEMINI_API_KEY")
        .env_remove("API_KEY")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn attendanced");
    let mut stdin = child.stdin.take().expect("stdin");
    let mut reader = BufReader::new(child.stdout.take().expect("stdout"));

    writeln!(stdin, "{}", json!({ "id": "1", "method": "health", "params": {} })).expect("write");
    stdin.flush().expect("flush");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read");
    let v: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(v["result"]["workspacePath"], workspace.path().to_string_lossy().to_string());
    assert!(workspace.path().join("attendance.sqlite3").is_file());

    drop(stdin);
    let _ = child.wait();
}
