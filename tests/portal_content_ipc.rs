use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_classroomd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn classroomd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> &str {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

fn sign_up(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    email: &str,
    first_name: &str,
) {
    let _ = request_ok(
        stdin,
        reader,
        id,
        "auth.signUp",
        json!({
            "email": email,
            "firstName": first_name,
            "password1": "correct-horse",
            "password2": "correct-horse"
        }),
    );
}

fn open_workspace(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    prefix: &str,
) -> PathBuf {
    let workspace = temp_dir(prefix);
    let _ = request_ok(
        stdin,
        reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    workspace
}

#[test]
fn games_upload_list_and_download() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = open_workspace(&mut stdin, &mut reader, "classroomd-games");
    sign_up(&mut stdin, &mut reader, "su", "gamer@example.com", "Gail");

    let source = workspace.join("snake.html");
    std::fs::write(&source, b"<html><body>snake</body></html>").expect("write game");
    let up = request_ok(
        &mut stdin,
        &mut reader,
        "up",
        "games.upload",
        json!({
            "sourcePath": source.to_string_lossy(),
            "title": "Snake",
            "description": "Eat the dots.",
            "instructions": "Arrow keys."
        }),
    );
    let game_id = up.get("gameId").and_then(|v| v.as_i64()).expect("gameId");

    let listed = request_ok(&mut stdin, &mut reader, "list", "games.list", json!({}));
    let games = listed.get("games").and_then(|v| v.as_array()).cloned().expect("games");
    assert_eq!(games.len(), 1);
    assert_eq!(games[0].get("title").and_then(|v| v.as_str()), Some("Snake"));
    assert_eq!(games[0].get("fileType").and_then(|v| v.as_str()), Some("web"));
    assert_eq!(games[0].get("downloads").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(games[0].get("uploader").and_then(|v| v.as_str()), Some("Gail"));

    for expected in 1..=2 {
        let dl = request_ok(
            &mut stdin,
            &mut reader,
            &format!("dl{expected}"),
            "games.download",
            json!({ "gameId": game_id }),
        );
        assert_eq!(dl.get("downloads").and_then(|v| v.as_i64()), Some(expected));
        assert_eq!(dl.get("filename").and_then(|v| v.as_str()), Some("snake.html"));
        let path = dl.get("path").and_then(|v| v.as_str()).expect("path");
        assert_eq!(
            std::fs::read(path).expect("stored game"),
            b"<html><body>snake</body></html>"
        );
    }

    let missing = request(
        &mut stdin,
        &mut reader,
        "missing",
        "games.download",
        json!({ "gameId": game_id + 100 }),
    );
    assert_eq!(error_code(&missing), "not_found");
}

#[test]
fn game_uploads_reject_bad_files() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = open_workspace(&mut stdin, &mut reader, "classroomd-games-bad");
    sign_up(&mut stdin, &mut reader, "su", "gamer@example.com", "Gail");

    let exe = workspace.join("game.exe");
    std::fs::write(&exe, b"MZ").expect("write exe");
    let fake_zip = workspace.join("game.zip");
    std::fs::write(&fake_zip, b"not a zip").expect("write zip");

    for (i, path) in [exe, fake_zip, workspace.join("nope.py")].iter().enumerate() {
        let res = request(
            &mut stdin,
            &mut reader,
            &format!("bad{i}"),
            "games.upload",
            json!({
                "sourcePath": path.to_string_lossy(),
                "title": "Bad",
                "description": "Bad",
                "instructions": "None"
            }),
        );
        assert_eq!(error_code(&res), "bad_params");
    }

    let listed = request_ok(&mut stdin, &mut reader, "list", "games.list", json!({}));
    assert_eq!(
        listed.get("games").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
}

#[test]
fn notes_share_and_delete() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let workspace = open_workspace(&mut stdin, &mut reader, "classroomd-notes");
    sign_up(&mut stdin, &mut reader, "su1", "author@example.com", "Ann");

    let attachment = workspace.join("worksheet.txt");
    std::fs::write(&attachment, b"fractions").expect("write attachment");
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "n1",
        "notes.create",
        json!({
            "data": "Bring calculators",
            "subject": "Math",
            "attachmentPath": attachment.to_string_lossy()
        }),
    );
    let note_id = created.get("noteId").and_then(|v| v.as_i64()).expect("noteId");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "n2",
        "notes.create",
        json!({ "data": "Quiz on Friday" }),
    );

    let bad = request(
        &mut stdin,
        &mut reader,
        "n3",
        "notes.create",
        json!({ "data": "x", "attachmentPath": workspace.join("missing.txt").to_string_lossy() }),
    );
    assert_eq!(error_code(&bad), "bad_params");

    let empty = request(&mut stdin, &mut reader, "n4", "notes.create", json!({}));
    assert_eq!(error_code(&empty), "bad_params");

    let handout = workspace.join("handout.pdf");
    std::fs::write(&handout, b"%PDF").expect("write handout");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "n5",
        "notes.create",
        json!({ "attachmentPath": handout.to_string_lossy() }),
    );

    let mine = request_ok(&mut stdin, &mut reader, "mine", "notes.list", json!({}));
    let notes = mine.get("notes").and_then(|v| v.as_array()).cloned().expect("notes");
    assert_eq!(notes.len(), 3);
    assert!(notes
        .iter()
        .any(|n| n.get("data").and_then(|v| v.as_str()) == Some("Uploaded file: handout.pdf")));
    let quiz = notes
        .iter()
        .find(|n| n.get("data").and_then(|v| v.as_str()) == Some("Quiz on Friday"))
        .expect("quiz note");
    assert_eq!(quiz.get("subject").and_then(|v| v.as_str()), Some("General"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "share",
        "notes.toggleShare",
        json!({ "noteId": note_id, "public": true }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "out", "auth.logout", json!({}));

    sign_up(&mut stdin, &mut reader, "su2", "reader@example.com", "Rex");
    let shared = request_ok(&mut stdin, &mut reader, "shared", "notes.shared", json!({}));
    let shared = shared.get("notes").and_then(|v| v.as_array()).cloned().expect("shared");
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].get("author").and_then(|v| v.as_str()), Some("Ann"));

    let denied = request(
        &mut stdin,
        &mut reader,
        "steal",
        "notes.delete",
        json!({ "noteId": note_id }),
    );
    assert_eq!(error_code(&denied), "unauthorized");
    let hide = request(
        &mut stdin,
        &mut reader,
        "hide",
        "notes.toggleShare",
        json!({ "noteId": note_id, "public": false }),
    );
    assert_eq!(error_code(&hide), "unauthorized");

    let _ = request_ok(&mut stdin, &mut reader, "out2", "auth.logout", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "in",
        "auth.login",
        json!({ "email": "author@example.com", "password": "correct-horse" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "del",
        "notes.delete",
        json!({ "noteId": note_id }),
    );
    let uploads: Vec<_> = std::fs::read_dir(workspace.join("uploads"))
        .expect("uploads dir")
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    // Only the attachment-only note's file is left.
    assert_eq!(uploads.len(), 1);
    assert!(uploads[0].ends_with("_handout.pdf"));
}
