use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn vidbrief(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("vidbrief").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("config.yaml"))
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn classify_prints_source_tag() {
    let dir = TempDir::new().unwrap();

    vidbrief(&dir)
        .args(["classify", "https://www.tiktok.com/@user/video/123"])
        .assert()
        .success()
        .stdout("short-form\n");

    vidbrief(&dir)
        .args(["classify", "https://www.instagram.com/reel/Cx1Y2z3/"])
        .assert()
        .success()
        .stdout("social-photo-video\n");

    vidbrief(&dir)
        .args(["classify", "https://vimeo.com/1"])
        .assert()
        .success()
        .stdout("generic\n");
}

#[test]
fn summarize_short_transcript_is_verbatim() {
    let dir = TempDir::new().unwrap();
    let transcript = "Cats are mammals. Dogs are mammals too. Cats and dogs are pets.";

    let output = vidbrief(&dir)
        .args(["summarize", "-f", "json"])
        .write_stdin(transcript)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(summary["brief"], transcript);
    assert_eq!(
        summary["keyPoints"],
        serde_json::json!([
            "Cats are mammals.",
            "Dogs are mammals too.",
            "Cats and dogs are pets."
        ])
    );
}

#[test]
fn summarize_long_transcript_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("transcript.txt");
    fs_err::write(
        &path,
        "Rust programs are fast. Rust programs are safe. Memory safety matters in Rust programs. \
         The weather was nice. Fast and safe programs help teams. Lunch was pasta. \
         Safe Rust prevents data races.",
    )
    .unwrap();

    let output = vidbrief(&dir)
        .args(["summarize", "--format", "json"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let summary: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let key_points = summary["keyPoints"].as_array().unwrap();
    assert_eq!(key_points.len(), 5);
    assert!(!key_points.contains(&serde_json::json!("Lunch was pasta.")));
}

#[test]
fn summarize_empty_input_fails_with_kind() {
    let dir = TempDir::new().unwrap();

    vidbrief(&dir)
        .arg("summarize")
        .write_stdin("   \n")
        .assert()
        .failure()
        .stderr(predicate::str::starts_with("error: empty-result:"));
}

#[test]
fn platforms_lists_every_source_type() {
    let dir = TempDir::new().unwrap();

    vidbrief(&dir)
        .arg("platforms")
        .assert()
        .success()
        .stdout(predicate::str::contains("video-sharing"))
        .stdout(predicate::str::contains("social-photo-video"))
        .stdout(predicate::str::contains("[instagram]"))
        .stdout(predicate::str::contains("short-form"));
}

#[test]
fn config_file_is_created_on_first_run() {
    let dir = TempDir::new().unwrap();

    vidbrief(&dir).args(["classify", "https://youtu.be/x"]).assert().success();

    let written = fs_err::read_to_string(dir.path().join("config.yaml")).unwrap();
    assert!(written.contains("yt_dlp_path"));
    assert!(written.contains("brief_sentences: 3"));
}
