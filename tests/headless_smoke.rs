use std::path::PathBuf;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn scratch_dir(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("xrinteract_{name}_{nanos:x}"))
}

fn run(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_xrinteract"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("spawn xrinteract")
}

#[test]
fn demo_run_writes_event_log_and_summary() {
    let dir = scratch_dir("demo");
    let log = dir.join("events.jsonl");
    let summary = dir.join("summary.json");

    let output = run(&[
        "--config",
        dir.join("absent.toml").to_str().unwrap(),
        "--event-log",
        log.to_str().unwrap(),
        "--summary",
        summary.to_str().unwrap(),
        "--max-frames",
        "300",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let contents = std::fs::read_to_string(&log).expect("event log written");
    for line in contents.lines() {
        let value: serde_json::Value = serde_json::from_str(line).expect("each line is JSON");
        assert!(value.get("kind").and_then(|k| k.as_str()).is_some());
        assert!(value.get("tick").is_some());
    }

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).expect("summary written")).expect("summary is JSON");
    let frames = summary["frames"].as_u64().expect("frames");
    assert!(frames > 0 && frames <= 300);
    assert!(summary["physics_steps"].as_u64().expect("physics steps") > 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn scripted_touch_session_switches_modality() {
    let dir = scratch_dir("script");
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let script = dir.join("touch.json");
    std::fs::write(
        &script,
        r#"{ "steps": [
            { "duration": 0.2 },
            { "duration": 0.5, "touch": { "touching": true, "motion": [40.0, 0.0] } }
        ] }"#,
    )
    .expect("script written");
    let summary = dir.join("summary.json");

    let output = run(&[
        "--config",
        dir.join("absent.toml").to_str().unwrap(),
        "--script",
        script.to_str().unwrap(),
        "--summary",
        summary.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).expect("summary written")).expect("summary is JSON");
    assert_eq!(summary["final_modality"], "TouchSurface");
    assert!(summary["counts"]["modality_changed"].as_u64().unwrap_or(0) >= 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn empty_script_fails_cleanly() {
    let dir = scratch_dir("empty");
    std::fs::create_dir_all(&dir).expect("scratch dir");
    let script = dir.join("empty.json");
    std::fs::write(&script, r#"{ "steps": [] }"#).expect("script written");

    let output = run(&["--script", script.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no steps"));

    let _ = std::fs::remove_dir_all(&dir);
}
