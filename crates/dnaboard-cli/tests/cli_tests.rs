//! CLI integration tests using assert_cmd.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn dnaboard() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("dnaboard").unwrap()
}

fn bank_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../question-banks")
}

/// Write a config using the sample bank and a data dir inside `dir`.
fn write_config(dir: &Path) -> PathBuf {
    let config = format!(
        "seed = 11\n\n[store]\ntype = \"file\"\nbank = \"{}\"\ndata_dir = \"{}\"\n",
        bank_dir().display(),
        dir.join("data").display()
    );
    let path = dir.join("dnaboard.toml");
    std::fs::write(&path, config).unwrap();
    path
}

fn build_saved(dir: &Path, config: &Path, capacity: usize) -> PathBuf {
    let board = dir.join("board.json");
    dnaboard()
        .args(["build", "--group", "7R", "--capacity", &capacity.to_string()])
        .arg("--config")
        .arg(config)
        .arg("--save")
        .arg(&board)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Board for 7R ({capacity}/{capacity} slots)")));
    board
}

// --- validate / preview / init ---

#[test]
fn validate_sample_bank() {
    dnaboard()
        .arg("validate")
        .arg("--bank")
        .arg(bank_dir().join("number-starter.toml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("10 items"))
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn validate_reports_problems() {
    let dir = TempDir::new().unwrap();
    let bank = dir.path().join("bad.toml");
    std::fs::write(
        &bank,
        r#"
[bank]
id = "bad"
name = "Bad"

[[items]]
id = "dup"
topic = "Ratio"
[items.generator]
strategy = "mystery"

[[items]]
id = "dup"
topic = "Ratio"
[items.generator]
strategy = "static"
question = "q"
answer = "a"
"#,
    )
    .unwrap();

    dnaboard()
        .arg("validate")
        .arg("--bank")
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("[dup] WARNING"))
        .stdout(predicate::str::contains("warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    dnaboard()
        .arg("validate")
        .arg("--bank")
        .arg("nonexistent.toml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn preview_single_item() {
    dnaboard()
        .arg("preview")
        .arg("--bank")
        .arg(bank_dir())
        .args(["--item", "solve-linear", "--count", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[solve-linear] Equations"))
        .stdout(predicate::str::contains("Q: Solve $").count(3))
        .stdout(predicate::str::contains("ERROR").not());
}

#[test]
fn preview_unknown_item_fails() {
    dnaboard()
        .arg("preview")
        .arg("--bank")
        .arg(bank_dir())
        .args(["--item", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no item with id nope"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    dnaboard()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created dnaboard.toml"))
        .stdout(predicate::str::contains("Created question-banks/starter.toml"));

    assert!(dir.path().join("dnaboard.toml").exists());

    dnaboard()
        .current_dir(dir.path())
        .arg("validate")
        .arg("--bank")
        .arg("question-banks")
        .assert()
        .success()
        .stdout(predicate::str::contains("All question banks valid"));
}

#[test]
fn init_skips_existing() {
    let dir = TempDir::new().unwrap();

    dnaboard().current_dir(dir.path()).arg("init").assert().success();

    dnaboard()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

// --- build / session / due / stats ---

#[test]
fn build_prints_and_saves_board() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let board = build_saved(dir.path(), &config, 6);

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&board).unwrap()).unwrap();
    assert_eq!(json["group_id"], "7R");
    assert_eq!(json["state"], "active");
    assert_eq!(json["order"].as_array().unwrap().len(), 6);
}

#[test]
fn build_rejects_unknown_difficulty() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    dnaboard()
        .args(["build", "--group", "7R", "--difficulty", "extreme"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown difficulty"));
}

#[test]
fn build_with_unmatched_topic_gives_empty_board() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    dnaboard()
        .args(["build", "--group", "7R", "--topics", "Calculus"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("No questions available"));
}

#[test]
fn session_records_and_schedules_reviews() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let board = build_saved(dir.path(), &config, 4);

    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,0,75,25"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("in 12 lesson(s)"))
        .stdout(predicate::str::contains("in 1 lesson(s)"))
        .stdout(predicate::str::contains("Mean score: 50.0"))
        .stdout(predicate::str::contains("recorded for 7R"));

    dnaboard()
        .args(["due", "--group", "7R"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 item(s) due for 7R"));

    dnaboard()
        .args(["stats", "--group", "7R", "--format", "json"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"answered\": 4"));

    // The saved board is marked complete and cannot be recorded twice.
    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,0,75,25"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already recorded"));
}

#[test]
fn failed_session_write_is_retried_under_same_id() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let board = build_saved(dir.path(), &config, 3);

    // A plain file where the data directory should be makes the write fail.
    let data = dir.path().join("data");
    let _ = std::fs::remove_dir_all(&data);
    std::fs::write(&data, "").unwrap();

    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,75,0"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("run the command again to retry"));

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&board).unwrap()).unwrap();
    assert_ne!(saved["state"], "complete");
    let pending_id = saved["pending_session"]["id"].as_str().unwrap().to_string();

    std::fs::remove_file(&data).unwrap();

    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,75,0"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Session {pending_id} recorded for 7R")));

    let recorded: Vec<_> = std::fs::read_dir(data.join("sessions").join("7R"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(recorded, vec![format!("{pending_id}.json")]);

    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&board).unwrap()).unwrap();
    assert_eq!(saved["state"], "complete");
    assert!(saved.get("pending_session").is_none());
}

#[test]
fn session_rejects_bad_ratings() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let board = build_saved(dir.path(), &config, 3);

    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,0"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected 3 ratings, got 2"));

    dnaboard()
        .arg("session")
        .arg("--board")
        .arg(&board)
        .args(["--ratings", "100,50,0"])
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid rating 50"));
}

#[test]
fn nothing_due_for_new_group() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    dnaboard()
        .args(["due", "--group", "9X"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing due for 9X"));
}

#[test]
fn stats_text_for_empty_history() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    dnaboard()
        .args(["stats", "--group", "9X", "--by-topic"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Statistics for 9X"));
}

// --- share ---

#[test]
fn share_and_search() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    let board = build_saved(dir.path(), &config, 3);

    dnaboard()
        .arg("share")
        .arg("--board")
        .arg(&board)
        .args(["--name", "Year 7 warm-up"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Shared \"Year 7 warm-up\" (3 questions)"));

    dnaboard()
        .args(["shared", "--search", "warm"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Year 7 warm-up"));

    dnaboard()
        .args(["shared", "--search", "no-such-board"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("No shared boards found"));
}

// --- misc ---

#[test]
fn missing_config_file_fails() {
    dnaboard()
        .args(["due", "--group", "7R", "--config", "/nonexistent/dnaboard.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}

#[test]
fn help_output() {
    dnaboard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Practice boards with spaced repetition"));
}

#[test]
fn version_output() {
    dnaboard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dnaboard"));
}
