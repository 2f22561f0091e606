use assert_cmd::Command;
use chrono::Local;
use spotter::activity_log::{ActivityLog, SqliteActivityLog};
use spotter::{Event, Exercise, SessionMachine, SetPerformance, Workout};

fn seed(db: &std::path::Path) {
    let workout = Workout::new(
        "legs",
        "Leg Day",
        vec![Exercise::new("squat", "Back Squat", 2)
            .with_reps(5)
            .with_weight(100.0)],
    );
    let mut machine = SessionMachine::new(workout, 0);
    machine.start();
    machine.complete_set(SetPerformance {
        reps: Some(5),
        weight: Some(100.0),
        ..SetPerformance::default()
    });
    machine.send(Event::EndWorkout);

    let mut log = SqliteActivityLog::open(db).unwrap();
    let result = machine.begin_save(Local::now()).unwrap();
    log.save(&result).unwrap();
}

#[test]
fn history_lists_logged_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("activity.db");
    seed(&db);

    let out = Command::cargo_bin("spotter")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .arg("--db")
        .arg(&db)
        .arg("--history")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("Leg Day"), "history output: {text}");
    assert!(text.contains("1/2 sets"), "history output: {text}");
}

#[test]
fn history_on_empty_log() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("spotter")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .arg("--db")
        .arg(dir.path().join("empty.db"))
        .args(["--history", "3"])
        .assert()
        .success()
        .stdout("no sessions logged yet\n");
}

#[test]
fn export_csv_writes_one_row_per_set() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("activity.db");
    let csv = dir.path().join("sets.csv");
    seed(&db);

    Command::cargo_bin("spotter")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .arg("--db")
        .arg(&db)
        .arg("--export-csv")
        .arg(&csv)
        .assert()
        .success();

    let written = std::fs::read_to_string(&csv).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    // header plus both squat sets, one of them skipped
    assert_eq!(lines.len(), 3, "csv: {written}");
    assert!(lines[0].contains("exercise"));
    assert!(lines[1].contains("Back Squat"));
}

#[test]
fn missing_workout_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    Command::cargo_bin("spotter")
        .unwrap()
        .env("XDG_CONFIG_HOME", dir.path())
        .env("HOME", dir.path())
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure();
}

#[test]
fn no_arguments_is_a_usage_error() {
    Command::cargo_bin("spotter").unwrap().assert().failure();
}
