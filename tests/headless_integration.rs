use std::sync::mpsc;
use std::time::Duration;

use spotter::activity_log::{SaveError, SqliteActivityLog};
use spotter::runtime::{spawn_save_worker, AppEvent, FixedTicker, Runner, TestEventSource};
use spotter::selectors::overall_progress;
use spotter::{Exercise, ExercisePhase, SessionMachine, SessionState, SetPerformance, Workout};

fn workout(rest: u32) -> Workout {
    Workout::new(
        "quick",
        "Quick Circuit",
        vec![
            Exercise::new("pushup", "Push-up", 2)
                .with_reps(10)
                .with_rest(rest),
            Exercise::new("squat", "Air Squat", 1).with_reps(15),
        ],
    )
}

// Headless run of the session using the runtime without a TTY.
// Ticks come from the Runner, so the rest countdown drains on its own.
#[test]
fn headless_rest_countdown_drains_through_runner_ticks() {
    let mut machine = SessionMachine::new(workout(3), 0);
    machine.start();
    machine.complete_set(SetPerformance::default());
    assert_eq!(
        machine.state(),
        SessionState::Exercising(ExercisePhase::Resting)
    );
    assert_eq!(machine.context().rest_timer_seconds, 3);

    let (_tx, rx) = mpsc::channel();
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(2)),
    );

    let mut ticks = 0;
    for _ in 0..100u32 {
        if let AppEvent::Tick = runner.step() {
            ticks += 1;
            machine.tick();
            if !machine.state().is_resting() {
                break;
            }
        }
    }

    assert_eq!(ticks, 3, "one tick per remaining second");
    assert_eq!(
        machine.state(),
        SessionState::Exercising(ExercisePhase::Performing)
    );
    assert_eq!(machine.context().rest_timer_seconds, 0);
    assert_eq!(machine.context().current_set_index, 1);
}

#[test]
fn headless_session_saves_through_worker() {
    let mut machine = SessionMachine::new(workout(0), 0);
    machine.start();
    for _ in 0..3 {
        machine.complete_set(SetPerformance {
            reps: Some(10),
            ..SetPerformance::default()
        });
    }
    assert_eq!(machine.state(), SessionState::Completing);

    let (tx, rx) = mpsc::channel();
    let saver = spawn_save_worker(SqliteActivityLog::in_memory, tx);
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    let result = machine.begin_save(chrono::Local::now()).unwrap();
    assert!(machine.context().is_loading);
    saver.send(result).unwrap();

    for _ in 0..1000u32 {
        match runner.step() {
            AppEvent::SaveFinished(outcome) => {
                machine.finish_save(outcome);
                break;
            }
            AppEvent::Tick => {
                machine.tick();
            }
            _ => {}
        }
    }

    assert_eq!(machine.state(), SessionState::Completed);
    assert!(!machine.context().is_loading);
    assert_eq!(overall_progress(machine.context()).percentage, 100);
}

#[test]
fn headless_failed_open_keeps_session_completing() {
    let mut machine = SessionMachine::new(workout(0), 0);
    machine.start();
    machine.send(spotter::Event::EndWorkout);

    let (tx, rx) = mpsc::channel();
    let saver = spawn_save_worker(
        || -> Result<SqliteActivityLog, SaveError> {
            Err(SaveError::Rejected("disk full".into()))
        },
        tx,
    );
    let mut runner = Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
    );

    saver
        .send(machine.begin_save(chrono::Local::now()).unwrap())
        .unwrap();

    for _ in 0..1000u32 {
        if let AppEvent::SaveFinished(outcome) = runner.step() {
            machine.finish_save(outcome);
            break;
        }
    }

    assert_eq!(machine.state(), SessionState::Completing);
    assert!(!machine.context().is_loading);
    assert_eq!(
        machine.context().error.as_deref(),
        Some("activity log is unavailable")
    );
}
