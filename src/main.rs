pub mod ui;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use spotter::{
    activity_log::SqliteActivityLog,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{
        spawn_save_worker, AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner,
        Ticker,
    },
    selectors::{current_exercise, WorkoutResult},
    Event, ExercisePhase, SessionMachine, SessionState, SetPerformance, Workout,
};
use std::{
    io::{self, stdin, Write},
    path::PathBuf,
    sync::mpsc::Sender,
};
use tracing::info;

/// guided workout sessions with rest timers and an activity log
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Runs a workout definition set by set in the terminal, counts down rest between sets, and logs the finished session to a local activity log."
)]
pub struct Cli {
    /// workout definition file (JSON)
    #[clap(required_unless_present_any = ["history", "export_csv"])]
    workout: Option<PathBuf>,

    /// default rest between sets in seconds, for exercises without their own
    #[clap(short = 'r', long)]
    rest_secs: Option<u32>,

    /// persist the effective settings to the config file
    #[clap(long)]
    save_config: bool,

    /// print the most recent logged sessions and exit
    #[clap(long, value_name = "N")]
    history: Option<Option<usize>>,

    /// write every logged set to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export_csv: Option<PathBuf>,

    /// activity log database (defaults to the state directory)
    #[clap(long, value_name = "PATH")]
    db: Option<PathBuf>,
}

impl Cli {
    /// Overlay command line flags on loaded settings
    fn apply_to(&self, config: &mut Config) {
        if let Some(secs) = self.rest_secs {
            config.default_rest_seconds = secs;
        }
    }

    fn db_path(&self) -> PathBuf {
        self.db
            .clone()
            .or_else(AppDirs::db_path)
            .unwrap_or_else(|| PathBuf::from("spotter_activity.db"))
    }
}

#[derive(Debug)]
pub struct App {
    pub machine: SessionMachine,
    pub config: Config,
    /// Values that COMPLETE_SET will record for the set under the cursor
    pub draft: SetPerformance,
    draft_cursor: Option<(usize, usize)>,
    pub pulse_phase: u64,
    /// Last result handed to the activity log
    pub result: Option<WorkoutResult>,
}

impl App {
    pub fn new(workout: Workout, config: Config) -> Self {
        let mut app = Self {
            machine: SessionMachine::new(workout, config.default_rest_seconds),
            config,
            draft: SetPerformance::default(),
            draft_cursor: None,
            pulse_phase: 0,
            result: None,
        };
        app.sync_draft();
        app
    }

    /// Reset the draft to the targets whenever the cursors move
    fn sync_draft(&mut self) {
        let ctx = self.machine.context();
        let cursor = (ctx.current_exercise_index, ctx.current_set_index);
        if self.draft_cursor == Some(cursor) {
            return;
        }
        self.draft = current_exercise(ctx)
            .map(SetPerformance::from_targets)
            .unwrap_or_default();
        self.draft_cursor = Some(cursor);
    }

    pub fn on_tick(&mut self) {
        self.pulse_phase = self.pulse_phase.wrapping_add(1);
        self.machine.tick();
        self.sync_draft();
    }

    pub fn on_save_finished(&mut self, outcome: Result<(), String>) {
        self.machine.finish_save(outcome);
    }

    fn adjust_reps(&mut self, delta: i32) {
        let reps = self.draft.reps.unwrap_or(0) as i32 + delta;
        self.draft.reps = Some(reps.max(0) as u32);
    }

    fn adjust_weight(&mut self, steps: f32) {
        let weight = self.draft.weight.unwrap_or(0.0) + steps * self.config.weight_increment;
        self.draft.weight = if weight <= 0.0 { None } else { Some(weight) };
    }
}

#[derive(Debug)]
pub enum KeyOutcome {
    Continue,
    Quit,
    Save(WorkoutResult),
}

pub fn handle_key(app: &mut App, key: KeyEvent) -> KeyOutcome {
    if key.kind == KeyEventKind::Release {
        return KeyOutcome::Continue;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    let state = app.machine.state();
    let outcome = match (state, key.code) {
        (SessionState::Idle, KeyCode::Enter) => {
            app.machine.start();
            KeyOutcome::Continue
        }
        (SessionState::Idle, KeyCode::Esc | KeyCode::Char('q')) => KeyOutcome::Quit,

        (
            SessionState::Exercising(ExercisePhase::Performing),
            KeyCode::Enter | KeyCode::Char('c'),
        ) => {
            let performance = app.draft.clone();
            app.machine.complete_set(performance);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(ExercisePhase::Performing), KeyCode::Char('x')) => {
            app.machine.send(Event::SkipSet);
            KeyOutcome::Continue
        }
        (
            SessionState::Exercising(ExercisePhase::Performing),
            KeyCode::Char('+') | KeyCode::Char('='),
        ) => {
            app.adjust_reps(1);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(ExercisePhase::Performing), KeyCode::Char('-')) => {
            app.adjust_reps(-1);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(ExercisePhase::Performing), KeyCode::Char(']')) => {
            app.adjust_weight(1.0);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(ExercisePhase::Performing), KeyCode::Char('[')) => {
            app.adjust_weight(-1.0);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(ExercisePhase::Resting), KeyCode::Char('s')) => {
            app.machine.send(Event::SkipRest);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(_), KeyCode::Char('n') | KeyCode::Right) => {
            app.machine.send(Event::NextExercise);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(_), KeyCode::Char('p') | KeyCode::Left) => {
            app.machine.send(Event::PreviousExercise);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(_), KeyCode::Char(' ')) => {
            app.machine.send(Event::PauseWorkout);
            KeyOutcome::Continue
        }
        (SessionState::Paused, KeyCode::Char(' ')) => {
            app.machine.send(Event::ResumeWorkout);
            KeyOutcome::Continue
        }
        (SessionState::Exercising(_) | SessionState::Paused, KeyCode::Char('e')) => {
            app.machine.send(Event::EndWorkout);
            KeyOutcome::Continue
        }

        (SessionState::Completing, KeyCode::Enter) => {
            match app.machine.begin_save(Local::now()) {
                Some(result) => {
                    app.result = Some(result.clone());
                    KeyOutcome::Save(result)
                }
                None => KeyOutcome::Continue,
            }
        }

        (
            SessionState::Completed | SessionState::Cancelled,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q'),
        ) => KeyOutcome::Quit,
        (_, KeyCode::Esc) => {
            app.machine.send(Event::CancelWorkout);
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    };

    app.sync_draft();
    outcome
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = AppDirs::log_path() {
        // Logging is best effort; the app runs without it.
        let _ = logging::init(&path);
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply_to(&mut config);
    if cli.save_config {
        store
            .save(&config)
            .with_context(|| format!("failed to write config to {}", store.path().display()))?;
    }

    let db_path = cli.db_path();

    if let Some(limit) = cli.history {
        let log = SqliteActivityLog::open(&db_path)
            .with_context(|| format!("failed to open activity log {}", db_path.display()))?;
        let limit = limit.unwrap_or(config.history_limit);
        print_history(&log, limit, &mut io::stdout())?;
        return Ok(());
    }

    if let Some(out) = &cli.export_csv {
        let log = SqliteActivityLog::open(&db_path)
            .with_context(|| format!("failed to open activity log {}", db_path.display()))?;
        let rows = log
            .export_csv(out)
            .with_context(|| format!("failed to export to {}", out.display()))?;
        println!("exported {} sets to {}", rows, out.display());
        return Ok(());
    }

    let Some(workout_path) = cli.workout.as_ref() else {
        Cli::command()
            .error(ErrorKind::MissingRequiredArgument, "a workout file is required")
            .exit();
    };
    let workout = Workout::from_file(workout_path)
        .with_context(|| format!("failed to load workout {}", workout_path.display()))?;

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    info!(workout = %workout.name, exercises = workout.exercises.len(), "loaded workout");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(workout, config);
    let source = CrosstermEventSource::new();
    let saver = spawn_save_worker(move || SqliteActivityLog::open(&db_path), source.sender());
    let mut runner = Runner::new(source, FixedTicker::per_second());

    let outcome = start_tui(&mut terminal, &mut app, &mut runner, &saver);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &mut Runner<E, T>,
    saver: &Sender<WorkoutResult>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui::draw(app, f))?;

        match runner.step() {
            AppEvent::Tick => app.on_tick(),
            AppEvent::Resize => {}
            AppEvent::SaveFinished(outcome) => app.on_save_finished(outcome),
            AppEvent::Key(key) => match handle_key(app, key) {
                KeyOutcome::Continue => {}
                KeyOutcome::Quit => break,
                KeyOutcome::Save(result) => {
                    if saver.send(result).is_err() {
                        app.on_save_finished(Err("save worker stopped".to_string()));
                    }
                }
            },
        }
    }

    Ok(())
}

fn print_history<W: Write>(log: &SqliteActivityLog, limit: usize, out: &mut W) -> Result<()> {
    let sessions = log.recent(limit)?;
    if sessions.is_empty() {
        writeln!(out, "no sessions logged yet")?;
        return Ok(());
    }

    for s in sessions {
        writeln!(
            out,
            "{:>4}  {}  {:<28} {:>4} min  {}/{} sets",
            s.id,
            s.finished_at.format("%Y-%m-%d %H:%M"),
            s.workout_name,
            s.duration_minutes,
            s.completed_sets,
            s.total_sets
        )?;
    }
    Ok(())
}
