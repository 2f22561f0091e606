use chrono::{DateTime, Local};
use std::fmt;
use tracing::{debug, info, warn};

use crate::activity_log::ActivityLog;
use crate::selectors::{workout_result, WorkoutResult};
use crate::session::{PerformanceRecord, SessionContext, SetPerformance};
use crate::workout::Workout;

/// Sub-state of an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExercisePhase {
    Performing,
    Resting,
}

/// Lifecycle of one workout attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Exercising(ExercisePhase),
    Paused,
    Completing,
    Completed,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Cancelled)
    }

    pub fn is_exercising(&self) -> bool {
        matches!(self, SessionState::Exercising(_))
    }

    pub fn is_resting(&self) -> bool {
        matches!(self, SessionState::Exercising(ExercisePhase::Resting))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Exercising(phase) => write!(f, "exercising.{}", phase),
            SessionState::Paused => write!(f, "paused"),
            SessionState::Completing => write!(f, "completing"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Intents dispatched into the session, plus the internal tick and the
/// save outcome reported back by the owner.
#[derive(Debug, Clone, PartialEq, strum_macros::Display)]
pub enum Event {
    StartWorkout { at: DateTime<Local> },
    CompleteSet { performance: SetPerformance, at: DateTime<Local> },
    SkipSet,
    Tick,
    SkipRest,
    PreviousExercise,
    NextExercise,
    PauseWorkout,
    ResumeWorkout,
    EndWorkout,
    SaveAndExit,
    SaveSucceeded,
    SaveFailed { message: String },
    CancelWorkout,
}

/// State plus context: the value the reducer maps over.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: SessionState,
    pub context: SessionContext,
}

impl Snapshot {
    pub fn new(context: SessionContext) -> Self {
        Self {
            state: SessionState::Idle,
            context,
        }
    }
}

/// Apply one event. Events that are not valid in the current state leave
/// the snapshot untouched.
pub fn reduce(snapshot: Snapshot, event: &Event) -> Snapshot {
    use ExercisePhase::*;
    use SessionState::*;

    let Snapshot { state, mut context } = snapshot;

    let state = match (state, event) {
        (Idle, Event::StartWorkout { at }) => {
            context.started_at = Some(*at);
            Exercising(Performing)
        }

        (Exercising(Performing), Event::CompleteSet { performance, at }) => {
            let set_number = context.current_set_index as u32 + 1;
            let record = PerformanceRecord::new(set_number, *at, performance.clone());
            context.record_current_set(true, Some(record));
            advance(&mut context)
        }
        (Exercising(Performing), Event::SkipSet) => {
            context.record_current_set(false, None);
            advance(&mut context)
        }

        (Exercising(Resting), Event::Tick) => {
            context.rest_timer_seconds = context.rest_timer_seconds.saturating_sub(1);
            if context.rest_timer_seconds == 0 {
                Exercising(Performing)
            } else {
                Exercising(Resting)
            }
        }
        (Exercising(Resting), Event::SkipRest) => {
            context.rest_timer_seconds = 0;
            Exercising(Performing)
        }

        (Exercising(phase), Event::PreviousExercise) => {
            if context.current_exercise_index == 0 {
                Exercising(phase)
            } else {
                context.current_exercise_index -= 1;
                context.current_set_index = 0;
                context.rest_timer_seconds = 0;
                Exercising(Performing)
            }
        }
        (Exercising(phase), Event::NextExercise) => {
            if context.is_last_exercise() {
                Exercising(phase)
            } else {
                context.current_exercise_index += 1;
                context.current_set_index = 0;
                context.rest_timer_seconds = 0;
                Exercising(Performing)
            }
        }

        (Exercising(_), Event::PauseWorkout) => Paused,
        (Paused, Event::ResumeWorkout) => Exercising(Performing),
        (Exercising(_) | Paused, Event::EndWorkout) => {
            context.rest_timer_seconds = 0;
            Completing
        }

        (Completing, Event::SaveAndExit) if !context.is_loading => {
            context.is_loading = true;
            context.error = None;
            Completing
        }
        (Completing, Event::SaveSucceeded) if context.is_loading => {
            context.is_loading = false;
            Completed
        }
        (Completing, Event::SaveFailed { message }) if context.is_loading => {
            context.is_loading = false;
            context.error = Some(message.clone());
            Completing
        }

        (s, Event::CancelWorkout) if !s.is_terminal() && !context.is_loading => {
            context.discard_progress();
            Cancelled
        }

        (s, _) => s,
    };

    Snapshot { state, context }
}

/// Move the cursors past the set that was just completed or skipped and
/// pick the next state. The final set of the final exercise never rests.
fn advance(context: &mut SessionContext) -> SessionState {
    let finished_exercise = context.current_exercise_index;
    let sets = context.sets_for(finished_exercise);

    context.current_set_index += 1;
    if context.current_set_index >= sets {
        if context.is_last_exercise() {
            context.rest_timer_seconds = 0;
            return SessionState::Completing;
        }
        context.current_exercise_index += 1;
        context.current_set_index = 0;
    }

    context.rest_timer_seconds = context.rest_after(finished_exercise);
    if context.rest_timer_seconds == 0 {
        SessionState::Exercising(ExercisePhase::Performing)
    } else {
        SessionState::Exercising(ExercisePhase::Resting)
    }
}

/// Owns the snapshot of one workout attempt and supplies the clock and
/// the save collaborator around the pure reducer.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    snapshot: Snapshot,
}

impl SessionMachine {
    pub fn new(workout: Workout, default_rest_seconds: u32) -> Self {
        Self {
            snapshot: Snapshot::new(SessionContext::new(workout, default_rest_seconds)),
        }
    }

    pub fn state(&self) -> SessionState {
        self.snapshot.state
    }

    pub fn context(&self) -> &SessionContext {
        &self.snapshot.context
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Dispatch an event. Returns true if anything changed.
    pub fn send(&mut self, event: Event) -> bool {
        let before = self.snapshot.state;
        let next = reduce(self.snapshot.clone(), &event);
        let changed = next != self.snapshot;
        self.snapshot = next;

        if !changed {
            if !matches!(event, Event::Tick) {
                debug!(state = %before, event = %event, "event ignored");
            }
            return false;
        }

        let after = self.snapshot.state;
        if before != after {
            debug!(from = %before, to = %after, event = %event, "transition");
        }
        match (before, after) {
            (SessionState::Idle, SessionState::Exercising(_)) => {
                info!(workout = %self.snapshot.context.workout_name, "workout started")
            }
            (_, SessionState::Completing) if before != SessionState::Completing => {
                info!(workout = %self.snapshot.context.workout_name, "workout finished, awaiting save")
            }
            (_, SessionState::Completed) => info!("workout saved"),
            (_, SessionState::Cancelled) => info!("workout cancelled"),
            _ => {}
        }
        true
    }

    pub fn start(&mut self) -> bool {
        self.send(Event::StartWorkout { at: Local::now() })
    }

    pub fn complete_set(&mut self, performance: SetPerformance) -> bool {
        self.send(Event::CompleteSet {
            performance,
            at: Local::now(),
        })
    }

    pub fn tick(&mut self) -> bool {
        self.send(Event::Tick)
    }

    /// Raise the loading flag and hand back the result to persist. Returns
    /// `None` when a save cannot start from the current state.
    pub fn begin_save(&mut self, finished_at: DateTime<Local>) -> Option<WorkoutResult> {
        if self.state() != SessionState::Completing || self.context().is_loading {
            return None;
        }
        self.send(Event::SaveAndExit);
        Some(workout_result(self.context(), finished_at))
    }

    /// Feed the collaborator's answer back into the machine. The error's
    /// display text becomes the message shown to the user.
    pub fn finish_save<E: fmt::Display>(&mut self, outcome: Result<(), E>) {
        match outcome {
            Ok(()) => {
                self.send(Event::SaveSucceeded);
            }
            Err(e) => {
                warn!(error = %e, "saving workout failed");
                self.send(Event::SaveFailed {
                    message: e.to_string(),
                });
            }
        }
    }

    /// Run a complete save against `log` on the calling thread.
    pub fn save_with<L: ActivityLog + ?Sized>(&mut self, log: &mut L) -> bool {
        let Some(result) = self.begin_save(Local::now()) else {
            return false;
        };
        let outcome = log.save(&result);
        self.finish_save(outcome);
        self.state() == SessionState::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity_log::SaveError;
    use crate::selectors::overall_progress;
    use crate::workout::Exercise;
    use assert_matches::assert_matches;

    fn workout() -> Workout {
        Workout::new(
            "w1",
            "Full Body",
            vec![
                Exercise::new("squat", "Squat", 2).with_reps(5),
                Exercise::new("row", "Row", 1).with_rest(0),
                Exercise::new("plank", "Plank", 1),
            ],
        )
    }

    fn started() -> Snapshot {
        let snap = Snapshot::new(SessionContext::new(workout(), 3));
        reduce(snap, &Event::StartWorkout { at: Local::now() })
    }

    fn complete() -> Event {
        Event::CompleteSet {
            performance: SetPerformance::default(),
            at: Local::now(),
        }
    }

    #[test]
    fn test_start_sets_started_at() {
        let snap = started();
        assert_eq!(snap.state, SessionState::Exercising(ExercisePhase::Performing));
        assert!(snap.context.started_at.is_some());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let snap = Snapshot::new(SessionContext::new(workout(), 3));
        let after = reduce(snap.clone(), &complete());
        assert_eq!(after, snap);
        let after = reduce(snap.clone(), &Event::NextExercise);
        assert_eq!(after, snap);
    }

    #[test]
    fn test_complete_set_records_and_rests() {
        let snap = reduce(started(), &complete());

        assert_eq!(snap.state, SessionState::Exercising(ExercisePhase::Resting));
        assert_eq!(snap.context.current_set_index, 1);
        assert_eq!(snap.context.rest_timer_seconds, 3);
        assert!(snap.context.is_set_completed("squat", 0));
        assert_eq!(
            snap.context.performance_at("squat", 0).map(|r| r.set_number),
            Some(1)
        );
    }

    #[test]
    fn test_tick_counts_down_then_performs() {
        let mut snap = reduce(started(), &complete());
        snap = reduce(snap, &Event::Tick);
        snap = reduce(snap, &Event::Tick);
        assert_eq!(snap.context.rest_timer_seconds, 1);
        assert!(snap.state.is_resting());

        snap = reduce(snap, &Event::Tick);
        assert_eq!(snap.context.rest_timer_seconds, 0);
        assert_eq!(snap.state, SessionState::Exercising(ExercisePhase::Performing));
    }

    #[test]
    fn test_tick_while_performing_is_noop() {
        let snap = started();
        assert_eq!(reduce(snap.clone(), &Event::Tick), snap);
    }

    #[test]
    fn test_zero_rest_skips_resting() {
        let mut snap = started();
        snap = reduce(snap, &Event::NextExercise);
        assert_eq!(snap.context.current_exercise_index, 1);

        // `row` has rest_seconds = 0
        snap = reduce(snap, &complete());
        assert_eq!(snap.state, SessionState::Exercising(ExercisePhase::Performing));
        assert_eq!(snap.context.current_exercise_index, 2);
    }

    #[test]
    fn test_skip_set_marks_false_without_record() {
        let snap = reduce(started(), &Event::SkipSet);
        assert!(!snap.context.is_set_completed("squat", 0));
        assert!(snap.context.performance_at("squat", 0).is_none());
        assert_eq!(snap.context.completed_sets["squat"], vec![false]);
        assert!(snap.state.is_resting());
    }

    #[test]
    fn test_skip_after_navigating_back_keeps_completed_set() {
        let mut snap = reduce(started(), &complete());
        let before = overall_progress(&snap.context).percentage;
        assert!(before > 0);

        snap = reduce(snap, &Event::NextExercise);
        snap = reduce(snap, &Event::PreviousExercise);
        assert_eq!(snap.context.current_set_index, 0);
        snap = reduce(snap, &Event::SkipSet);

        assert!(snap.context.is_set_completed("squat", 0));
        assert!(snap.context.performance_at("squat", 0).is_some());
        assert_eq!(overall_progress(&snap.context).percentage, before);
        assert_eq!(snap.context.current_set_index, 1);
    }

    #[test]
    fn test_navigation_bounds() {
        let snap = started();
        let same = reduce(snap.clone(), &Event::PreviousExercise);
        assert_eq!(same, snap);

        let mut snap = reduce(snap, &Event::NextExercise);
        snap = reduce(snap, &Event::NextExercise);
        assert_eq!(snap.context.current_exercise_index, 2);
        let same = reduce(snap.clone(), &Event::NextExercise);
        assert_eq!(same, snap);
    }

    #[test]
    fn test_navigation_from_resting_resets_timer() {
        let snap = reduce(started(), &complete());
        assert!(snap.state.is_resting());

        let snap = reduce(snap, &Event::NextExercise);
        assert_eq!(snap.state, SessionState::Exercising(ExercisePhase::Performing));
        assert_eq!(snap.context.rest_timer_seconds, 0);
        assert_eq!(snap.context.current_set_index, 0);
    }

    #[test]
    fn test_end_workout_from_paused() {
        let snap = reduce(started(), &Event::PauseWorkout);
        assert_eq!(snap.state, SessionState::Paused);
        let snap = reduce(snap, &Event::EndWorkout);
        assert_eq!(snap.state, SessionState::Completing);
    }

    #[test]
    fn test_cancel_discards_progress() {
        let snap = reduce(started(), &complete());
        let snap = reduce(snap, &Event::CancelWorkout);
        assert_eq!(snap.state, SessionState::Cancelled);
        assert!(snap.context.completed_sets.is_empty());
        assert!(snap.context.performance_data.is_empty());

        // terminal: nothing moves it
        let again = reduce(snap.clone(), &Event::StartWorkout { at: Local::now() });
        assert_eq!(again, snap);
    }

    #[test]
    fn test_cancel_ignored_while_saving() {
        let snap = reduce(started(), &Event::EndWorkout);
        let snap = reduce(snap, &Event::SaveAndExit);
        assert!(snap.context.is_loading);
        let after = reduce(snap.clone(), &Event::CancelWorkout);
        assert_eq!(after, snap);
    }

    #[test]
    fn test_save_outcome_without_request_is_ignored() {
        let snap = reduce(started(), &Event::EndWorkout);
        let after = reduce(snap.clone(), &Event::SaveSucceeded);
        assert_eq!(after, snap);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(SessionState::Idle.to_string(), "idle");
        assert_eq!(
            SessionState::Exercising(ExercisePhase::Resting).to_string(),
            "exercising.resting"
        );
        assert_eq!(Event::SkipRest.to_string(), "SkipRest");
    }

    struct FailingLog;

    impl ActivityLog for FailingLog {
        fn save(&mut self, _result: &WorkoutResult) -> Result<(), SaveError> {
            Err(SaveError::Rejected("disk full".into()))
        }
    }

    #[test]
    fn test_machine_save_failure_keeps_completing() {
        let mut machine = SessionMachine::new(workout(), 0);
        machine.start();
        machine.send(Event::EndWorkout);

        assert!(!machine.save_with(&mut FailingLog));
        assert_eq!(machine.state(), SessionState::Completing);
        assert!(!machine.context().is_loading);
        assert_matches!(machine.context().error.as_deref(), Some(msg) if msg.contains("disk full"));
    }

    #[test]
    fn test_begin_save_only_from_completing() {
        let mut machine = SessionMachine::new(workout(), 0);
        assert!(machine.begin_save(Local::now()).is_none());
        machine.start();
        assert!(machine.begin_save(Local::now()).is_none());
        machine.send(Event::EndWorkout);
        let result = machine.begin_save(Local::now());
        assert!(result.is_some());
        // second request while loading is refused
        assert!(machine.begin_save(Local::now()).is_none());
    }
}
