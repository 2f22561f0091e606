//! Derived values over a session context. Nothing here is cached; call
//! them again after every event.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::session::{PerformanceRecord, SessionContext};
use crate::workout::Exercise;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallProgress {
    pub completed: u32,
    pub total: u32,
    pub percentage: u32,
}

pub fn current_exercise(ctx: &SessionContext) -> Option<&Exercise> {
    ctx.exercises.get(ctx.current_exercise_index)
}

/// Fraction of the current exercise's sets that are behind the cursor.
pub fn current_exercise_progress(ctx: &SessionContext) -> f64 {
    match current_exercise(ctx) {
        Some(exercise) if exercise.sets > 0 => {
            (ctx.current_set_index as f64 / exercise.sets as f64).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}

pub fn overall_progress(ctx: &SessionContext) -> OverallProgress {
    let completed = ctx
        .completed_sets
        .values()
        .flatten()
        .filter(|done| **done)
        .count() as u32;
    let total: u32 = ctx.exercises.iter().map(|e| e.sets).sum();

    let percentage = if total == 0 {
        0
    } else {
        ((completed as f64 / total as f64) * 100.0).round() as u32
    };

    OverallProgress {
        completed,
        total,
        percentage,
    }
}

/// Whole minutes since the session started, rounded.
pub fn workout_duration(ctx: &SessionContext, now: DateTime<Local>) -> i64 {
    match ctx.started_at {
        Some(started) => {
            let millis = (now - started).num_milliseconds().max(0);
            (millis as f64 / 60_000.0).round() as i64
        }
        None => 0,
    }
}

pub fn can_move_next(ctx: &SessionContext) -> bool {
    ctx.current_exercise_index + 1 < ctx.exercises.len()
}

pub fn can_move_previous(ctx: &SessionContext) -> bool {
    ctx.current_exercise_index > 0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetResult {
    pub set_number: u32,
    pub completed: bool,
    pub performance: Option<PerformanceRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub exercise_id: String,
    pub name: String,
    pub target_sets: u32,
    pub sets: Vec<SetResult>,
}

impl ExerciseResult {
    pub fn completed_sets(&self) -> usize {
        self.sets.iter().filter(|s| s.completed).count()
    }

    /// Sum of reps x weight over completed sets that logged both
    pub fn volume(&self) -> f32 {
        self.sets
            .iter()
            .filter_map(|s| s.performance.as_ref())
            .filter_map(|p| Some(p.reps? as f32 * p.weight?))
            .sum()
    }
}

/// Everything handed to the activity log when a session is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutResult {
    pub workout_id: String,
    pub workout_name: String,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: DateTime<Local>,
    pub duration_minutes: i64,
    pub progress: OverallProgress,
    pub exercises: Vec<ExerciseResult>,
}

impl WorkoutResult {
    pub fn total_volume(&self) -> f32 {
        self.exercises.iter().map(|e| e.volume()).sum()
    }
}

pub fn workout_result(ctx: &SessionContext, finished_at: DateTime<Local>) -> WorkoutResult {
    let exercises = ctx
        .exercises
        .iter()
        .map(|exercise| ExerciseResult {
            exercise_id: exercise.id.clone(),
            name: exercise.name.clone(),
            target_sets: exercise.sets,
            sets: (0..exercise.sets as usize)
                .map(|idx| SetResult {
                    set_number: idx as u32 + 1,
                    completed: ctx.is_set_completed(&exercise.id, idx),
                    performance: ctx.performance_at(&exercise.id, idx).cloned(),
                })
                .collect(),
        })
        .collect();

    WorkoutResult {
        workout_id: ctx.workout_id.clone(),
        workout_name: ctx.workout_name.clone(),
        started_at: ctx.started_at,
        finished_at,
        duration_minutes: workout_duration(ctx, finished_at),
        progress: overall_progress(ctx),
        exercises,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SetPerformance;
    use crate::workout::Workout;
    use chrono::Duration;

    fn ctx() -> SessionContext {
        SessionContext::new(
            Workout::new(
                "w",
                "Pull",
                vec![
                    Exercise::new("pullup", "Pull-up", 3).with_reps(6),
                    Exercise::new("curl", "Curl", 2).with_reps(12).with_weight(10.0),
                ],
            ),
            60,
        )
    }

    #[test]
    fn test_overall_progress_counts_true_only() {
        let mut c = ctx();
        c.completed_sets.insert("pullup".into(), vec![true, false, true]);
        c.completed_sets.insert("curl".into(), vec![true]);

        let p = overall_progress(&c);
        assert_eq!(p.completed, 3);
        assert_eq!(p.total, 5);
        assert_eq!(p.percentage, 60);
    }

    #[test]
    fn test_overall_progress_rounds() {
        let mut c = ctx();
        c.exercises[0].sets = 1;
        c.exercises[1].sets = 2;
        c.completed_sets.insert("pullup".into(), vec![true]);
        assert_eq!(overall_progress(&c).percentage, 33);
        c.completed_sets.insert("curl".into(), vec![true]);
        assert_eq!(overall_progress(&c).percentage, 67);
    }

    #[test]
    fn test_overall_progress_empty_total_is_zero() {
        let mut c = ctx();
        c.exercises.clear();
        let p = overall_progress(&c);
        assert_eq!(p.total, 0);
        assert_eq!(p.percentage, 0);
    }

    #[test]
    fn test_current_exercise_out_of_range() {
        let mut c = ctx();
        assert_eq!(current_exercise(&c).map(|e| e.id.as_str()), Some("pullup"));
        c.current_exercise_index = 9;
        assert!(current_exercise(&c).is_none());
        assert_eq!(current_exercise_progress(&c), 0.0);
    }

    #[test]
    fn test_current_exercise_progress_clamped() {
        let mut c = ctx();
        c.current_set_index = 1;
        assert!((current_exercise_progress(&c) - 1.0 / 3.0).abs() < 1e-9);
        c.current_set_index = 7;
        assert_eq!(current_exercise_progress(&c), 1.0);
    }

    #[test]
    fn test_workout_duration_rounds_minutes() {
        let mut c = ctx();
        let start = Local::now();
        assert_eq!(workout_duration(&c, start), 0);

        c.started_at = Some(start);
        assert_eq!(workout_duration(&c, start + Duration::seconds(29)), 0);
        assert_eq!(workout_duration(&c, start + Duration::seconds(30)), 1);
        assert_eq!(workout_duration(&c, start + Duration::seconds(150)), 3);
    }

    #[test]
    fn test_can_move_bounds() {
        let mut c = ctx();
        assert!(!can_move_previous(&c));
        assert!(can_move_next(&c));
        c.current_exercise_index = 1;
        assert!(can_move_previous(&c));
        assert!(!can_move_next(&c));
    }

    #[test]
    fn test_workout_result_shape() {
        let mut c = ctx();
        let now = Local::now();
        c.started_at = Some(now - Duration::minutes(20));
        c.current_exercise_index = 1;
        c.record_current_set(
            true,
            Some(PerformanceRecord::new(
                1,
                now,
                SetPerformance {
                    reps: Some(12),
                    weight: Some(10.0),
                    ..Default::default()
                },
            )),
        );

        let result = workout_result(&c, now);
        assert_eq!(result.duration_minutes, 20);
        assert_eq!(result.exercises.len(), 2);
        assert_eq!(result.exercises[0].sets.len(), 3);
        assert!(result.exercises[0].sets.iter().all(|s| !s.completed));
        assert_eq!(result.exercises[1].completed_sets(), 1);
        assert_eq!(result.total_volume(), 120.0);
        assert_eq!(result.progress.completed, 1);
    }
}
