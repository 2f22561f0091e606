use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::workout::{Exercise, Workout};

/// What the user reports for one set, before it is stamped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetPerformance {
    pub reps: Option<u32>,
    pub weight: Option<f32>,
    pub duration: Option<u32>,
    pub distance: Option<f32>,
    pub notes: Option<String>,
}

impl SetPerformance {
    /// A performance that matches the exercise targets exactly
    pub fn from_targets(exercise: &Exercise) -> Self {
        Self {
            reps: exercise.reps,
            weight: exercise.weight,
            duration: exercise.duration,
            distance: exercise.distance,
            notes: None,
        }
    }
}

/// The logged result of a single set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub set_number: u32,
    pub completed_at: DateTime<Local>,
    pub reps: Option<u32>,
    pub weight: Option<f32>,
    pub duration: Option<u32>,
    pub distance: Option<f32>,
    pub notes: Option<String>,
}

impl PerformanceRecord {
    pub fn new(set_number: u32, completed_at: DateTime<Local>, performance: SetPerformance) -> Self {
        Self {
            set_number,
            completed_at,
            reps: performance.reps,
            weight: performance.weight,
            duration: performance.duration,
            distance: performance.distance,
            notes: performance.notes,
        }
    }
}

/// Data owned by one workout attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub workout_id: String,
    pub workout_name: String,
    pub exercises: Vec<Exercise>,
    pub current_exercise_index: usize,
    pub current_set_index: usize,
    pub completed_sets: BTreeMap<String, Vec<bool>>,
    pub performance_data: BTreeMap<String, Vec<Option<PerformanceRecord>>>,
    pub rest_timer_seconds: u32,
    pub default_rest_seconds: u32,
    pub started_at: Option<DateTime<Local>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl SessionContext {
    pub fn new(workout: Workout, default_rest_seconds: u32) -> Self {
        Self {
            workout_id: workout.id,
            workout_name: workout.name,
            exercises: workout.exercises,
            current_exercise_index: 0,
            current_set_index: 0,
            completed_sets: BTreeMap::new(),
            performance_data: BTreeMap::new(),
            rest_timer_seconds: 0,
            default_rest_seconds,
            started_at: None,
            is_loading: false,
            error: None,
        }
    }

    pub fn sets_for(&self, exercise_index: usize) -> usize {
        self.exercises
            .get(exercise_index)
            .map(|e| e.sets as usize)
            .unwrap_or(0)
    }

    pub fn is_last_exercise(&self) -> bool {
        self.current_exercise_index + 1 >= self.exercises.len()
    }

    /// Rest length scheduled after a set of the given exercise
    pub fn rest_after(&self, exercise_index: usize) -> u32 {
        self.exercises
            .get(exercise_index)
            .and_then(|e| e.rest_seconds)
            .unwrap_or(self.default_rest_seconds)
    }

    pub fn is_set_completed(&self, exercise_id: &str, set_index: usize) -> bool {
        self.completed_sets
            .get(exercise_id)
            .and_then(|sets| sets.get(set_index))
            .copied()
            .unwrap_or(false)
    }

    pub fn performance_at(&self, exercise_id: &str, set_index: usize) -> Option<&PerformanceRecord> {
        self.performance_data
            .get(exercise_id)
            .and_then(|sets| sets.get(set_index))
            .and_then(|r| r.as_ref())
    }

    /// Store the outcome of the set under the cursors. A skip never
    /// downgrades a set that was already completed.
    pub(crate) fn record_current_set(&mut self, completed: bool, record: Option<PerformanceRecord>) {
        let Some(exercise) = self.exercises.get(self.current_exercise_index) else {
            return;
        };
        let id = exercise.id.clone();
        let set_index = self.current_set_index;

        let flags = self.completed_sets.entry(id.clone()).or_default();
        if flags.len() <= set_index {
            flags.resize(set_index + 1, false);
        }
        if !completed && flags[set_index] {
            return;
        }
        flags[set_index] = completed;

        let records = self.performance_data.entry(id).or_default();
        if records.len() <= set_index {
            records.resize(set_index + 1, None);
        }
        records[set_index] = record;
    }

    /// Forget everything recorded in this attempt.
    pub(crate) fn discard_progress(&mut self) {
        self.completed_sets.clear();
        self.performance_data.clear();
        self.current_exercise_index = 0;
        self.current_set_index = 0;
        self.rest_timer_seconds = 0;
        self.is_loading = false;
        self.error = None;
    }
}
