use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// A single exercise in a workout, with its targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub sets: u32,
    #[serde(default)]
    pub reps: Option<u32>,
    #[serde(default)]
    pub weight: Option<f32>,
    /// Target duration in seconds
    #[serde(default)]
    pub duration: Option<u32>,
    #[serde(default)]
    pub distance: Option<f32>,
    #[serde(default)]
    pub instructions: Option<String>,
    /// Rest after each set, overriding the configured default
    #[serde(default)]
    pub rest_seconds: Option<u32>,
}

impl Exercise {
    pub fn new(id: impl Into<String>, name: impl Into<String>, sets: u32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sets,
            reps: None,
            weight: None,
            duration: None,
            distance: None,
            instructions: None,
            rest_seconds: None,
        }
    }

    pub fn with_reps(mut self, reps: u32) -> Self {
        self.reps = Some(reps);
        self
    }

    pub fn with_weight(mut self, weight: f32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn with_rest(mut self, rest_seconds: u32) -> Self {
        self.rest_seconds = Some(rest_seconds);
        self
    }

    /// Short human summary of the targets, e.g. `3 x 8 @ 60kg`
    pub fn target_summary(&self) -> String {
        let mut out = format!("{} sets", self.sets);
        if let Some(reps) = self.reps {
            out = format!("{} x {}", self.sets, reps);
        }
        if let Some(w) = self.weight {
            out.push_str(&format!(" @ {}kg", w));
        }
        if let Some(d) = self.duration {
            out.push_str(&format!(" for {}s", d));
        }
        if let Some(d) = self.distance {
            out.push_str(&format!(" over {}m", d));
        }
        out
    }
}

/// A workout definition as supplied at session start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub name: String,
    pub exercises: Vec<Exercise>,
}

#[derive(Error, Debug)]
pub enum WorkoutError {
    #[error("failed to read workout file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid workout file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("workout `{0}` has no exercises")]
    Empty(String),

    #[error("exercise `{0}` must have at least one set")]
    NoSets(String),

    #[error("duplicate exercise id `{0}`")]
    DuplicateId(String),
}

impl Workout {
    pub fn new(id: impl Into<String>, name: impl Into<String>, exercises: Vec<Exercise>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            exercises,
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WorkoutError> {
        let bytes = fs::read(path.as_ref())?;
        let workout: Workout = serde_json::from_slice(&bytes)?;
        workout.validated()
    }

    /// Fill in missing exercise ids and reject definitions the session
    /// cannot run.
    pub fn validated(mut self) -> Result<Self, WorkoutError> {
        if self.exercises.is_empty() {
            return Err(WorkoutError::Empty(self.name));
        }

        let explicit: HashSet<String> = self
            .exercises
            .iter()
            .filter(|e| !e.id.trim().is_empty())
            .map(|e| e.id.clone())
            .collect();

        let mut seen = HashSet::new();
        for (idx, exercise) in self.exercises.iter_mut().enumerate() {
            if exercise.id.trim().is_empty() {
                // generated ids never take one written in the file
                let mut n = idx + 1;
                let mut candidate = format!("ex-{n}");
                while explicit.contains(&candidate) || seen.contains(&candidate) {
                    n += 1;
                    candidate = format!("ex-{n}");
                }
                exercise.id = candidate;
            }
            if exercise.sets == 0 {
                return Err(WorkoutError::NoSets(exercise.name.clone()));
            }
            if !seen.insert(exercise.id.clone()) {
                return Err(WorkoutError::DuplicateId(exercise.id.clone()));
            }
        }

        Ok(self)
    }

    pub fn total_sets(&self) -> u32 {
        self.exercises.iter().map(|e| e.sets).sum()
    }
}
