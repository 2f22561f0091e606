// Library surface for the terminal runner and for headless/integration tests.
// UI rendering stays in the binary.
pub mod activity_log;
pub mod app_dirs;
pub mod config;
pub mod countdown;
pub mod logging;
pub mod machine;
pub mod runtime;
pub mod selectors;
pub mod session;
pub mod workout;

pub use machine::{reduce, Event, ExercisePhase, SessionMachine, SessionState, Snapshot};
pub use session::{PerformanceRecord, SessionContext, SetPerformance};
pub use workout::{Exercise, Workout};
