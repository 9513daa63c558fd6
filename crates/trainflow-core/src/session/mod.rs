mod engine;
mod exercise;
mod rest;

pub use engine::{Direction, SessionEngine, SessionState};
pub use exercise::{SessionExercise, Workload};
pub use rest::{RestTimer, SkipAnimation, SKIP_WINDOW_MS};
