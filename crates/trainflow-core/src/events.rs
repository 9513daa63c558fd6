use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionState;

/// Every state change in the engine produces an Event.
/// The CLI prints them; a richer presentation layer would subscribe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        day_label: String,
        exercise_count: usize,
        at: DateTime<Utc>,
    },
    /// A set finished with no rest configured; the next set is live.
    SetAdvanced {
        exercise_id: Uuid,
        set: u32,
        of_sets: u32,
        at: DateTime<Utc>,
    },
    /// A set finished and the between-set rest countdown began.
    RestStarted {
        exercise_id: Uuid,
        rest_secs: u64,
        at: DateTime<Utc>,
    },
    /// The rest countdown reached zero (naturally or via skip).
    RestFinished {
        exercise_id: Uuid,
        set: u32,
        at: DateTime<Utc>,
    },
    /// The user requested to skip rest; the accelerated countdown began.
    RestSkipStarted {
        exercise_id: Uuid,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    /// All sets of an exercise finished; the next exercise is active.
    ExerciseAdvanced {
        exercise_id: Uuid,
        index: usize,
        at: DateTime<Utc>,
    },
    /// Two queued exercises swapped positions.
    ExercisesReordered {
        moved_id: Uuid,
        from: usize,
        to: usize,
        at: DateTime<Utc>,
    },
    /// The final set of the final exercise finished.
    SessionFinished {
        day_label: String,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: SessionState,
        day_label: String,
        active_index: usize,
        active_exercise_id: Option<Uuid>,
        active_exercise_name: String,
        current_set: u32,
        total_sets: u32,
        completed: Vec<bool>,
        completed_count: usize,
        exercise_count: usize,
        progress_pct: f64,
        duration_secs: u64,
        rest_remaining_secs: u64,
        rest_initial_secs: u64,
        skipping: bool,
        at: DateTime<Utc>,
    },
}
