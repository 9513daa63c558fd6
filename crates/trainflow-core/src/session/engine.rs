//! Session engine implementation.
//!
//! The engine is a wall-clock-based state machine. It does not use
//! internal threads - the caller is responsible for calling `tick()`
//! periodically while a rest countdown is running.
//!
//! ## State Transitions
//!
//! ```text
//! Loading -> Exercising <-> Resting -> ... -> Finished
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(exercises, "Day 1".into());
//! engine.start();
//! engine.complete_set(); // Returns Some(Event) describing the transition
//! // While resting, in a loop:
//! engine.tick();         // Returns Some(Event::RestFinished) when done
//! ```
//!
//! Every time-dependent operation has a `*_at(now_ms)` variant taking an
//! explicit epoch-millisecond clock, used by deterministic drivers and
//! tests; the plain variants read the system clock.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::exercise::SessionExercise;
use super::rest::RestTimer;
use crate::events::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Transient setup state before `start()`.
    Loading,
    Exercising,
    Resting,
    /// Terminal.
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Core session engine.
///
/// Owns the ordered exercise queue, the completed mask, and both timers.
/// Operates on wall-clock deltas -- no internal thread. Serializable so
/// a driver can persist it between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEngine {
    day_label: String,
    exercises: Vec<SessionExercise>,
    /// `completed[i]` describes the exercise at index `i`, always.
    completed: Vec<bool>,
    active_index: usize,
    /// 1-based set counter within the active exercise.
    current_set: u32,
    state: SessionState,
    /// Timestamp (ms since epoch) when the session started.
    started_epoch_ms: Option<u64>,
    /// Elapsed seconds, recomputed from `started_epoch_ms` on every tick
    /// rather than accumulated, so throttled ticks cannot drift. Frozen
    /// once the session finishes.
    duration_secs: u64,
    /// Present only while `state == Resting`.
    #[serde(default)]
    rest: Option<RestTimer>,
}

impl SessionEngine {
    /// Create a new engine over an ordered exercise list.
    ///
    /// Starts in `Loading`; call [`Self::start`] to begin the session.
    pub fn new(exercises: Vec<SessionExercise>, day_label: String) -> Self {
        let completed = vec![false; exercises.len()];
        Self {
            day_label,
            exercises,
            completed,
            active_index: 0,
            current_set: 1,
            state: SessionState::Loading,
            started_epoch_ms: None,
            duration_secs: 0,
            rest: None,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn day_label(&self) -> &str {
        &self.day_label
    }

    pub fn exercises(&self) -> &[SessionExercise] {
        &self.exercises
    }

    pub fn completed(&self) -> &[bool] {
        &self.completed
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn active_exercise(&self) -> Option<&SessionExercise> {
        self.exercises.get(self.active_index)
    }

    pub fn current_set(&self) -> u32 {
        self.current_set
    }

    /// Elapsed seconds as of the last tick (or finish).
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn is_skipping(&self) -> bool {
        self.rest.as_ref().is_some_and(RestTimer::skipping)
    }

    /// 0.0 .. 100.0 share of exercises fully completed. 0 for an empty list.
    pub fn progress_pct(&self) -> f64 {
        if self.exercises.is_empty() {
            return 0.0;
        }
        let done = self.completed.iter().filter(|c| **c).count();
        done as f64 / self.exercises.len() as f64 * 100.0
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        self.snapshot_at(now_ms())
    }

    pub fn snapshot_at(&self, now_ms: u64) -> Event {
        let active = self.active_exercise();
        let (rest_remaining_secs, rest_initial_secs) = match &self.rest {
            Some(rest) => (rest.remaining_secs(now_ms), rest.initial_secs()),
            None => (0, 0),
        };
        Event::StateSnapshot {
            state: self.state,
            day_label: self.day_label.clone(),
            active_index: self.active_index,
            active_exercise_id: active.map(|e| e.id),
            active_exercise_name: active.map(|e| e.name.clone()).unwrap_or_default(),
            current_set: self.current_set,
            total_sets: active.map(|e| e.sets).unwrap_or(0),
            completed: self.completed.clone(),
            completed_count: self.completed.iter().filter(|c| **c).count(),
            exercise_count: self.exercises.len(),
            progress_pct: self.progress_pct(),
            duration_secs: self.duration_secs_at(now_ms),
            rest_remaining_secs,
            rest_initial_secs,
            skipping: self.is_skipping(),
            at: Utc::now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        self.start_at(now_ms())
    }

    /// Begin the session: start the elapsed clock and activate the first
    /// exercise. A session with no exercises finishes immediately.
    pub fn start_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != SessionState::Loading {
            return None;
        }
        self.started_epoch_ms = Some(now_ms);
        if self.exercises.is_empty() {
            return Some(self.finish(now_ms));
        }
        self.state = SessionState::Exercising;
        Some(Event::SessionStarted {
            day_label: self.day_label.clone(),
            exercise_count: self.exercises.len(),
            at: Utc::now(),
        })
    }

    pub fn tick(&mut self) -> Option<Event> {
        self.tick_at(now_ms())
    }

    /// Call periodically. Refreshes the elapsed clock and, while resting,
    /// returns `Some(Event::RestFinished)` once the countdown (or a skip
    /// in flight) reaches zero.
    pub fn tick_at(&mut self, now_ms: u64) -> Option<Event> {
        match self.state {
            SessionState::Loading | SessionState::Finished => return None,
            SessionState::Exercising | SessionState::Resting => {
                self.duration_secs = self.duration_secs_at(now_ms);
            }
        }
        if self.state != SessionState::Resting {
            return None;
        }
        let rest = self.rest.as_ref()?;
        if !rest.expired(now_ms) {
            return None;
        }
        self.rest = None;
        self.state = SessionState::Exercising;
        self.current_set += 1;
        Some(Event::RestFinished {
            exercise_id: self.active_exercise()?.id,
            set: self.current_set,
            at: Utc::now(),
        })
    }

    pub fn complete_set(&mut self) -> Option<Event> {
        self.complete_set_at(now_ms())
    }

    /// Finish the current set of the active exercise.
    ///
    /// No-op unless exercising. On the last set the exercise is marked
    /// complete and the next exercise activates with no rest in between;
    /// on the last set of the last exercise the session finishes. Between
    /// sets of the same exercise a rest countdown starts when configured.
    pub fn complete_set_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != SessionState::Exercising {
            return None;
        }
        self.duration_secs = self.duration_secs_at(now_ms);

        let exercise = self.exercises.get(self.active_index)?;
        let exercise_id = exercise.id;
        let total_sets = exercise.sets.max(1);
        let rest_secs = exercise.rest_secs;
        let is_last_set = self.current_set >= total_sets;
        let is_last_exercise = self.active_index == self.exercises.len() - 1;

        if is_last_set {
            self.completed[self.active_index] = true;
            if is_last_exercise {
                return Some(self.finish(now_ms));
            }
            self.active_index += 1;
            self.current_set = 1;
            return Some(Event::ExerciseAdvanced {
                exercise_id: self.exercises[self.active_index].id,
                index: self.active_index,
                at: Utc::now(),
            });
        }

        if rest_secs > 0 {
            self.rest = Some(RestTimer::start(now_ms, rest_secs));
            self.state = SessionState::Resting;
            return Some(Event::RestStarted {
                exercise_id,
                rest_secs,
                at: Utc::now(),
            });
        }

        self.current_set += 1;
        Some(Event::SetAdvanced {
            exercise_id,
            set: self.current_set,
            of_sets: total_sets,
            at: Utc::now(),
        })
    }

    pub fn skip_rest(&mut self) -> Option<Event> {
        self.skip_rest_at(now_ms())
    }

    /// Replace the running countdown with the accelerated one.
    ///
    /// Valid only while resting; a second request while a skip is in
    /// flight is rejected. The end state is identical to a natural
    /// countdown expiry, surfaced by the next `tick`.
    pub fn skip_rest_at(&mut self, now_ms: u64) -> Option<Event> {
        if self.state != SessionState::Resting {
            return None;
        }
        let exercise_id = self.active_exercise()?.id;
        let remaining_secs = self.rest.as_mut()?.begin_skip(now_ms)?;
        Some(Event::RestSkipStarted {
            exercise_id,
            remaining_secs,
            at: Utc::now(),
        })
    }

    /// Swap a queued exercise with its neighbour.
    ///
    /// Rejected when either position is out of bounds, active, or already
    /// completed, so the active exercise and its history are never
    /// disturbed. The completed mask swaps alongside the exercises so
    /// each entry keeps describing the exercise at its own index.
    pub fn move_exercise(&mut self, index: usize, direction: Direction) -> Option<Event> {
        let target = match direction {
            Direction::Up => index.checked_sub(1)?,
            Direction::Down => index + 1,
        };
        if index >= self.exercises.len()
            || target >= self.exercises.len()
            || index == self.active_index
            || target == self.active_index
            || self.completed[index]
            || self.completed[target]
        {
            return None;
        }
        self.exercises.swap(index, target);
        self.completed.swap(index, target);
        Some(Event::ExercisesReordered {
            moved_id: self.exercises[target].id,
            from: index,
            to: target,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn duration_secs_at(&self, now_ms: u64) -> u64 {
        if self.state == SessionState::Finished {
            return self.duration_secs;
        }
        match self.started_epoch_ms {
            Some(start) => now_ms.saturating_sub(start) / 1000,
            None => 0,
        }
    }

    /// Stop both timers and enter the terminal state. Reached exactly
    /// once: only `Loading` (empty list) and `Exercising` lead here, and
    /// both transition to `Finished` in the same call.
    fn finish(&mut self, now_ms: u64) -> Event {
        self.duration_secs = self.duration_secs_at(now_ms);
        self.rest = None;
        self.state = SessionState::Finished;
        Event::SessionFinished {
            day_label: self.day_label.clone(),
            duration_secs: self.duration_secs,
            at: Utc::now(),
        }
    }
}

fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::exercise::Workload;
    use crate::session::rest::SKIP_WINDOW_MS;
    use uuid::Uuid;

    fn exercise(name: &str, sets: u32, rest_secs: u64) -> SessionExercise {
        SessionExercise {
            id: Uuid::new_v4(),
            name: name.into(),
            sets,
            workload: Workload::Reps { repetitions: 10 },
            rest_secs,
        }
    }

    fn engine(shape: &[(u32, u64)]) -> SessionEngine {
        let exercises = shape
            .iter()
            .enumerate()
            .map(|(i, (sets, rest))| exercise(&format!("ex{i}"), *sets, *rest))
            .collect();
        let mut engine = SessionEngine::new(exercises, "Day 1".into());
        engine.start_at(0);
        engine
    }

    #[test]
    fn start_enters_exercising() {
        let mut engine = SessionEngine::new(vec![exercise("a", 2, 0)], "Day 1".into());
        assert_eq!(engine.state(), SessionState::Loading);
        assert!(matches!(
            engine.start_at(0),
            Some(Event::SessionStarted { .. })
        ));
        assert_eq!(engine.state(), SessionState::Exercising);
        // A second start is a no-op.
        assert!(engine.start_at(0).is_none());
    }

    #[test]
    fn empty_session_finishes_on_start() {
        let mut engine = SessionEngine::new(vec![], "Rest Day".into());
        let event = engine.start_at(0);
        assert!(matches!(
            event,
            Some(Event::SessionFinished {
                duration_secs: 0,
                ..
            })
        ));
        assert_eq!(engine.state(), SessionState::Finished);
        assert_eq!(engine.progress_pct(), 0.0);
    }

    #[test]
    fn complete_set_is_noop_outside_exercising() {
        let mut engine = SessionEngine::new(vec![exercise("a", 2, 10)], "Day 1".into());
        assert!(engine.complete_set_at(0).is_none()); // loading

        engine.start_at(0);
        engine.complete_set_at(1_000); // -> resting
        assert_eq!(engine.state(), SessionState::Resting);
        assert!(engine.complete_set_at(2_000).is_none()); // resting
    }

    #[test]
    fn zero_rest_advances_set_immediately() {
        let mut engine = engine(&[(3, 0)]);
        let event = engine.complete_set_at(1_000);
        assert!(matches!(event, Some(Event::SetAdvanced { set: 2, .. })));
        assert_eq!(engine.state(), SessionState::Exercising);
        assert_eq!(engine.current_set(), 2);
    }

    #[test]
    fn rest_runs_between_sets_and_returns_to_exercising() {
        let mut engine = engine(&[(2, 10)]);
        assert!(matches!(
            engine.complete_set_at(0),
            Some(Event::RestStarted { rest_secs: 10, .. })
        ));
        assert_eq!(engine.state(), SessionState::Resting);

        assert!(engine.tick_at(9_000).is_none());
        let event = engine.tick_at(10_000);
        assert!(matches!(event, Some(Event::RestFinished { set: 2, .. })));
        assert_eq!(engine.state(), SessionState::Exercising);
        assert_eq!(engine.current_set(), 2);
    }

    #[test]
    fn no_rest_between_exercises() {
        // Last set of an exercise with configured rest: the next exercise
        // activates immediately, rest only ever separates sets.
        let mut engine = engine(&[(1, 60), (1, 0)]);
        let event = engine.complete_set_at(1_000);
        assert!(matches!(event, Some(Event::ExerciseAdvanced { index: 1, .. })));
        assert_eq!(engine.state(), SessionState::Exercising);
        assert_eq!(engine.completed(), &[true, false]);
        assert_eq!(engine.current_set(), 1);
    }

    #[test]
    fn progression_walkthrough_two_exercises() {
        // Exercise 1: 2 sets, 10s rest. Exercise 2: 2 sets, no rest.
        let mut engine = engine(&[(2, 10), (2, 0)]);

        assert!(matches!(
            engine.complete_set_at(5_000),
            Some(Event::RestStarted { rest_secs: 10, .. })
        ));
        assert!(matches!(
            engine.tick_at(15_000),
            Some(Event::RestFinished { set: 2, .. })
        ));
        assert!(matches!(
            engine.complete_set_at(20_000),
            Some(Event::ExerciseAdvanced { index: 1, .. })
        ));
        assert_eq!(engine.completed(), &[true, false]);
        assert_eq!(engine.current_set(), 1);

        assert!(matches!(
            engine.complete_set_at(25_000),
            Some(Event::SetAdvanced { set: 2, .. })
        ));
        let finished = engine.complete_set_at(30_000);
        assert!(matches!(
            finished,
            Some(Event::SessionFinished {
                duration_secs: 30,
                ..
            })
        ));
        assert_eq!(engine.completed(), &[true, true]);
        assert_eq!(engine.state(), SessionState::Finished);
        assert_eq!(engine.progress_pct(), 100.0);
    }

    #[test]
    fn skip_rest_converges_within_window() {
        let mut engine = engine(&[(2, 60)]);
        engine.complete_set_at(0);

        let event = engine.skip_rest_at(3_000);
        assert!(matches!(
            event,
            Some(Event::RestSkipStarted {
                remaining_secs: 57,
                ..
            })
        ));
        // Second skip while one is in flight is rejected.
        assert!(engine.skip_rest_at(3_100).is_none());

        // Mid-animation the countdown is interpolating, not expired.
        assert!(engine.tick_at(3_000 + SKIP_WINDOW_MS / 2).is_none());
        assert_eq!(engine.state(), SessionState::Resting);

        let event = engine.tick_at(3_000 + SKIP_WINDOW_MS);
        assert!(matches!(event, Some(Event::RestFinished { set: 2, .. })));
        assert_eq!(engine.state(), SessionState::Exercising);
    }

    #[test]
    fn skip_rest_is_noop_while_exercising() {
        let mut engine = engine(&[(2, 10)]);
        assert!(engine.skip_rest_at(0).is_none());
    }

    #[test]
    fn move_swaps_queue_and_mask() {
        let mut engine = engine(&[(1, 0), (1, 0), (1, 0)]);
        let second = engine.exercises()[1].id;
        let event = engine.move_exercise(1, Direction::Down);
        assert!(matches!(
            event,
            Some(Event::ExercisesReordered {
                moved_id,
                from: 1,
                to: 2,
                ..
            }) if moved_id == second
        ));
        assert_eq!(engine.exercises()[2].id, second);
    }

    #[test]
    fn move_rejects_active_completed_and_bounds() {
        let mut engine = engine(&[(1, 0), (1, 0), (1, 0), (1, 0)]);
        // Active exercise (index 0) cannot move, nor can a neighbour swap into it.
        assert!(engine.move_exercise(0, Direction::Down).is_none());
        assert!(engine.move_exercise(1, Direction::Up).is_none());
        // Out of bounds both ways.
        assert!(engine.move_exercise(3, Direction::Down).is_none());
        assert!(engine.move_exercise(7, Direction::Up).is_none());

        // Complete the first exercise; index 0 is now completed history.
        engine.complete_set_at(0);
        assert_eq!(engine.active_index(), 1);
        assert!(engine.move_exercise(2, Direction::Up).is_none()); // target is active
        assert!(engine.move_exercise(2, Direction::Down).is_some());

        let before: Vec<_> = engine.exercises().iter().map(|e| e.id).collect();
        assert!(engine.move_exercise(0, Direction::Down).is_none()); // completed
        let after: Vec<_> = engine.exercises().iter().map(|e| e.id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn duration_is_recomputed_from_start_timestamp() {
        let mut engine = engine(&[(2, 10)]);
        // Long gap between ticks loses nothing.
        engine.tick_at(90_000);
        assert_eq!(engine.duration_secs(), 90);
        engine.tick_at(91_500);
        assert_eq!(engine.duration_secs(), 91);
    }

    #[test]
    fn finished_session_ignores_further_input() {
        let mut engine = engine(&[(1, 0)]);
        assert!(matches!(
            engine.complete_set_at(10_000),
            Some(Event::SessionFinished { .. })
        ));
        let duration = engine.duration_secs();

        assert!(engine.complete_set_at(20_000).is_none());
        assert!(engine.skip_rest_at(20_000).is_none());
        assert!(engine.tick_at(120_000).is_none());
        assert_eq!(engine.duration_secs(), duration);
    }

    #[test]
    fn snapshot_reports_rest_fields() {
        let mut engine = engine(&[(2, 30)]);
        engine.complete_set_at(0);
        match engine.snapshot_at(5_000) {
            Event::StateSnapshot {
                state,
                rest_remaining_secs,
                rest_initial_secs,
                skipping,
                ..
            } => {
                assert_eq!(state, SessionState::Resting);
                assert_eq!(rest_remaining_secs, 25);
                assert_eq!(rest_initial_secs, 30);
                assert!(!skipping);
            }
            _ => panic!("Expected StateSnapshot"),
        }
    }

    #[test]
    fn engine_roundtrips_through_serde() {
        let mut engine = engine(&[(2, 10), (3, 0)]);
        engine.complete_set_at(1_000); // resting
        let json = serde_json::to_string(&engine).unwrap();
        let mut restored: SessionEngine = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.state(), SessionState::Resting);
        // The wall-clock countdown carries across the roundtrip.
        let event = restored.tick_at(11_000);
        assert!(matches!(event, Some(Event::RestFinished { .. })));
    }
}
