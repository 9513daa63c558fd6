use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::plan;

/// What one set of an exercise consists of.
///
/// The plan model keeps repetitions and duration as optional fields to
/// match the stored JSON; the session model resolves them into a tagged
/// variant so display and formatting logic can be exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Workload {
    Reps { repetitions: u32 },
    Timed { duration_secs: u64 },
}

impl Workload {
    /// Resolve a plan exercise's optional fields into a workload.
    ///
    /// Repetitions win when both are present. An exercise with neither
    /// is a validation error; plan import rejects these up front.
    pub fn from_plan(exercise: &plan::Exercise) -> Result<Self, ValidationError> {
        if let Some(repetitions) = exercise.repetitions.filter(|r| *r > 0) {
            return Ok(Workload::Reps { repetitions });
        }
        let duration_secs = exercise.duration_secs_total();
        if duration_secs > 0 {
            Ok(Workload::Timed { duration_secs })
        } else {
            Err(ValidationError::InvalidValue {
                field: exercise.name.clone(),
                message: "exercise needs repetitions or a duration".into(),
            })
        }
    }

    pub fn label(&self) -> String {
        match self {
            Workload::Reps { repetitions } => format!("{repetitions} reps"),
            Workload::Timed { duration_secs } => format!("{duration_secs}s"),
        }
    }
}

/// An exercise as the running session sees it.
///
/// `id` is assigned at bootstrap and is the stable identity for
/// reordering and snapshots; names may repeat within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExercise {
    pub id: Uuid,
    pub name: String,
    pub sets: u32,
    pub workload: Workload,
    /// Rest between sets, never applied after the final set.
    pub rest_secs: u64,
}

impl SessionExercise {
    pub fn from_plan(exercise: &plan::Exercise) -> Result<Self, ValidationError> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: exercise.name.clone(),
            sets: exercise.sets.max(1),
            workload: Workload::from_plan(exercise)?,
            rest_secs: exercise.rest_time_seconds,
        })
    }

    /// Bootstrap a whole day's exercise list, preserving order.
    pub fn from_day(day: &plan::PlanDay) -> Result<Vec<Self>, ValidationError> {
        day.exercises.iter().map(Self::from_plan).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_exercise() -> plan::Exercise {
        plan::Exercise {
            name: "Lunges".into(),
            sets: 3,
            repetitions: Some(12),
            duration_seconds: None,
            duration_minutes: None,
            rest_time_seconds: 45,
        }
    }

    #[test]
    fn repetitions_win_over_duration() {
        let mut exercise = plan_exercise();
        exercise.duration_seconds = Some(30);
        let workload = Workload::from_plan(&exercise).unwrap();
        assert_eq!(workload, Workload::Reps { repetitions: 12 });
    }

    #[test]
    fn zero_repetitions_fall_back_to_duration() {
        let mut exercise = plan_exercise();
        exercise.repetitions = Some(0);
        exercise.duration_minutes = Some(2);
        let workload = Workload::from_plan(&exercise).unwrap();
        assert_eq!(workload, Workload::Timed { duration_secs: 120 });
    }

    #[test]
    fn no_workload_is_an_error() {
        let mut exercise = plan_exercise();
        exercise.repetitions = None;
        assert!(Workload::from_plan(&exercise).is_err());
    }

    #[test]
    fn zero_sets_clamp_to_one() {
        let mut exercise = plan_exercise();
        exercise.sets = 0;
        let session_exercise = SessionExercise::from_plan(&exercise).unwrap();
        assert_eq!(session_exercise.sets, 1);
    }

    #[test]
    fn bootstrap_assigns_distinct_ids() {
        let day = plan::PlanDay {
            day: "Day 1".into(),
            exercises: vec![plan_exercise(), plan_exercise()],
        };
        let exercises = SessionExercise::from_day(&day).unwrap();
        assert_eq!(exercises.len(), 2);
        assert_ne!(exercises[0].id, exercises[1].id);
    }
}
