//! Training-plan data model.
//!
//! Mirrors the stored plan JSON: a plan is a set of named days, each an
//! ordered list of exercises. Exercises carry either a repetition target
//! or a duration; the raw model keeps both as optional fields and the
//! session layer converts them into a tagged workload at bootstrap.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

fn default_sets() -> u32 {
    1
}

/// One exercise of a plan day, as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    #[serde(default = "default_sets")]
    pub sets: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repetitions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u64>,
    /// Rest between sets of this exercise, in seconds.
    #[serde(default)]
    pub rest_time_seconds: u64,
}

impl Exercise {
    /// Total configured duration in seconds, minutes folded in.
    ///
    /// Uses saturating arithmetic to prevent overflow with large values.
    pub fn duration_secs_total(&self) -> u64 {
        self.duration_seconds.unwrap_or(0).saturating_add(
            self.duration_minutes
                .unwrap_or(0)
                .saturating_mul(60),
        )
    }

    /// Whether the exercise names any workload (reps or a duration).
    pub fn has_workload(&self) -> bool {
        self.repetitions.is_some_and(|r| r > 0) || self.duration_secs_total() > 0
    }
}

/// A single day's workout within a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDay {
    /// Display label, e.g. "Monday" or "Day 1".
    pub day: String,
    pub exercises: Vec<Exercise>,
}

/// The structured body of a plan: its days plus a free-text description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanDetails {
    pub days: Vec<PlanDay>,
    #[serde(default)]
    pub description: String,
}

impl PlanDetails {
    /// Find a day by its label.
    pub fn day(&self, label: &str) -> Option<&PlanDay> {
        self.days.iter().find(|d| d.day == label)
    }
}

/// A stored training plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub details: PlanDetails,
}

/// The import document format accepted by `plan import`.
///
/// `plan_details` is accepted as an alias so exported plan JSON with
/// the database column name can be imported unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanDocument {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(alias = "plan_details")]
    pub details: PlanDetails,
}

impl PlanDocument {
    /// Validate and promote the document into a stored plan.
    pub fn into_plan(self) -> Result<TrainingPlan, ValidationError> {
        validate(&self)?;
        Ok(TrainingPlan {
            id: Uuid::new_v4(),
            name: self.name,
            description: self.description,
            created_at: Utc::now(),
            details: self.details,
        })
    }
}

fn validate(doc: &PlanDocument) -> Result<(), ValidationError> {
    if doc.name.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "name".into(),
            message: "plan name cannot be empty".into(),
        });
    }
    if doc.details.days.is_empty() {
        return Err(ValidationError::EmptyCollection("plan days".into()));
    }
    for day in &doc.details.days {
        if day.day.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "day".into(),
                message: "day label cannot be empty".into(),
            });
        }
        if day.exercises.is_empty() {
            return Err(ValidationError::EmptyCollection(format!(
                "exercises for day '{}'",
                day.day
            )));
        }
        for exercise in &day.exercises {
            if exercise.name.trim().is_empty() {
                return Err(ValidationError::InvalidValue {
                    field: "exercise.name".into(),
                    message: format!("unnamed exercise in day '{}'", day.day),
                });
            }
            if exercise.sets == 0 {
                return Err(ValidationError::InvalidValue {
                    field: exercise.name.clone(),
                    message: "sets must be at least 1".into(),
                });
            }
            if !exercise.has_workload() {
                return Err(ValidationError::InvalidValue {
                    field: exercise.name.clone(),
                    message: "exercise needs repetitions or a duration".into(),
                });
            }
        }
    }
    Ok(())
}
