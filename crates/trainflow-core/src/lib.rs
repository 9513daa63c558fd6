//! # Trainflow Core Library
//!
//! This library provides the core business logic for Trainflow, a
//! training-session tracker. It implements a CLI-first philosophy where
//! all operations are available via a standalone CLI binary over the
//! same core library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine that requires
//!   the caller to periodically invoke `tick()` while a rest countdown
//!   or skip animation is running
//! - **Plans**: The stored training-plan model and import validation
//! - **Storage**: SQLite-based plan/session storage and TOML-based
//!   configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`Database`]: Plan, session-history and statistics persistence
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod plan;
pub mod session;
pub mod storage;
pub mod timefmt;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use plan::{PlanDay, PlanDetails, PlanDocument, TrainingPlan};
pub use session::{Direction, SessionEngine, SessionExercise, SessionState, Workload};
pub use storage::{Config, Database, PlanSummary, SessionRecord, Stats};
