use chrono::Utc;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use trainflow_core::storage::Config;
use trainflow_core::timefmt::format_duration;
use trainflow_core::{Database, Direction, Event, SessionEngine, SessionExercise, SessionState};
use uuid::Uuid;

const SESSION_KEY: &str = "active_session";

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a session for a plan day
    Start {
        /// Plan id
        plan_id: Uuid,
        /// Day label, defaults to the plan's first day
        #[arg(long)]
        day: Option<String>,
    },
    /// Print the current session state as JSON
    Status,
    /// Complete the current set of the active exercise
    CompleteSet,
    /// Skip the running rest countdown
    SkipRest,
    /// Move a queued exercise up or down
    Move {
        /// Zero-based position in the session's exercise list
        index: usize,
        direction: MoveDirection,
    },
    /// Abandon the session, discarding all progress
    Leave {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Tick the engine continuously until the rest countdown finishes
    Watch,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

/// What the CLI stashes in the kv store between invocations: the engine
/// plus the plan identity the completion record needs.
#[derive(Serialize, Deserialize)]
struct ActiveSession {
    plan_id: Uuid,
    plan_name: String,
    engine: SessionEngine,
}

fn load_session(db: &Database) -> Result<Option<ActiveSession>, Box<dyn std::error::Error>> {
    match db.kv_get(SESSION_KEY)? {
        Some(json) => match serde_json::from_str(&json) {
            Ok(session) => Ok(Some(session)),
            Err(_) => {
                Err("stored session state is corrupt; run `trainflow session leave --yes`".into())
            }
        },
        None => Ok(None),
    }
}

fn save_session(db: &Database, session: &ActiveSession) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string(session)?;
    db.kv_set(SESSION_KEY, &json)?;
    Ok(())
}

fn require_session(db: &Database) -> Result<ActiveSession, Box<dyn std::error::Error>> {
    load_session(db)?
        .ok_or_else(|| "no active session; start one with `trainflow session start <plan-id>`".into())
}

/// The persistence handoff: record the finished session, report, and
/// clear the kv slot. On failure the slot is left intact so re-running
/// the command retries.
fn persist_finished(
    db: &Database,
    session: &ActiveSession,
) -> Result<(), Box<dyn std::error::Error>> {
    let duration_secs = session.engine.duration_secs();
    match db.record_session(
        session.plan_id,
        &session.plan_name,
        session.engine.day_label(),
        duration_secs,
        Utc::now(),
    ) {
        Ok(_) => {
            db.kv_delete(SESSION_KEY)?;
            println!("Training session completed!");
            println!("Total duration: {}", format_duration(duration_secs));
            println!("Review the plan with `trainflow plan show {}`", session.plan_id);
            Ok(())
        }
        Err(e) => {
            save_session(db, session)?;
            Err(format!("failed to save the completed session: {e}; re-run to retry").into())
        }
    }
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        SessionAction::Start { plan_id, day } => {
            if load_session(&db)?.is_some() {
                return Err(
                    "a session is already active; finish it or run `trainflow session leave`"
                        .into(),
                );
            }
            let plan = db
                .get_plan(plan_id)?
                .ok_or_else(|| format!("plan not found: {plan_id}"))?;
            let day = match &day {
                Some(label) => plan
                    .details
                    .day(label)
                    .ok_or_else(|| format!("plan has no day '{label}'"))?,
                None => plan
                    .details
                    .days
                    .first()
                    .ok_or("plan has no days")?,
            };
            let exercises = SessionExercise::from_day(day)?;
            let mut engine = SessionEngine::new(exercises, day.day.clone());
            if let Some(event) = engine.start() {
                print_event(&event)?;
            }
            let session = ActiveSession {
                plan_id: plan.id,
                plan_name: plan.name,
                engine,
            };
            save_session(&db, &session)?;
        }
        SessionAction::Status => {
            let mut session = require_session(&db)?;
            let event = session.engine.tick();
            println!(
                "{}",
                serde_json::to_string_pretty(&session.engine.snapshot())?
            );
            let queue: Vec<serde_json::Value> = session
                .engine
                .exercises()
                .iter()
                .enumerate()
                .map(|(index, exercise)| {
                    serde_json::json!({
                        "index": index,
                        "id": exercise.id,
                        "name": exercise.name,
                        "sets": exercise.sets,
                        "workload": exercise.workload.label(),
                        "rest_secs": exercise.rest_secs,
                        "completed": session.engine.completed()[index],
                        "active": index == session.engine.active_index(),
                    })
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "exercises": queue }))?
            );
            if let Some(event) = event {
                print_event(&event)?;
            }
            save_session(&db, &session)?;
        }
        SessionAction::CompleteSet => {
            let mut session = require_session(&db)?;
            if session.engine.state() == SessionState::Finished {
                // A previous handoff failed; retry it.
                return persist_finished(&db, &session);
            }
            session.engine.tick();
            match session.engine.complete_set() {
                Some(Event::SessionFinished { .. }) => {
                    return persist_finished(&db, &session);
                }
                Some(event) => print_event(&event)?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&session.engine.snapshot())?
                ),
            }
            save_session(&db, &session)?;
        }
        SessionAction::SkipRest => {
            let mut session = require_session(&db)?;
            session.engine.tick();
            match session.engine.skip_rest() {
                Some(event) => print_event(&event)?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&session.engine.snapshot())?
                ),
            }
            save_session(&db, &session)?;
        }
        SessionAction::Move { index, direction } => {
            let mut session = require_session(&db)?;
            match session.engine.move_exercise(index, direction.into()) {
                Some(event) => print_event(&event)?,
                None => println!(
                    "{}",
                    serde_json::to_string_pretty(&session.engine.snapshot())?
                ),
            }
            save_session(&db, &session)?;
        }
        SessionAction::Leave { yes } => {
            let Some(raw) = db.kv_get(SESSION_KEY)? else {
                println!("no active session");
                return Ok(());
            };
            let Ok(session) = serde_json::from_str::<ActiveSession>(&raw) else {
                if yes {
                    db.kv_delete(SESSION_KEY)?;
                    println!("corrupt session state cleared");
                    return Ok(());
                }
                return Err(
                    "stored session state is corrupt; re-run with --yes to clear it".into(),
                );
            };
            if session.engine.state() == SessionState::Finished {
                db.kv_delete(SESSION_KEY)?;
                println!("session already finished; state cleared");
                return Ok(());
            }
            let config = Config::load()?;
            if config.confirm_leave && !yes {
                println!("Leaving now will lose all session progress.");
                println!("Re-run with --yes to confirm.");
                return Ok(());
            }
            db.kv_delete(SESSION_KEY)?;
            println!("session abandoned; progress discarded");
        }
        SessionAction::Watch => {
            let mut session = require_session(&db)?;
            let config = Config::load()?;
            watch(&mut session.engine, config.watch.refresh_ms)?;
            save_session(&db, &session)?;
        }
    }
    Ok(())
}

/// Tick the engine at the configured cadence, reporting the countdown,
/// until the session leaves the resting state.
fn watch(engine: &mut SessionEngine, refresh_ms: u64) -> Result<(), Box<dyn std::error::Error>> {
    if engine.state() != SessionState::Resting {
        println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(async {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_millis(refresh_ms.max(10)));
        let mut last_reported = u64::MAX;
        loop {
            interval.tick().await;
            let finished = engine.tick();
            if let Event::StateSnapshot {
                rest_remaining_secs,
                rest_initial_secs,
                ..
            } = engine.snapshot()
            {
                if engine.state() == SessionState::Resting && rest_remaining_secs != last_reported {
                    println!("resting: {rest_remaining_secs}s / {rest_initial_secs}s");
                    last_reported = rest_remaining_secs;
                }
            }
            if let Some(event) = finished {
                println!("{}", serde_json::to_string_pretty(&event)?);
                break;
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    println!("{}", serde_json::to_string_pretty(&engine.snapshot())?);
    Ok(())
}
