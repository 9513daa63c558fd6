//! The CLI's storage flow against a real on-disk database: import a
//! plan, run a session persisted through the kv store, record the
//! result, and read back history.

use chrono::Utc;
use trainflow_core::{Database, Event, PlanDocument, SessionEngine, SessionExercise};

const SESSION_KEY: &str = "active_session";

fn open_db(dir: &tempfile::TempDir) -> Database {
    Database::open_at(&dir.path().join("trainflow.db")).unwrap()
}

fn import_plan(db: &Database) -> trainflow_core::TrainingPlan {
    let document: PlanDocument = serde_json::from_str(
        r#"{
            "name": "Strength Block",
            "description": "imported from file",
            "plan_details": {
                "description": "generated",
                "days": [
                    {
                        "day": "Day 1",
                        "exercises": [
                            {"name": "Deadlift", "sets": 2, "repetitions": 5, "rest_time_seconds": 0},
                            {"name": "Row", "sets": 1, "repetitions": 10, "rest_time_seconds": 0}
                        ]
                    }
                ]
            }
        }"#,
    )
    .unwrap();
    let plan = document.into_plan().unwrap();
    db.insert_plan(&plan).unwrap();
    plan
}

#[test]
fn full_session_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let plan = {
        let db = open_db(&dir);
        let plan = import_plan(&db);

        // Bootstrap and stash the engine the way `session start` does.
        let day = plan.details.day("Day 1").unwrap();
        let mut engine =
            SessionEngine::new(SessionExercise::from_day(day).unwrap(), day.day.clone());
        engine.start_at(0);
        db.kv_set(SESSION_KEY, &serde_json::to_string(&engine).unwrap())
            .unwrap();
        plan
    };

    // A later invocation reopens the database and picks the engine up.
    let db = open_db(&dir);
    let json = db.kv_get(SESSION_KEY).unwrap().unwrap();
    let mut engine: SessionEngine = serde_json::from_str(&json).unwrap();

    engine.complete_set_at(60_000);
    engine.complete_set_at(120_000);
    let finished = engine.complete_set_at(300_000);
    let duration_secs = match finished {
        Some(Event::SessionFinished { duration_secs, .. }) => duration_secs,
        other => panic!("expected SessionFinished, got {other:?}"),
    };
    assert_eq!(duration_secs, 300);

    // Persistence handoff, then the kv slot is cleared.
    db.record_session(plan.id, &plan.name, "Day 1", duration_secs, Utc::now())
        .unwrap();
    db.kv_delete(SESSION_KEY).unwrap();
    assert!(db.kv_get(SESSION_KEY).unwrap().is_none());

    let (sessions, total) = db.list_sessions(1, 10).unwrap();
    assert_eq!(total, 1);
    assert_eq!(sessions[0].plan_name, "Strength Block");
    assert_eq!(sessions[0].day_label, "Day 1");
    assert_eq!(sessions[0].duration_secs, 300);

    let stats = db.stats_all().unwrap();
    assert_eq!(stats.total_sessions, 1);
    assert_eq!(stats.sessions_last_7_days, 1);
}

#[test]
fn plan_management_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = open_db(&dir);
    let plan = import_plan(&db);

    let (plans, total) = db.list_plans(1, 10).unwrap();
    assert_eq!(total, 1);
    assert_eq!(plans[0].name, "Strength Block");
    assert_eq!(plans[0].day_count, 1);
    assert_eq!(plans[0].description.as_deref(), Some("imported from file"));

    assert!(db.rename_plan(plan.id, "Strength Block v2").unwrap());
    let loaded = db.get_plan(plan.id).unwrap().unwrap();
    assert_eq!(loaded.name, "Strength Block v2");
    assert_eq!(loaded.details.days[0].exercises.len(), 2);

    assert!(db.delete_plan(plan.id).unwrap());
    let (plans, total) = db.list_plans(1, 10).unwrap();
    assert!(plans.is_empty());
    assert_eq!(total, 0);
}
