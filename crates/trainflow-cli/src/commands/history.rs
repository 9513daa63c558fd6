use clap::Subcommand;
use trainflow_core::storage::Config;
use trainflow_core::timefmt::format_time_from_seconds;
use trainflow_core::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed sessions, newest first
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size, defaults to history.page_limit
        #[arg(long)]
        limit: Option<u32>,
    },
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List { page, limit } => {
            let limit = match limit {
                Some(limit) => limit,
                None => Config::load()?.history.page_limit,
            };
            let (records, total) = db.list_sessions(page, limit)?;
            let items: Vec<serde_json::Value> = records
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id,
                        "plan_id": r.plan_id,
                        "plan_name": r.plan_name,
                        "day_label": r.day_label,
                        "duration_secs": r.duration_secs,
                        "duration": format_time_from_seconds(r.duration_secs),
                        "completed_at": r.completed_at,
                    })
                })
                .collect();
            let output = serde_json::json!({
                "items": items,
                "total": total,
                "page": page,
                "limit": limit,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
