use clap::Subcommand;
use trainflow_core::Database;

#[derive(Subcommand)]
pub enum StatsAction {
    /// All-time totals
    All,
    /// Per-day duration totals over a recent window
    Trend {
        /// Window size in days
        #[arg(long, default_value = "14")]
        days: u32,
    },
    /// Session counts grouped by plan
    ByPlan,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        StatsAction::All => {
            let stats = db.stats_all()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Trend { days } => {
            let trend = db.duration_trend(days)?;
            println!("{}", serde_json::to_string_pretty(&trend)?);
        }
        StatsAction::ByPlan => {
            let counts = db.sessions_by_plan()?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }
    Ok(())
}
