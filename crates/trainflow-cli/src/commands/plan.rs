use std::path::PathBuf;

use clap::Subcommand;
use trainflow_core::storage::Config;
use trainflow_core::{Database, PlanDocument};
use uuid::Uuid;

#[derive(Subcommand)]
pub enum PlanAction {
    /// Import a plan from a JSON file
    Import {
        /// Path to the plan document
        file: PathBuf,
    },
    /// List stored plans
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        /// Page size, defaults to history.page_limit
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Print a plan as JSON
    Show {
        /// Plan id
        id: Uuid,
    },
    /// Rename a plan
    Rename {
        /// Plan id
        id: Uuid,
        /// New name
        name: String,
    },
    /// Delete a plan
    Delete {
        /// Plan id
        id: Uuid,
    },
}

pub fn run(action: PlanAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        PlanAction::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let document: PlanDocument = serde_json::from_str(&content)?;
            let plan = document.into_plan()?;
            db.insert_plan(&plan)?;
            println!("Imported plan '{}' ({})", plan.name, plan.id);
        }
        PlanAction::List { page, limit } => {
            let limit = match limit {
                Some(limit) => limit,
                None => Config::load()?.history.page_limit,
            };
            let (items, total) = db.list_plans(page, limit)?;
            let output = serde_json::json!({
                "items": items,
                "total": total,
                "page": page,
                "limit": limit,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        PlanAction::Show { id } => {
            let plan = db
                .get_plan(id)?
                .ok_or_else(|| format!("plan not found: {id}"))?;
            println!("{}", serde_json::to_string_pretty(&plan)?);
        }
        PlanAction::Rename { id, name } => {
            if !db.rename_plan(id, &name)? {
                return Err(format!("plan not found: {id}").into());
            }
            println!("ok");
        }
        PlanAction::Delete { id } => {
            if !db.delete_plan(id)? {
                return Err(format!("plan not found: {id}").into());
            }
            println!("deleted");
        }
    }
    Ok(())
}
