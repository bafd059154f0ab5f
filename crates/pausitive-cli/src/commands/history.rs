use clap::Subcommand;
use pausitive_core::catalog::format_duration;

use super::open_history;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List completed sessions, most recent first
    List {
        /// Show at most this many sessions
        #[arg(long)]
        limit: Option<usize>,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete all recorded sessions
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let history = open_history();
    match action {
        HistoryAction::List { limit, json } => {
            let mut records = history.load();
            if let Some(limit) = limit {
                records.truncate(limit);
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
                return Ok(());
            }
            if records.is_empty() {
                println!("No sessions recorded yet.");
            }
            for r in &records {
                println!(
                    "{}  {:<16} {:<12} {:>2}/{:<2} sets  {}",
                    r.end_time.format("%Y-%m-%d %H:%M"),
                    r.technique.name,
                    r.mode.name,
                    r.completed_sets,
                    r.total_sets,
                    format_duration(r.total_duration_ms / 1000)
                );
            }
        }
        HistoryAction::Clear => {
            if !history.clear() {
                return Err("history could not be cleared".into());
            }
            println!("history cleared");
        }
    }
    Ok(())
}
