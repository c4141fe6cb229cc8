//! The `dnaboard stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use dnaboard_core::statistics::{stats_by_topic, SessionStats};
use dnaboard_stores::config::{load_config_from, StoreConfig};
use dnaboard_stores::FileStore;

pub fn execute(
    group: String,
    by_topic: bool,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let StoreConfig::File { bank, data_dir } = &config.store else {
        anyhow::bail!("stats reads local session history and needs a file store");
    };
    let store = FileStore::open(bank, data_dir)?;
    let sessions = store.sessions_for(&group)?;

    let overall = SessionStats::from_sessions(&sessions);
    let topics = if by_topic {
        stats_by_topic(&sessions)
    } else {
        Default::default()
    };

    match format.as_str() {
        "json" => {
            let value = serde_json::json!({
                "group": group,
                "overall": overall,
                "by_topic": topics,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        "text" => {
            let mut table = Table::new();
            table.set_header(vec!["Scope", "Sessions", "Answered", "Mean", "Success", "Unrated"]);
            table.add_row(row("all", &overall));
            for (topic, stats) in &topics {
                table.add_row(row(topic, stats));
            }
            println!("Statistics for {group}");
            println!("{table}");
        }
        other => anyhow::bail!("unknown format: {other} (expected text or json)"),
    }

    Ok(())
}

fn row(scope: &str, stats: &SessionStats) -> Vec<Cell> {
    vec![
        Cell::new(scope),
        Cell::new(stats.sessions),
        Cell::new(stats.answered),
        Cell::new(
            stats
                .mean_score
                .map(|m| format!("{m:.1}"))
                .unwrap_or_else(|| "-".into()),
        ),
        Cell::new(
            stats
                .success_rate
                .map(|r| format!("{:.0}%", r * 100.0))
                .unwrap_or_else(|| "-".into()),
        ),
        Cell::new(stats.unrated),
    ]
}
