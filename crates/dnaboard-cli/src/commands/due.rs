//! The `dnaboard due` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::open;

pub async fn execute(group: String, config_path: Option<PathBuf>) -> Result<()> {
    let (_, stores) = open(config_path.as_deref())?;
    let due = stores.scheduler.due_items(&group).await?;

    if due.is_empty() {
        println!("Nothing due for {group}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Item", "Topic", "Level", "Interval", "Overdue by", "Question"]);
    for record in &due {
        table.add_row(vec![
            Cell::new(&record.item_id),
            Cell::new(&record.topic),
            Cell::new(record.difficulty),
            Cell::new(record.interval),
            Cell::new(record.overdue_by),
            Cell::new(&record.question),
        ]);
    }

    println!("{} item(s) due for {group}", due.len());
    println!("{table}");
    Ok(())
}
