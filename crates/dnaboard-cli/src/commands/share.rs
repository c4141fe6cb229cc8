//! The `dnaboard share` and `dnaboard shared` commands.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{assembler, open, read_board};

pub async fn publish(board_path: PathBuf, name: String, config_path: Option<PathBuf>) -> Result<()> {
    let (config, stores) = open(config_path.as_deref())?;
    let board = read_board(&board_path)?;
    anyhow::ensure!(!board.is_empty(), "board in {} has no questions", board_path.display());

    let shared = assembler(&config, &stores).resume(board).share(name);
    let id = stores.share.publish(&shared).await?;
    println!("Shared \"{}\" ({} questions) as {id}", shared.name, shared.len());
    Ok(())
}

pub async fn list(search: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let (_, stores) = open(config_path.as_deref())?;
    let query = search.unwrap_or_default();
    let boards: Vec<_> = stores
        .share
        .list()
        .await?
        .into_iter()
        .filter(|(_, board)| board.matches_search(&query))
        .collect();

    if boards.is_empty() {
        println!("No shared boards found.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Id", "Name", "Created", "Questions", "Topics"]);
    for (id, board) in &boards {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(&board.name),
            Cell::new(board.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(board.len()),
            Cell::new(board.topics().join(", ")),
        ]);
    }
    println!("{table}");
    Ok(())
}
