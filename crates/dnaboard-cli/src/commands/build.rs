//! The `dnaboard build` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use dnaboard_core::board::Board;
use dnaboard_core::difficulty::Difficulty;
use dnaboard_core::model::ItemFilter;

use super::{assembler, open, split_list};

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    group: String,
    topics: Option<String>,
    difficulty: Option<String>,
    capacity: Option<usize>,
    seed: Option<u64>,
    answers: bool,
    save: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (mut config, stores) = open(config_path.as_deref())?;
    if seed.is_some() {
        config.seed = seed;
    }
    let capacity = capacity.unwrap_or(config.default_capacity);

    let mut filter = match topics {
        Some(topics) => ItemFilter::topics(split_list(&topics)),
        None => ItemFilter::default(),
    };
    if let Some(difficulty) = difficulty {
        let level: Difficulty = difficulty.parse().map_err(anyhow::Error::msg)?;
        filter = filter.with_difficulty(level);
    }

    let board = assembler(&config, &stores)
        .build_board(&group, &filter, capacity)
        .await;
    let board = board.into_board();

    print_board(&board, answers);

    if let Some(path) = save {
        let json = serde_json::to_string_pretty(&board).context("failed to serialize board")?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write board: {}", path.display()))?;
        println!("Board saved to {}", path.display());
    }

    Ok(())
}

fn print_board(board: &Board, answers: bool) {
    println!(
        "Board for {} ({}/{} slots)",
        board.group_id,
        board.len(),
        board.capacity
    );
    if board.is_empty() {
        println!("No questions available.");
        return;
    }

    let mut table = Table::new();
    let mut header = vec!["#", "Origin", "Topic", "Level", "Question"];
    if answers {
        header.push("Answer");
    }
    table.set_header(header);

    for (n, slot) in board.slots().enumerate() {
        let mut row = vec![
            Cell::new(n + 1),
            Cell::new(if slot.is_review() { "review" } else { "new" }),
            Cell::new(slot.topic()),
            Cell::new(slot.difficulty),
            Cell::new(&slot.question),
        ];
        if answers {
            row.push(Cell::new(&slot.answer));
        }
        table.add_row(row);
    }

    println!("{table}");
}
