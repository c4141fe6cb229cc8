//! The `dnaboard session` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};

use dnaboard_core::board::{Board, BoardState};
use dnaboard_core::statistics::SessionStats;

use super::{assembler, open, read_board, split_list};

pub async fn execute(board_path: PathBuf, ratings: String, config_path: Option<PathBuf>) -> Result<()> {
    let (config, stores) = open(config_path.as_deref())?;
    let board = read_board(&board_path)?;
    anyhow::ensure!(
        board.state != BoardState::Complete,
        "board in {} was already recorded",
        board_path.display()
    );

    let scores = split_list(&ratings)
        .iter()
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("invalid rating: {s}"))
        })
        .collect::<Result<Vec<u32>>>()?;
    anyhow::ensure!(
        scores.len() == board.len(),
        "expected {} ratings, got {}",
        board.len(),
        scores.len()
    );

    let mut live = assembler(&config, &stores).resume(board);
    let order = live.board().order().to_vec();
    for (id, score) in order.into_iter().zip(scores) {
        live.rate(id, score)?;
    }

    let session = match live.complete_session().await {
        Ok(session) => session,
        Err(e) => {
            // Keep the pending session id with the board so the next run
            // resends the same session.
            write_board(&board_path, live.board())?;
            return Err(e).with_context(|| {
                format!(
                    "session kept in {}, run the command again to retry",
                    board_path.display()
                )
            });
        }
    };

    // Mark the saved board as recorded so it is not submitted twice.
    write_board(&board_path, live.board())?;

    let mut table = Table::new();
    table.set_header(vec!["#", "Topic", "Rating", "Next review"]);
    for (n, result) in session.results.iter().enumerate() {
        let rating = result
            .rating
            .map(|r| format!("{} ({})", r.score(), r.label()))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            Cell::new(n + 1),
            Cell::new(&result.topic),
            Cell::new(rating),
            Cell::new(format!("in {} lesson(s)", result.interval)),
        ]);
    }
    println!("{table}");

    let stats = SessionStats::from_session(&session);
    if let Some(mean) = stats.mean_score {
        println!("Mean score: {mean:.1}");
    }
    println!("Session {} recorded for {}", session.id, session.group_id);

    Ok(())
}

fn write_board(path: &Path, board: &Board) -> Result<()> {
    let json = serde_json::to_string_pretty(board).context("failed to serialize board")?;
    std::fs::write(path, json).with_context(|| format!("failed to write board: {}", path.display()))
}
