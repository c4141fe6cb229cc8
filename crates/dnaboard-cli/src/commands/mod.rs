pub mod build;
pub mod due;
pub mod init;
pub mod preview;
pub mod session;
pub mod share;
pub mod stats;
pub mod validate;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use dnaboard_core::board::Board;
use dnaboard_core::engine::BoardAssembler;
use dnaboard_core::generator::GeneratorRegistry;
use dnaboard_stores::config::{create_stores, load_config_from, DnaboardConfig, Stores};

/// Load config and open the configured stores.
pub fn open(config_path: Option<&Path>) -> Result<(DnaboardConfig, Stores)> {
    let config = load_config_from(config_path)?;
    let stores = create_stores(&config.store)?;
    tracing::debug!(store = stores.scheduler.name(), "stores ready");
    Ok((config, stores))
}

pub fn assembler(config: &DnaboardConfig, stores: &Stores) -> BoardAssembler {
    BoardAssembler::new(
        Arc::clone(&stores.scheduler),
        Arc::clone(&stores.pool),
        Arc::new(GeneratorRegistry::builtin()),
        config.assembler_config(),
    )
}

pub fn read_board(path: &Path) -> Result<Board> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read board: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse board: {}", path.display()))
}

/// Split a comma-separated argument, dropping blanks.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}
