//! The `dnaboard validate` command.

use std::path::PathBuf;

use anyhow::Result;

use dnaboard_core::generator::GeneratorRegistry;
use dnaboard_core::parser::{load_banks, validate_bank};

pub fn execute(bank_path: PathBuf) -> Result<()> {
    let banks = load_banks(&bank_path)?;
    let registry = GeneratorRegistry::builtin();

    let mut total_warnings = 0;

    for bank in &banks {
        println!("Bank: {} ({} items)", bank.name, bank.items.len());

        let warnings = validate_bank(bank, &registry);
        for w in &warnings {
            let prefix = w
                .item_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
