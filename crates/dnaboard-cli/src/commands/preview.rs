//! The `dnaboard preview` command.

use std::path::PathBuf;

use anyhow::Result;

use dnaboard_core::generator::GeneratorRegistry;
use dnaboard_core::parser::load_banks;

pub fn execute(bank_path: PathBuf, item_id: Option<String>, count: usize, seed: u64) -> Result<()> {
    anyhow::ensure!(count >= 1, "count must be at least 1");

    let banks = load_banks(&bank_path)?;
    let registry = GeneratorRegistry::builtin();
    let mut shown = 0;

    for item in banks.iter().flat_map(|b| b.items.iter()) {
        if item_id.as_ref().is_some_and(|id| id != &item.id) {
            continue;
        }
        shown += 1;
        println!(
            "[{}] {} {} ({})",
            item.id, item.topic, item.difficulty, item.generator.strategy
        );
        for n in 0..count as u64 {
            match registry.try_instantiate(&item.generator, seed.wrapping_add(n)) {
                Ok(instance) => {
                    println!("  Q: {}", instance.question);
                    println!("  A: {}", instance.answer);
                    if let Some(image) = &instance.image {
                        println!("  image: {image}");
                    }
                }
                Err(e) => println!("  ERROR: {e}"),
            }
        }
    }

    if shown == 0 {
        match item_id {
            Some(id) => anyhow::bail!("no item with id {id}"),
            None => println!("No items found."),
        }
    }

    Ok(())
}
