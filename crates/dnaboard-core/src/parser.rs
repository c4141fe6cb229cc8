//! TOML question bank parser.
//!
//! Loads question banks from TOML files and directories, and validates them.
//! Difficulty is normalized here, so every `Item` leaving this module
//! carries a canonical level.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::difficulty::{Difficulty, RawDifficulty};
use crate::generator::GeneratorRegistry;
use crate::model::{GeneratorRef, Item};

/// A named collection of items loaded from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub items: Vec<Item>,
}

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    items: Vec<TomlItem>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlItem {
    id: String,
    topic: String,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    skill: Option<String>,
    #[serde(default)]
    difficulty: Option<RawDifficulty>,
    generator: TomlGenerator,
}

/// `strategy` plus everything else in the table as parameters.
#[derive(Debug, Deserialize)]
struct TomlGenerator {
    strategy: String,
    #[serde(flatten)]
    params: toml::Table,
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read question bank: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let default_domain = parsed.bank.domain;
    let items = parsed
        .items
        .into_iter()
        .map(|i| {
            let params = serde_json::to_value(&i.generator.params).with_context(|| {
                format!("item '{}': generator params are not representable", i.id)
            })?;
            Ok(Item {
                difficulty: i
                    .difficulty
                    .as_ref()
                    .map(Difficulty::normalize)
                    .unwrap_or_default(),
                generator: GeneratorRef::new(i.generator.strategy, params),
                domain: i.domain.or_else(|| default_domain.clone()),
                id: i.id,
                topic: i.topic,
                skill: i.skill,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        description: parsed.bank.description,
        items,
    })
}

/// Recursively load all `.toml` bank files from a directory.
///
/// Files that fail to parse are skipped with a warning.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a bank file or a directory of bank files.
pub fn load_banks(path: &Path) -> Result<Vec<QuestionBank>> {
    if path.is_dir() {
        load_bank_directory(path)
    } else {
        Ok(vec![parse_bank(path)?])
    }
}

/// A warning from bank validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationWarning {
    /// The item ID (if applicable).
    pub item_id: Option<String>,
    pub message: String,
}

/// Number of seeds each generator is smoke-run with.
const SMOKE_RUNS: u64 = 5;

/// Validate a bank for common issues, including running every generator.
pub fn validate_bank(bank: &QuestionBank, registry: &GeneratorRegistry) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for item in &bank.items {
        if !seen_ids.insert(&item.id) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!("duplicate item ID: {}", item.id),
            });
        }
    }

    for item in &bank.items {
        if item.topic.trim().is_empty() {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: "topic is empty".into(),
            });
        }
    }

    for item in &bank.items {
        if !registry.contains(&item.generator.strategy) {
            warnings.push(ValidationWarning {
                item_id: Some(item.id.clone()),
                message: format!("unknown generator strategy '{}'", item.generator.strategy),
            });
            continue;
        }
        // One failure per item is enough to act on.
        for seed in 0..SMOKE_RUNS {
            if let Err(e) = registry.try_instantiate(&item.generator, seed) {
                warnings.push(ValidationWarning {
                    item_id: Some(item.id.clone()),
                    message: format!("generator failed (seed {seed}): {e}"),
                });
                break;
            }
        }
    }

    if bank.items.is_empty() {
        warnings.push(ValidationWarning {
            item_id: None,
            message: "bank has no items".into(),
        });
    }

    warnings
}
