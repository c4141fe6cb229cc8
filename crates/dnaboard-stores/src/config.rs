//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use dnaboard_core::engine::{BoardAssemblerConfig, DEFAULT_CAPACITY};
use dnaboard_core::parser::load_banks;
use dnaboard_core::traits::{QuestionPoolStore, SchedulingStore, ShareStore};

use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::rest::RestStore;

/// Which backend holds the question pool and the session history.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Everything in memory. The pool comes from `bank` if given.
    Memory {
        #[serde(default)]
        bank: Option<PathBuf>,
    },
    /// Bank files plus a local JSON data directory.
    File {
        #[serde(default = "default_bank")]
        bank: PathBuf,
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
    /// Hosted PostgREST backend.
    Rest { base_url: String, api_key: String },
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::Memory { bank } => f.debug_struct("Memory").field("bank", bank).finish(),
            StoreConfig::File { bank, data_dir } => f
                .debug_struct("File")
                .field("bank", bank)
                .field("data_dir", data_dir)
                .finish(),
            StoreConfig::Rest {
                base_url,
                api_key: _,
            } => f
                .debug_struct("Rest")
                .field("base_url", base_url)
                .field("api_key", &"***")
                .finish(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            bank: default_bank(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_bank() -> PathBuf {
    PathBuf::from("./question-banks")
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./dnaboard-data")
}

/// Top-level dnaboard configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnaboardConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Slots per board when none is requested.
    #[serde(default = "default_capacity")]
    pub default_capacity: usize,
    /// Limit on a single generator run in milliseconds.
    #[serde(default = "default_generator_timeout")]
    pub generator_timeout_ms: u64,
    /// Fixed seed for reproducible boards.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}
fn default_generator_timeout() -> u64 {
    2000
}

impl Default for DnaboardConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_capacity: default_capacity(),
            generator_timeout_ms: default_generator_timeout(),
            seed: None,
        }
    }
}

impl DnaboardConfig {
    pub fn assembler_config(&self) -> BoardAssemblerConfig {
        BoardAssemblerConfig {
            default_capacity: self.default_capacity,
            generator_timeout: Duration::from_millis(self.generator_timeout_ms),
            seed: self.seed,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are copied through as-is, never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::Memory { bank } => StoreConfig::Memory {
            bank: bank.as_ref().map(|b| resolve_path(b)),
        },
        StoreConfig::File { bank, data_dir } => StoreConfig::File {
            bank: resolve_path(bank),
            data_dir: resolve_path(data_dir),
        },
        StoreConfig::Rest { base_url, api_key } => StoreConfig::Rest {
            base_url: resolve_env_vars(base_url),
            api_key: resolve_env_vars(api_key),
        },
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `dnaboard.toml` in the current directory
/// 2. `~/.config/dnaboard/config.toml`
///
/// Environment variable overrides: `DNABOARD_BASE_URL`, `DNABOARD_API_KEY`.
/// Setting the base URL switches the store to REST.
pub fn load_config() -> Result<DnaboardConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<DnaboardConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from("dnaboard.toml");
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|home| home.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => DnaboardConfig::default(),
    };

    apply_env_overrides(&mut config);
    config.store = resolve_store_config(&config.store);
    Ok(config)
}

/// Parse a config file body.
pub fn parse_config(content: &str) -> Result<DnaboardConfig> {
    Ok(toml::from_str(content)?)
}

fn apply_env_overrides(config: &mut DnaboardConfig) {
    if let Ok(url) = std::env::var("DNABOARD_BASE_URL") {
        match &mut config.store {
            StoreConfig::Rest { base_url, .. } => *base_url = url,
            other => {
                *other = StoreConfig::Rest {
                    base_url: url,
                    api_key: String::new(),
                }
            }
        }
    }

    if let Ok(key) = std::env::var("DNABOARD_API_KEY") {
        if let StoreConfig::Rest { api_key, .. } = &mut config.store {
            *api_key = key;
        }
    }
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("dnaboard"))
}

/// The three store roles, possibly served by one backend.
#[derive(Clone)]
pub struct Stores {
    pub scheduler: Arc<dyn SchedulingStore>,
    pub pool: Arc<dyn QuestionPoolStore>,
    pub share: Arc<dyn ShareStore>,
}

impl Stores {
    /// All three roles from one backend.
    pub fn from_backend<S>(store: Arc<S>) -> Self
    where
        S: SchedulingStore + QuestionPoolStore + ShareStore + 'static,
    {
        Self {
            scheduler: store.clone(),
            pool: store.clone(),
            share: store,
        }
    }
}

/// Create the stores described by `config`.
pub fn create_stores(config: &StoreConfig) -> Result<Stores> {
    tracing::debug!(?config, "creating stores");
    match config {
        StoreConfig::Memory { bank } => {
            let items = match bank {
                Some(path) => load_banks(path)?
                    .into_iter()
                    .flat_map(|b| b.items)
                    .collect(),
                None => Vec::new(),
            };
            Ok(Stores::from_backend(Arc::new(MemoryStore::new(items))))
        }
        StoreConfig::File { bank, data_dir } => {
            Ok(Stores::from_backend(Arc::new(FileStore::open(bank, data_dir)?)))
        }
        StoreConfig::Rest { base_url, api_key } => {
            if api_key.is_empty() {
                tracing::warn!("REST store configured without an API key");
            }
            Ok(Stores::from_backend(Arc::new(RestStore::new(base_url, api_key)?)))
        }
    }
}
