//! dnaboard-stores: store adapters for the board engine.
//!
//! Implements the scheduling, question-pool and share store traits for an
//! in-memory backend, a local file backend and a hosted PostgREST backend.

pub mod config;
pub mod file;
pub mod history;
pub mod memory;
pub mod rest;

pub use config::{create_stores, load_config, load_config_from, DnaboardConfig, StoreConfig, Stores};
pub use file::FileStore;
pub use memory::MemoryStore;
pub use rest::RestStore;
