//! dnaboard-core: board composition engine, generators, and scheduling rules.
//!
//! This crate builds practice boards from due review items and freshly
//! generated questions, tracks grading, and turns ratings into review
//! intervals. Storage lives behind the traits in [`traits`].

pub mod board;
pub mod difficulty;
pub mod engine;
pub mod error;
pub mod expr;
pub mod generator;
pub mod interval;
pub mod model;
pub mod parser;
pub mod random;
pub mod sampler;
pub mod selector;
pub mod session;
pub mod share;
pub mod statistics;
pub mod traits;

pub use board::{Board, BoardSlot, BoardState, GradingStatus, SlotOrigin, SlotSource};
pub use difficulty::Difficulty;
pub use engine::{BoardAssembler, BoardAssemblerConfig, LiveBoard, RetargetOutcome, DEFAULT_CAPACITY};
pub use error::{BoardError, StoreError};
pub use generator::GeneratorRegistry;
pub use interval::Rating;
pub use model::{DueRecord, Item, ItemFilter, Selection, SlotId};
pub use session::Session;
pub use share::SharedBoard;
