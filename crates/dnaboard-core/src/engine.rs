//! Board assembly and the live board state machine.
//!
//! [`BoardAssembler`] builds boards (`Building → Active`); [`LiveBoard`]
//! carries one board through grading to a recorded session
//! (`Active → Grading → Complete`).

use std::sync::Arc;
use std::time::Duration;

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::board::{Board, BoardSlot, BoardState, GradingStatus, PendingSession, SlotSource};
use crate::difficulty::Difficulty;
use crate::error::{BoardError, StoreError};
use crate::generator::{instantiate_with_timeout, GeneratorRegistry, DEFAULT_GENERATOR_TIMEOUT};
use crate::interval::Rating;
use crate::model::{due_item_ids, Instance, Item, ItemFilter, Selection, SlotId};
use crate::random::{source_from_seed, BoxedRandom, RandomSource};
use crate::sampler::{sample_one, sample_pool};
use crate::selector::select_due;
use crate::session::Session;
use crate::share::SharedBoard;
use crate::traits::{QuestionPoolStore, SchedulingStore};

/// Slots on a standard board.
pub const DEFAULT_CAPACITY: usize = 6;

/// Configuration for the board assembler.
#[derive(Debug, Clone)]
pub struct BoardAssemblerConfig {
    /// Capacity used when the caller has no preference.
    pub default_capacity: usize,
    /// Hard limit on a single generator run.
    pub generator_timeout: Duration,
    /// Fixed seed for reproducible boards.
    pub seed: Option<u64>,
}

impl Default for BoardAssemblerConfig {
    fn default() -> Self {
        Self {
            default_capacity: DEFAULT_CAPACITY,
            generator_timeout: DEFAULT_GENERATOR_TIMEOUT,
            seed: None,
        }
    }
}

/// Collaborators shared by the assembler and every board it builds.
struct Context {
    scheduler: Arc<dyn SchedulingStore>,
    pool: Arc<dyn QuestionPoolStore>,
    generators: Arc<GeneratorRegistry>,
    generator_timeout: Duration,
}

impl Context {
    /// Produce a fresh instance for `item`, drawing its seed from `rng`.
    async fn generate(&self, item: &Item, rng: &mut dyn RandomSource) -> Instance {
        let seed = rng.next_u64();
        instantiate_with_timeout(
            Arc::clone(&self.generators),
            item.generator.clone(),
            seed,
            self.generator_timeout,
        )
        .await
    }
}

/// Builds boards from the scheduling store and question pool.
pub struct BoardAssembler {
    ctx: Arc<Context>,
    config: BoardAssemblerConfig,
}

impl BoardAssembler {
    pub fn new(
        scheduler: Arc<dyn SchedulingStore>,
        pool: Arc<dyn QuestionPoolStore>,
        generators: Arc<GeneratorRegistry>,
        config: BoardAssemblerConfig,
    ) -> Self {
        Self {
            ctx: Arc::new(Context {
                scheduler,
                pool,
                generators,
                generator_timeout: config.generator_timeout,
            }),
            config,
        }
    }

    pub fn config(&self) -> &BoardAssemblerConfig {
        &self.config
    }

    fn rng(&self) -> BoxedRandom {
        source_from_seed(self.config.seed)
    }

    /// Build a board for `group_id`: due items first, topped up with fresh
    /// items from `filter`, shuffled and cut to `capacity`.
    ///
    /// Never fails. Upstream errors shrink the board instead.
    pub async fn build_board(&self, group_id: &str, filter: &ItemFilter, capacity: usize) -> LiveBoard {
        self.build_board_with_rng(group_id, filter, capacity, self.rng())
            .await
    }

    /// [`Self::build_board`] with an explicit random source.
    pub async fn build_board_with_rng(
        &self,
        group_id: &str,
        filter: &ItemFilter,
        capacity: usize,
        mut rng: BoxedRandom,
    ) -> LiveBoard {
        let due = select_due(self.ctx.scheduler.as_ref(), group_id, Some(capacity)).await;
        let remaining = capacity.saturating_sub(due.len());
        let exclude = due_item_ids(&due);
        let fresh = sample_pool(self.ctx.pool.as_ref(), filter, remaining, &exclude, rng.as_mut()).await;

        tracing::debug!(
            group = group_id,
            due = due.len(),
            fresh = fresh.len(),
            capacity,
            "assembling board"
        );

        let mut entries: Vec<(SlotSource, Instance)> = Vec::with_capacity(due.len() + fresh.len());
        for record in due {
            let mut instance = Instance::new(record.question.clone(), record.answer.clone());
            instance.image = record.image.clone();
            entries.push((SlotSource::Review(record), instance));
        }
        for item in fresh {
            let instance = self.ctx.generate(&item, rng.as_mut()).await;
            entries.push((SlotSource::Generated(item), instance));
        }

        entries.shuffle(rng.as_mut());
        entries.truncate(capacity);

        let mut board = Board::new(group_id, capacity);
        for (source, instance) in entries {
            board.push(source, instance);
        }
        if board.len() < capacity {
            tracing::warn!(
                group = group_id,
                slots = board.len(),
                capacity,
                "not enough questions to fill the board"
            );
        }
        self.activate(board, rng)
    }

    /// Build a board with one random item per row. Rows with no matching
    /// item are skipped.
    pub async fn build_from_selections(&self, group_id: &str, selections: &[Selection]) -> LiveBoard {
        let mut rng = self.rng();
        let mut board = Board::new(group_id, selections.len());

        for selection in selections {
            let filter =
                ItemFilter::topics([selection.topic.as_str()]).with_difficulty(selection.difficulty);
            match sample_one(self.ctx.pool.as_ref(), &filter, rng.as_mut()).await {
                Ok(Some(item)) => {
                    let instance = self.ctx.generate(&item, rng.as_mut()).await;
                    board.push(SlotSource::Generated(item), instance);
                }
                Ok(None) => tracing::warn!(
                    topic = %selection.topic,
                    difficulty = %selection.difficulty,
                    "no question matches selection, skipping row"
                ),
                Err(e) => tracing::warn!(
                    topic = %selection.topic,
                    "question pool unavailable, skipping row: {e:#}"
                ),
            }
        }
        self.activate(board, rng)
    }

    /// Put a shared board back up with its saved text.
    pub fn load_shared(&self, group_id: &str, shared: &SharedBoard) -> LiveBoard {
        let mut board = Board::new(group_id, shared.len());
        for q in &shared.questions {
            let mut instance = Instance::new(q.question.clone(), q.answer.clone());
            instance.image = q.image.clone();
            board.push(SlotSource::Generated(q.item.clone()), instance);
        }
        self.activate(board, self.rng())
    }

    /// Reattach a previously built board, e.g. one saved to disk between
    /// commands.
    pub fn resume(&self, board: Board) -> LiveBoard {
        LiveBoard {
            board,
            ctx: Arc::clone(&self.ctx),
            rng: self.rng(),
            pending: None,
        }
    }

    fn activate(&self, mut board: Board, rng: BoxedRandom) -> LiveBoard {
        board.state = BoardState::Active;
        tracing::info!(group = %board.group_id, slots = board.len(), "board ready");
        LiveBoard {
            board,
            ctx: Arc::clone(&self.ctx),
            rng,
            pending: None,
        }
    }
}

/// Result of retargeting or swapping a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetargetOutcome {
    /// The slot now shows a new item.
    Replaced { item_id: String },
    /// Nothing suitable was found; the slot is untouched.
    Unchanged { warning: String },
}

impl RetargetOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, RetargetOutcome::Replaced { .. })
    }
}

/// A board in use during a lesson.
pub struct LiveBoard {
    board: Board,
    ctx: Arc<Context>,
    rng: BoxedRandom,
    pending: Option<Session>,
}

impl std::fmt::Debug for LiveBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBoard")
            .field("board", &self.board)
            .field("pending", &self.pending.as_ref().map(|s| s.id))
            .finish()
    }
}

impl LiveBoard {
    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    pub fn state(&self) -> BoardState {
        self.board.state
    }

    pub fn slot(&self, id: SlotId) -> Result<&BoardSlot, BoardError> {
        self.board.slot(id).ok_or(BoardError::UnknownSlot(id))
    }

    /// The session awaiting a successful write, if a completion failed.
    pub fn pending_session(&self) -> Option<&Session> {
        self.pending.as_ref()
    }

    fn ensure_open(&self) -> Result<(), BoardError> {
        if self.board.state == BoardState::Complete {
            return Err(BoardError::SessionClosed);
        }
        Ok(())
    }

    /// Grading once any slot is rated, otherwise active.
    fn sync_state(&mut self) {
        if self.board.state == BoardState::Complete {
            return;
        }
        self.board.state = if self.board.slots().any(|s| s.rating.is_some()) {
            BoardState::Grading
        } else {
            BoardState::Active
        };
    }

    fn generated_item(&self, id: SlotId) -> Result<Item, BoardError> {
        match &self.slot(id)?.source {
            SlotSource::Generated(item) => Ok(item.clone()),
            SlotSource::Review(_) => Err(BoardError::ReviewSlotImmutable(id)),
        }
    }

    /// Toggle the answer on a slot. Returns the new reveal flag.
    pub fn reveal(&mut self, id: SlotId) -> Result<bool, BoardError> {
        self.ensure_open()?;
        let slot = self.board.slot_mut(id)?;
        slot.revealed = !slot.revealed;
        Ok(slot.revealed)
    }

    /// Show or hide every answer.
    pub fn reveal_all(&mut self, revealed: bool) -> Result<(), BoardError> {
        self.ensure_open()?;
        for slot in self.board.slots_mut() {
            slot.revealed = revealed;
        }
        Ok(())
    }

    /// Record how well the group did on a slot.
    pub fn rate(&mut self, id: SlotId, score: u32) -> Result<GradingStatus, BoardError> {
        self.ensure_open()?;
        let rating = Rating::try_from(score)?;
        self.board.slot_mut(id)?.rating = Some(rating);
        self.sync_state();
        Ok(self.board.grading_status())
    }

    pub fn grading_status(&self) -> GradingStatus {
        self.board.grading_status()
    }

    pub fn is_fully_rated(&self) -> bool {
        self.board.grading_status().is_complete()
    }

    /// Clear every rating.
    pub fn reset_ratings(&mut self) -> Result<(), BoardError> {
        self.ensure_open()?;
        for slot in self.board.slots_mut() {
            slot.rating = None;
        }
        self.sync_state();
        Ok(())
    }

    /// New instance of the same item.
    pub async fn regenerate(&mut self, id: SlotId) -> Result<(), BoardError> {
        self.ensure_open()?;
        let item = self.generated_item(id)?;
        let instance = self.ctx.generate(&item, self.rng.as_mut()).await;
        self.board.slot_mut(id)?.set_content(instance);
        self.sync_state();
        Ok(())
    }

    /// Swap the slot's item for one of the same skill (or topic) at
    /// `difficulty`.
    pub async fn retarget(
        &mut self,
        id: SlotId,
        difficulty: Difficulty,
    ) -> Result<RetargetOutcome, BoardError> {
        self.ensure_open()?;
        let item = self.generated_item(id)?;
        let filter = ItemFilter::retarget_scope(&item.topic, item.skill.as_deref(), difficulty);
        let scope = item.skill.as_deref().unwrap_or(&item.topic).to_string();
        let none_found = format!("no {} questions found for {scope}", difficulty.info().name);
        self.replace(id, &filter, none_found).await
    }

    /// Swap the slot's item for any item in the pool.
    pub async fn swap(&mut self, id: SlotId) -> Result<RetargetOutcome, BoardError> {
        self.ensure_open()?;
        self.generated_item(id)?;
        self.replace(id, &ItemFilter::default(), "question pool is empty".to_string())
            .await
    }

    async fn replace(
        &mut self,
        id: SlotId,
        filter: &ItemFilter,
        none_found: String,
    ) -> Result<RetargetOutcome, BoardError> {
        let picked = sample_one(self.ctx.pool.as_ref(), filter, self.rng.as_mut()).await;
        let item = match picked {
            Ok(Some(item)) => item,
            Ok(None) => {
                tracing::warn!(slot = %id, "{none_found}");
                return Ok(RetargetOutcome::Unchanged { warning: none_found });
            }
            Err(e) => {
                let warning = format!("question pool unavailable: {e:#}");
                tracing::warn!(slot = %id, "{warning}");
                return Ok(RetargetOutcome::Unchanged { warning });
            }
        };

        let instance = self.ctx.generate(&item, self.rng.as_mut()).await;
        let item_id = item.id.clone();
        let slot = self.board.slot_mut(id)?;
        slot.difficulty = item.difficulty;
        slot.source = SlotSource::Generated(item);
        slot.set_content(instance);
        self.sync_state();
        Ok(RetargetOutcome::Replaced { item_id })
    }

    /// Snapshot the current questions for sharing.
    pub fn share(&self, name: impl Into<String>) -> SharedBoard {
        SharedBoard::from_board(&self.board, name)
    }

    /// Build the session and record it with the scheduling store.
    ///
    /// On failure the session is kept and a later call resends it under the
    /// same id, picking up any rating changes made in between.
    pub async fn complete_session(&mut self) -> Result<Session, BoardError> {
        self.ensure_open()?;

        let mut session = Session::from_board(&self.board);
        if let Some(pending) = self.board.pending_session {
            session.id = pending.id;
            session.created_at = pending.created_at;
        }
        self.board.pending_session = Some(PendingSession {
            id: session.id,
            created_at: session.created_at,
        });
        self.pending = Some(session.clone());

        match self.ctx.scheduler.record_session(&session).await {
            Ok(()) => {
                self.board.state = BoardState::Complete;
                self.board.pending_session = None;
                self.pending = None;
                tracing::info!(
                    session = %session.id,
                    group = %session.group_id,
                    results = session.results.len(),
                    "session recorded"
                );
                Ok(session)
            }
            Err(e) => {
                let retryable = e
                    .downcast_ref::<StoreError>()
                    .map_or(true, StoreError::is_transient);
                tracing::warn!(session = %session.id, retryable, "failed to record session: {e:#}");
                Err(BoardError::Persistence {
                    retryable,
                    source: e,
                })
            }
        }
    }
}
