//! Error types.
//!
//! [`StoreError`] lives in core, not next to the adapters, so the board
//! engine can downcast an `anyhow::Error` from any store and decide whether
//! a failed session write is worth retrying.

use thiserror::Error;

use crate::model::SlotId;

/// Errors raised by scheduling, question-pool and share stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing service could not be reached at all.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The service answered with an error status.
    #[error("store API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred mid-request.
    #[error("network error: {0}")]
    Network(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The store returned data we could not decode.
    #[error("malformed store data: {0}")]
    Malformed(String),
}

impl StoreError {
    /// Returns `true` if repeating the same call could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) | StoreError::Timeout(_) | StoreError::Network(_) => true,
            StoreError::Api { status, .. } => *status == 429 || *status >= 500,
            StoreError::AuthenticationFailed(_)
            | StoreError::NotFound(_)
            | StoreError::Malformed(_) => false,
        }
    }
}

/// Errors returned by board operations.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("no slot with id {0}")]
    UnknownSlot(SlotId),

    /// Review slots carry the text the group actually saw and never change.
    #[error("slot {0} is a review slot and cannot be changed")]
    ReviewSlotImmutable(SlotId),

    #[error("invalid rating {0}: expected one of 0, 25, 75, 100")]
    InvalidRating(u32),

    #[error("session already completed")]
    SessionClosed,

    /// The session record could not be written. The board keeps the
    /// pending session so the caller can retry.
    #[error("failed to record session (retryable: {retryable}): {source:#}")]
    Persistence {
        retryable: bool,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors raised while producing a question instance.
///
/// These never leave the generator registry; they are logged and replaced
/// with a placeholder instance.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("unknown generator strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid generator params: {0}")]
    InvalidParams(String),

    #[error("expression error: {0}")]
    Eval(#[from] ExprError),

    #[error("generator produced an empty question")]
    EmptyQuestion,
}

/// Errors from the template expression evaluator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    Arity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("unclosed placeholder in template")]
    UnclosedPlaceholder,

    #[error("expression nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("{what} is longer than {limit} characters")]
    TooLong { what: &'static str, limit: usize },
}
