//! Error types for `tactica-core`.

use thiserror::Error;

/// Input rejected before anything is written to either store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("puzzle id must not be empty")]
  EmptyPuzzleId,

  #[error("puzzle id is longer than {max} characters")]
  PuzzleIdTooLong { max: usize },

  #[error("puzzle id {0:?} may only contain ASCII letters and digits")]
  InvalidPuzzleId(String),

  #[error("unknown report reason: {0:?}")]
  UnknownReason(String),

  #[error("FEN must not be empty")]
  EmptyFen,

  #[error("FEN is longer than {max} characters")]
  FenTooLong { max: usize },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("validation error: {0}")]
  Validation(#[from] ValidationError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
