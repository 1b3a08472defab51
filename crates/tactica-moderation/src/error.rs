//! Error type for `tactica-moderation`.

use tactica_core::ValidationError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid input: {0}")]
  Validation(#[from] ValidationError),

  #[error("report {0} not found")]
  NotFound(i64),

  /// The durable store could not be opened, so there is nothing to write to.
  #[error("mutation store is unavailable")]
  Unavailable,

  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("catalog error: {0}")]
  Catalog(#[from] tactica_catalog::Error),
}

impl Error {
  pub(crate) fn storage<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
