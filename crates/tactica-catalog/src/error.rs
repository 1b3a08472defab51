//! Error types for `tactica-catalog`.

use std::path::PathBuf;

use thiserror::Error;

/// The snapshot could not be turned into a usable catalog.
#[derive(Debug, Error)]
pub enum LoadError {
  #[error("snapshot not found: {0}")]
  Missing(PathBuf),

  #[error("snapshot {path} is not a puzzle catalog: {reason}")]
  Malformed { path: PathBuf, reason: String },
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("load error: {0}")]
  Load(#[from] LoadError),

  /// A query arrived before a snapshot was loaded.
  #[error("puzzle catalog is not loaded")]
  NotLoaded,

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
