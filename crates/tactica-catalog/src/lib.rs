//! The puzzle catalog: an in-memory SQLite copy of the read-only snapshot,
//! a theme index over it, and the sampling query engine.
//!
//! The catalog is rebuilt from the snapshot on every start. Moderation state
//! is mirrored into it (see [`mirror`]) so that queries can join against it,
//! but the catalog is never the system of record for that state.

mod catalog;
mod index;
mod sample;

pub mod engine;
pub mod error;
pub mod mirror;

pub use catalog::{CatalogStore, LoadProgress, ProgressFn};
pub use engine::{PuzzleEngine, PuzzleFilter};
pub use error::{Error, LoadError, Result};
pub use index::{Bounds, ThemeIndex};
pub use sample::{sample_without_replacement, shuffle};
