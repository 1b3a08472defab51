//! SQLite backend for the Tactica durable mutation store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every call on one store is executed in
//! submission order, which is what makes `patch_modification` atomic.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::{SqliteMutationStore, SqliteOpener};

#[cfg(test)]
mod tests;
