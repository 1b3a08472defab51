//! Core types and trait definitions for the Tactica puzzle catalog.
//!
//! This crate is deliberately free of database dependencies. The catalog,
//! the durable store and the moderation coordinator all depend on it.

pub mod cache;
pub mod error;
pub mod modification;
pub mod puzzle;
pub mod report;
pub mod store;
pub mod validate;

pub use cache::BlockedCache;
pub use error::{Error, Result, ValidationError};
