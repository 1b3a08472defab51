//! Moderation for the Tactica puzzle catalog: reports, blocks and FEN
//! corrections.
//!
//! The durable [`MutationStore`](tactica_core::store::MutationStore) is the
//! system of record. The [`Coordinator`] replays it into the catalog's mirror
//! tables on startup and keeps the [`BlockedCache`](tactica_core::BlockedCache)
//! that the sampling engine reads.

mod coordinator;
mod keylock;

pub mod error;
pub mod view;

pub use coordinator::{Coordinator, CoordinatorState, ReconcileReport};
pub use error::{Error, Result};
pub use view::{ActionResult, ReportListing, ReportPage};
