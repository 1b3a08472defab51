//! The `MutationStore` trait and its opener.
//!
//! The trait is implemented by durable backends (e.g. `tactica-store-sqlite`).
//! The moderation coordinator depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  modification::{Modification, ModificationPatch},
  report::{NewReport, Report, ReportPatch, ReportQuery},
};

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Counts derived directly from the system of record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStats {
  pub total_reports:     u64,
  pub pending_reports:   u64,
  pub dismissed_reports: u64,
  pub blocked_puzzles:   u64,
  pub modified_puzzles:  u64,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Durable, session-surviving store for reports and modifications.
///
/// Reports are append-only apart from their `dismissed` flag. Modifications
/// are keyed by puzzle id: [`save_modification`](Self::save_modification)
/// replaces the whole record, [`patch_modification`](Self::patch_modification)
/// merges atomically.
pub trait MutationStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reports ───────────────────────────────────────────────────────────

  /// Persist a report and return its id. Assigns `id` and `reported_at`
  /// when the input leaves them empty; `dismissed` always starts `false`.
  fn save_report(
    &self,
    input: NewReport,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  fn get_report(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Reports ordered by `reported_at`, newest first.
  fn get_reports<'a>(
    &'a self,
    query: &'a ReportQuery,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  fn count_reports(
    &self,
    include_dismissed: bool,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn get_reports_for_puzzle<'a>(
    &'a self,
    puzzle_id: &'a str,
  ) -> impl Future<Output = Result<Vec<Report>, Self::Error>> + Send + 'a;

  /// Read-merge-write. Returns `None` if no report has this id.
  fn update_report(
    &self,
    id: i64,
    patch: ReportPatch,
  ) -> impl Future<Output = Result<Option<Report>, Self::Error>> + Send + '_;

  /// Removes the report if present; absent ids are not an error.
  fn delete_report(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Modifications ─────────────────────────────────────────────────────

  /// Overwrite the whole record for `modification.puzzle_id`.
  fn save_modification(
    &self,
    modification: Modification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Merge `patch` into the current record (or a blank one) in a single
  /// transaction and return the stored result.
  fn patch_modification<'a>(
    &'a self,
    puzzle_id: &'a str,
    patch: ModificationPatch,
  ) -> impl Future<Output = Result<Modification, Self::Error>> + Send + 'a;

  fn get_modification<'a>(
    &'a self,
    puzzle_id: &'a str,
  ) -> impl Future<Output = Result<Option<Modification>, Self::Error>> + Send + 'a;

  fn get_all_modifications(
    &self,
  ) -> impl Future<Output = Result<Vec<Modification>, Self::Error>> + Send + '_;

  fn get_blocked_puzzle_ids(
    &self,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  fn delete_modification<'a>(
    &'a self,
    puzzle_id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Maintenance ───────────────────────────────────────────────────────

  fn stats(&self)
  -> impl Future<Output = Result<MutationStats, Self::Error>> + Send + '_;

  /// Empty both collections in one transaction.
  fn clear_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Opens a [`MutationStore`] on demand.
///
/// The coordinator opens its store lazily and retries after a failed open, so
/// it holds an opener rather than a store.
pub trait StoreOpener: Send + Sync {
  type Store: MutationStore + Clone + 'static;

  fn open(
    &self,
  ) -> impl Future<
    Output = Result<Self::Store, <Self::Store as MutationStore>::Error>,
  > + Send
  + '_;
}
