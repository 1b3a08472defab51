//! [`Coordinator`]: keeps the durable store, the catalog mirror and the
//! blocked cache in step.
//!
//! Every write goes to the durable store first. The catalog mirror is then
//! updated on a best-effort basis and the blocked cache last, so a failed
//! mirror write never loses a mutation; the next [`Coordinator::initialize`]
//! after a restart replays it.
//!
//! Reloading the catalog empties its mirror tables. The coordinator notices
//! through [`CatalogStore::generation`] and replays the durable state on the
//! next `initialize` or store-backed operation.

use std::{
  sync::{
    PoisonError, RwLock,
    atomic::{AtomicU64, Ordering},
  },
  time::Instant,
};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use tactica_catalog::CatalogStore;
use tactica_core::{
  BlockedCache,
  modification::{Modification, ModificationPatch},
  puzzle::PuzzleInfo,
  report::{NewReport, Report, ReportPatch, ReportQuery},
  store::{MutationStats, MutationStore, StoreOpener},
  validate::{normalize_notes, parse_reason, validate_fen, validate_puzzle_id},
};
use tokio::sync::{Mutex, OnceCell};

use crate::{
  Error, Result,
  keylock::KeyLocks,
  view::{ReportListing, ReportPage},
};

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
  Uninitialized,
  Initializing,
  Ready,
  /// The durable store could not be read. Queries still work with an empty
  /// blocked cache; mutations fail until a later `initialize` succeeds.
  Degraded,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
  /// Durable reports copied into the mirror because their id was absent.
  pub reports_replayed:       usize,
  pub modifications_replayed: usize,
  /// Size of the blocked cache afterwards.
  pub blocked:                usize,
  /// Mirror writes that failed and were skipped.
  pub mirror_failures:        usize,
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

pub struct Coordinator<O: StoreOpener> {
  catalog:   CatalogStore,
  opener:    O,
  store:     OnceCell<O::Store>,
  blocked:   BlockedCache,
  state:     RwLock<CoordinatorState>,
  init_lock: Mutex<()>,
  key_locks: KeyLocks,
  /// Catalog generation the mirror was last replayed into; 0 for never.
  mirrored:  AtomicU64,
}

impl<O: StoreOpener> Coordinator<O> {
  /// A coordinator over `catalog` that opens its durable store through
  /// `opener` on the first [`initialize`](Self::initialize).
  pub fn new(catalog: CatalogStore, opener: O) -> Self {
    Self {
      catalog,
      opener,
      store: OnceCell::new(),
      blocked: BlockedCache::new(),
      state: RwLock::new(CoordinatorState::Uninitialized),
      init_lock: Mutex::new(()),
      key_locks: KeyLocks::default(),
      mirrored: AtomicU64::new(0),
    }
  }

  pub fn state(&self) -> CoordinatorState {
    *self.state.read().unwrap_or_else(PoisonError::into_inner)
  }

  /// A handle onto the blocked-id set; pass it to
  /// [`PuzzleEngine::query_puzzles`](tactica_catalog::PuzzleEngine::query_puzzles).
  pub fn blocked_cache(&self) -> BlockedCache { self.blocked.clone() }

  pub fn catalog(&self) -> &CatalogStore { &self.catalog }

  /// Cache lookup only; never touches either store.
  pub fn is_blocked(&self, puzzle_id: &str) -> bool { self.blocked.contains(puzzle_id) }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  /// Open the durable store, replay it into the catalog mirror and rebuild
  /// the blocked cache.
  ///
  /// Once `Ready`, only replays the mirror, and only if the catalog was
  /// (re)loaded since the last replay. Concurrent callers wait for the first
  /// one. On failure the coordinator is left `Degraded` with an empty cache
  /// and a later call tries again.
  pub async fn initialize(&self) -> Result<ReconcileReport> {
    let _guard = self.init_lock.lock().await;
    if self.state() == CoordinatorState::Ready {
      let mut report = ReconcileReport::default();
      if let Some(store) = self.store.get()
        && self.mirror_is_stale()
      {
        self.sync_mirror(store, &mut report).await;
        tracing::info!(
          generation = self.catalog.generation(),
          reports_replayed = report.reports_replayed,
          modifications_replayed = report.modifications_replayed,
          "mirror replayed into reloaded catalog"
        );
      }
      report.blocked = self.blocked.len();
      return Ok(report);
    }

    self.set_state(CoordinatorState::Initializing);
    let started = Instant::now();

    match self.reconcile().await {
      Ok(report) => {
        self.set_state(CoordinatorState::Ready);
        tracing::info!(
          reports_replayed = report.reports_replayed,
          modifications_replayed = report.modifications_replayed,
          blocked = report.blocked,
          mirror_failures = report.mirror_failures,
          elapsed_ms = started.elapsed().as_millis() as u64,
          "moderation state reconciled"
        );
        Ok(report)
      }
      Err(e) => {
        self.blocked.clear();
        self.set_state(CoordinatorState::Degraded);
        tracing::warn!(error = %e, "mutation store unavailable; continuing degraded");
        Err(e)
      }
    }
  }

  async fn reconcile(&self) -> Result<ReconcileReport> {
    let store = self
      .store
      .get_or_try_init(|| async { self.opener.open().await.map_err(Error::storage) })
      .await?;
    let blocked = store.get_blocked_puzzle_ids().await.map_err(Error::storage)?;

    let mut report = ReconcileReport::default();
    self.sync_mirror(store, &mut report).await;

    self.blocked.replace(blocked);
    report.blocked = self.blocked.len();
    Ok(report)
  }

  /// Replay into the current catalog load and remember its generation. A
  /// catalog that is not loaded yet is left for a later call.
  async fn sync_mirror(&self, store: &O::Store, report: &mut ReconcileReport) {
    let generation = self.catalog.generation();
    if !self.catalog.is_ready() {
      tracing::debug!("catalog not loaded; mirror replay deferred");
      return;
    }
    match self.replay_mirror(store, report).await {
      Ok(()) => self.mirrored.store(generation, Ordering::Release),
      Err(e) => {
        report.mirror_failures += 1;
        tracing::warn!(error = %e, "mirror replay aborted");
      }
    }
  }

  fn mirror_is_stale(&self) -> bool {
    self.catalog.is_ready()
      && self.catalog.generation() != self.mirrored.load(Ordering::Acquire)
  }

  /// Copy durable records into the catalog mirror. Reports already mirrored
  /// (by id) are left alone; modifications are upserted.
  async fn replay_mirror(&self, store: &O::Store, report: &mut ReconcileReport) -> Result<()> {
    self.catalog.ensure_mirror_tables().await?;
    let mirrored = self.catalog.mirror_report_ids().await?;

    let query = ReportQuery { include_dismissed: true, ..Default::default() };
    let reports = store.get_reports(&query).await.map_err(Error::storage)?;
    for r in reports.iter().filter(|r| !mirrored.contains(&r.id)) {
      match self.catalog.mirror_report(r).await {
        Ok(()) => report.reports_replayed += 1,
        Err(e) => {
          report.mirror_failures += 1;
          tracing::warn!(report_id = r.id, error = %e, "failed to mirror report");
        }
      }
    }

    let modifications = store.get_all_modifications().await.map_err(Error::storage)?;
    for m in &modifications {
      match self.catalog.mirror_modification(m).await {
        Ok(()) => report.modifications_replayed += 1,
        Err(e) => {
          report.mirror_failures += 1;
          tracing::warn!(puzzle_id = %m.puzzle_id, error = %e, "failed to mirror modification");
        }
      }
    }
    Ok(())
  }

  /// Reload the cache from the durable blocked set. Returns its new size.
  pub async fn rebuild_blocked_cache(&self) -> Result<usize> {
    let store = self.ready_store().await?;
    let ids = store.get_blocked_puzzle_ids().await.map_err(Error::storage)?;
    self.blocked.replace(ids);
    Ok(self.blocked.len())
  }

  /// Delete every report and modification, then empty the mirror and cache.
  pub async fn clear_all(&self) -> Result<()> {
    let store = self.ready_store().await?;
    store.clear_all().await.map_err(Error::storage)?;
    if let Err(e) = self.catalog.clear_mirror().await {
      tracing::warn!(error = %e, "failed to clear mirror tables");
    }
    self.blocked.clear();
    tracing::info!("moderation state cleared");
    Ok(())
  }

  // ── Reports ───────────────────────────────────────────────────────────────

  /// File a report against `puzzle_id`. `reason` is the snake_case wire
  /// form; `notes` are trimmed and truncated.
  pub async fn report_puzzle(
    &self,
    puzzle_id: &str,
    reason: &str,
    notes: Option<&str>,
  ) -> Result<i64> {
    validate_puzzle_id(puzzle_id)?;
    let reason = parse_reason(reason)?;
    let notes = notes.map(normalize_notes).unwrap_or_default();
    let store = self.ready_store().await?;

    let mut input = NewReport::new(puzzle_id, reason).with_notes(notes);
    let reported_at = Utc::now();
    input.reported_at = Some(reported_at);
    let id = store.save_report(input.clone()).await.map_err(Error::storage)?;

    let report = Report {
      id,
      puzzle_id: input.puzzle_id,
      reason,
      notes: input.notes,
      dismissed: false,
      reported_at,
    };
    self.mirror("report", self.catalog.mirror_report(&report).await);
    tracing::debug!(report_id = id, puzzle_id, %reason, "puzzle reported");
    Ok(id)
  }

  pub async fn get_reports(&self, listing: ReportListing) -> Result<ReportPage> {
    let listing = listing.normalized();
    let store = self.ready_store().await?;

    let total = store
      .count_reports(listing.include_dismissed)
      .await
      .map_err(Error::storage)?;
    let query = ReportQuery {
      include_dismissed: listing.include_dismissed,
      limit:             Some(listing.page_size),
      offset:            Some(listing.offset()),
    };
    let reports = store.get_reports(&query).await.map_err(Error::storage)?;
    let has_more = ((listing.offset() + reports.len()) as u64) < total;

    Ok(ReportPage {
      reports,
      total,
      page: listing.page,
      page_size: listing.page_size,
      has_more,
    })
  }

  pub async fn get_reports_for_puzzle(&self, puzzle_id: &str) -> Result<Vec<Report>> {
    validate_puzzle_id(puzzle_id)?;
    let store = self.ready_store().await?;
    store.get_reports_for_puzzle(puzzle_id).await.map_err(Error::storage)
  }

  pub async fn dismiss_report(&self, id: i64) -> Result<Report> {
    let store = self.ready_store().await?;
    let report = store
      .update_report(id, ReportPatch::dismiss())
      .await
      .map_err(Error::storage)?
      .ok_or(Error::NotFound(id))?;

    self.mirror("report", self.catalog.mirror_report(&report).await);
    tracing::debug!(report_id = id, "report dismissed");
    Ok(report)
  }

  /// Deleting an id that does not exist succeeds.
  pub async fn delete_report(&self, id: i64) -> Result<()> {
    let store = self.ready_store().await?;
    store.delete_report(id).await.map_err(Error::storage)?;
    self.mirror("report", self.catalog.unmirror_report(id).await);
    tracing::debug!(report_id = id, "report deleted");
    Ok(())
  }

  // ── Modifications ─────────────────────────────────────────────────────────

  pub async fn block_puzzle(&self, puzzle_id: &str) -> Result<Modification> {
    validate_puzzle_id(puzzle_id)?;
    self.patch(puzzle_id, ModificationPatch::blocked(true)).await
  }

  pub async fn unblock_puzzle(&self, puzzle_id: &str) -> Result<Modification> {
    validate_puzzle_id(puzzle_id)?;
    self.patch(puzzle_id, ModificationPatch::blocked(false)).await
  }

  /// Override the FEN served for `puzzle_id`. The blocked flag is kept.
  pub async fn update_puzzle_fen(&self, puzzle_id: &str, fen: &str) -> Result<Modification> {
    validate_puzzle_id(puzzle_id)?;
    let fen = validate_fen(fen)?;
    self.patch(puzzle_id, ModificationPatch::fen(fen)).await
  }

  /// Durable write, mirror, cache, all under the puzzle's key guard so the
  /// cache ends up matching whichever call finished last.
  async fn patch(&self, puzzle_id: &str, patch: ModificationPatch) -> Result<Modification> {
    let store = self.ready_store().await?;
    let _guard = self.key_locks.lock(puzzle_id).await;

    let modification = store
      .patch_modification(puzzle_id, patch)
      .await
      .map_err(Error::storage)?;
    self.mirror(
      "modification",
      self.catalog.mirror_modification(&modification).await,
    );

    if modification.blocked {
      self.blocked.insert(puzzle_id);
    } else {
      self.blocked.remove(puzzle_id);
    }
    tracing::debug!(
      puzzle_id,
      blocked = modification.blocked,
      fen_override = modification.modified_fen.is_some(),
      "modification saved"
    );
    Ok(modification)
  }

  pub async fn get_modification(&self, puzzle_id: &str) -> Result<Option<Modification>> {
    let store = self.ready_store().await?;
    store.get_modification(puzzle_id).await.map_err(Error::storage)
  }

  /// From the durable store, sorted.
  pub async fn get_blocked_puzzle_ids(&self) -> Result<Vec<String>> {
    let store = self.ready_store().await?;
    let mut ids = store.get_blocked_puzzle_ids().await.map_err(Error::storage)?;
    ids.sort();
    Ok(ids)
  }

  // ── Reads across both stores ──────────────────────────────────────────────

  /// The catalog row joined with its mirrored moderation state. `None` when
  /// the puzzle is unknown or the catalog cannot answer.
  pub async fn get_puzzle_info(&self, puzzle_id: &str) -> Option<PuzzleInfo> {
    match self.catalog.puzzle_info(puzzle_id).await {
      Ok(info) => info,
      Err(e) => {
        tracing::warn!(puzzle_id, error = %e, "puzzle info lookup failed");
        None
      }
    }
  }

  /// Counts from the durable store, not the mirror.
  pub async fn get_stats(&self) -> Result<MutationStats> {
    let store = self.ready_store().await?;
    store.stats().await.map_err(Error::storage)
  }

  /// The catalog database including its mirror tables, as SQLite file bytes.
  pub async fn export_database(&self) -> Result<Vec<u8>> {
    Ok(self.catalog.export().await?)
  }

  // ── Helpers ───────────────────────────────────────────────────────────────

  /// The durable store, initializing first if needed or if the catalog was
  /// reloaded since the mirror was last replayed.
  async fn ready_store(&self) -> Result<&O::Store> {
    if self.state() != CoordinatorState::Ready || self.mirror_is_stale() {
      self.initialize().await?;
    }
    self.store.get().ok_or(Error::Unavailable)
  }

  fn set_state(&self, state: CoordinatorState) {
    *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
  }

  fn mirror(&self, what: &str, outcome: tactica_catalog::Result<()>) {
    if let Err(e) = outcome {
      tracing::warn!(what, error = %e, "mirror write failed; durable store is ahead");
    }
  }
}
