//! [`PuzzleEngine`]: filtered random sampling over the catalog.

use std::{
  path::Path,
  sync::{Arc, PoisonError, RwLock},
  time::Instant,
};

use serde::{Deserialize, Serialize};
use tactica_core::{
  BlockedCache,
  puzzle::{Puzzle, ThemeCount},
};

use crate::{
  CatalogStore, Error, LoadError, ProgressFn, Result,
  index::{Bounds, ThemeIndex},
  sample::{sample_without_replacement, shuffle},
};

pub const DEFAULT_LIMIT: usize = 10;

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Parameters for [`PuzzleEngine::query_puzzles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleFilter {
  /// Any of these themes matches. Empty means no theme restriction.
  pub themes:          Vec<String>,
  pub min_rating:      Option<i64>,
  pub max_rating:      Option<i64>,
  pub min_popularity:  Option<i64>,
  pub limit:           usize,
  pub exclude_blocked: bool,
}

impl Default for PuzzleFilter {
  fn default() -> Self {
    Self {
      themes:          Vec::new(),
      min_rating:      None,
      max_rating:      None,
      min_popularity:  None,
      limit:           DEFAULT_LIMIT,
      exclude_blocked: true,
    }
  }
}

impl PuzzleFilter {
  pub fn bounds(&self) -> Bounds {
    Bounds {
      min_rating:     self.min_rating,
      max_rating:     self.max_rating,
      min_popularity: self.min_popularity,
    }
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The sampling query engine: a [`CatalogStore`] plus its [`ThemeIndex`].
pub struct PuzzleEngine {
  catalog: CatalogStore,
  index:   RwLock<Option<Arc<ThemeIndex>>>,
}

impl PuzzleEngine {
  /// An engine with an empty catalog; call [`load`](Self::load) next.
  pub async fn new() -> Result<Self> {
    Ok(Self { catalog: CatalogStore::new().await?, index: RwLock::new(None) })
  }

  /// The underlying catalog. The moderation coordinator writes its mirror
  /// tables through this handle.
  pub fn catalog(&self) -> &CatalogStore { &self.catalog }

  /// Load the snapshot and build the theme index.
  pub async fn load(
    &self,
    path: impl AsRef<Path>,
    on_progress: Option<ProgressFn>,
  ) -> Result<()> {
    let path = path.as_ref();
    let started = Instant::now();
    self.set_index(None);

    self.catalog.load(path, on_progress).await?;
    // A row the index cannot read (a NULL rating, say) means a corrupt
    // snapshot rather than a runtime database failure.
    let index = ThemeIndex::build(&self.catalog).await.map_err(|e| match e {
      Error::Database(e) => Error::from(LoadError::Malformed {
        path:   path.to_path_buf(),
        reason: e.to_string(),
      }),
      other => other,
    })?;

    tracing::info!(
      path = %path.display(),
      puzzles = index.len(),
      themes = index.themes().len(),
      elapsed_ms = started.elapsed().as_millis() as u64,
      "puzzle catalog loaded"
    );
    self.set_index(Some(Arc::new(index)));
    Ok(())
  }

  pub fn is_loaded(&self) -> bool {
    self.catalog.is_ready() && self.current_index().is_some()
  }

  /// Total puzzles in the catalog, or 0 if nothing is loaded.
  pub async fn total_count(&self) -> u64 {
    if !self.is_loaded() {
      return 0;
    }
    self.catalog.puzzle_count().await.unwrap_or_else(|e| {
      tracing::warn!(error = %e, "counting puzzles failed");
      0
    })
  }

  pub fn themes(&self) -> Result<Vec<ThemeCount>> {
    Ok(self.loaded_index()?.themes())
  }

  /// Sample up to `filter.limit` puzzles matching `filter`, in random order.
  ///
  /// `blocked` is consulted only when `filter.exclude_blocked` is set;
  /// passing `None` there means nothing is excluded.
  pub async fn query_puzzles(
    &self,
    filter: &PuzzleFilter,
    blocked: Option<&BlockedCache>,
  ) -> Result<Vec<Puzzle>> {
    let index = self.loaded_index()?;
    let bounds = filter.bounds();
    let blocked = blocked.filter(|_| filter.exclude_blocked);

    let (candidate_count, sampled) = if filter.themes.is_empty() {
      let ids = self.catalog.scan_ids(&bounds).await?;
      pick(ids, filter.limit, blocked)
    } else {
      let ids = index.union(&filter.themes, &bounds);
      let (count, picked) = pick(ids, filter.limit, blocked);
      (count, picked.into_iter().map(str::to_owned).collect())
    };

    if sampled.is_empty() {
      tracing::debug!(?filter, candidate_count, "no puzzles matched");
      return Ok(Vec::new());
    }

    let mut puzzles = self.catalog.fetch_puzzles(&sampled).await?;
    shuffle(&mut puzzles, &mut rand::thread_rng());

    tracing::debug!(
      themes = ?filter.themes,
      candidate_count,
      returned = puzzles.len(),
      "sampled puzzles"
    );
    Ok(puzzles)
  }

  fn current_index(&self) -> Option<Arc<ThemeIndex>> {
    self.index.read().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn loaded_index(&self) -> Result<Arc<ThemeIndex>> {
    match self.current_index() {
      Some(index) if self.catalog.is_ready() => Ok(index),
      _ => Err(Error::NotLoaded),
    }
  }

  fn set_index(&self, index: Option<Arc<ThemeIndex>>) {
    *self.index.write().unwrap_or_else(PoisonError::into_inner) = index;
  }
}

/// Drop blocked ids, then sample. Returns the candidate count after
/// exclusion alongside the sample.
fn pick<T>(mut ids: Vec<T>, limit: usize, blocked: Option<&BlockedCache>) -> (usize, Vec<T>)
where
  T: AsRef<str> + Clone,
{
  if let Some(blocked) = blocked {
    blocked.retain_unblocked(&mut ids);
  }
  let sampled = sample_without_replacement(&ids, limit, &mut rand::thread_rng());
  (ids.len(), sampled)
}
