//! [`CatalogStore`]: the snapshot restored into an in-memory SQLite engine.

use std::{
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
  },
};

use rusqlite::{
  DatabaseName, OptionalExtension as _,
  backup::Progress,
  types::{FromSql, Value},
};
use tactica_core::puzzle::{Puzzle, PuzzleInfo, split_field};

use crate::{Error, LoadError, Result, index::Bounds, mirror::MIRROR_SCHEMA};

/// SQLite caps the number of bound parameters per statement; stay well below.
const MAX_BOUND_IDS: usize = 500;

/// Columns read for every puzzle, joined with its override.
const PUZZLE_COLUMNS: &str = "p.id, p.fen, p.moves, p.rating, p.rating_deviation, \
   p.popularity, p.nb_plays, p.game_url, p.themes, m.modified_fen";

const PUZZLE_FROM: &str =
  "FROM puzzles p LEFT JOIN puzzle_modifications m ON m.puzzle_id = p.id";

// ─── Progress ────────────────────────────────────────────────────────────────

/// Page-level progress of a snapshot restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
  pub remaining_pages: u32,
  pub total_pages:     u32,
}

impl LoadProgress {
  /// Fraction complete in `[0, 1]`.
  pub fn fraction(&self) -> f64 {
    if self.total_pages == 0 {
      return 1.0;
    }
    1.0 - f64::from(self.remaining_pages) / f64::from(self.total_pages)
  }
}

impl From<Progress> for LoadProgress {
  fn from(p: Progress) -> Self {
    Self {
      remaining_pages: p.remaining.max(0) as u32,
      total_pages:     p.pagecount.max(0) as u32,
    }
  }
}

pub type ProgressFn = Box<dyn Fn(LoadProgress) + Send + 'static>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// The puzzle catalog held in memory for the lifetime of the process.
///
/// Cloning is cheap; the connection, the ready flag and the load generation
/// are shared.
#[derive(Clone)]
pub struct CatalogStore {
  conn:       tokio_rusqlite::Connection,
  ready:      Arc<AtomicBool>,
  generation: Arc<AtomicU64>,
}

impl CatalogStore {
  /// An empty, not-yet-loaded catalog.
  pub async fn new() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Ok(Self {
      conn,
      ready: Arc::new(AtomicBool::new(false)),
      generation: Arc::new(AtomicU64::new(0)),
    })
  }

  /// Create a catalog and load `path` into it.
  pub async fn open(
    path: impl AsRef<Path>,
    on_progress: Option<ProgressFn>,
  ) -> Result<Self> {
    let store = Self::new().await?;
    store.load(path, on_progress).await?;
    Ok(store)
  }

  /// Restore the snapshot at `path` into memory, replacing anything loaded
  /// before, and create the mirror tables.
  pub async fn load(
    &self,
    path: impl AsRef<Path>,
    on_progress: Option<ProgressFn>,
  ) -> Result<()> {
    let path = path.as_ref().to_path_buf();
    if !matches!(tokio::fs::try_exists(&path).await, Ok(true)) {
      return Err(LoadError::Missing(path).into());
    }

    self.ready.store(false, Ordering::Release);

    let src = path.clone();
    let outcome: Result<(), String> = self
      .conn
      .call(move |conn| {
        match restore_snapshot(conn, &src, on_progress) {
          Ok(true) => {}
          Ok(false) => return Ok(Err("missing `puzzles` table".to_owned())),
          Err(e) => return Ok(Err(e.to_string())),
        }
        conn.execute_batch(MIRROR_SCHEMA)?;
        Ok(Ok(()))
      })
      .await?;

    outcome.map_err(|reason| LoadError::Malformed { path, reason })?;
    self.generation.fetch_add(1, Ordering::AcqRel);
    self.ready.store(true, Ordering::Release);
    Ok(())
  }

  pub fn is_ready(&self) -> bool { self.ready.load(Ordering::Acquire) }

  /// Number of successful loads so far; 0 until the first one. Every load
  /// starts from empty mirror tables, so a changed generation means the
  /// mirror must be replayed.
  pub fn generation(&self) -> u64 { self.generation.load(Ordering::Acquire) }

  pub(crate) fn ensure_ready(&self) -> Result<()> {
    if self.is_ready() { Ok(()) } else { Err(Error::NotLoaded) }
  }

  pub(crate) async fn conn_call<R, F>(&self, f: F) -> Result<R>
  where
    R: Send + 'static,
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R>
      + Send
      + 'static,
  {
    Ok(self.conn.call(f).await?)
  }

  // ── Raw statements ────────────────────────────────────────────────────────

  /// Run a statement that returns no rows; yields the affected row count.
  pub async fn execute(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
  ) -> Result<usize> {
    self.ensure_ready()?;
    let sql = sql.into();

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(&sql, rusqlite::params_from_iter(params))?)
      })
      .await?;
    Ok(changed)
  }

  /// First row mapped through `map`, or `None` if the query is empty.
  pub async fn query_one<T, F>(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
    map: F,
  ) -> Result<Option<T>>
  where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    self.ensure_ready()?;
    let sql = sql.into();

    let row = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), map)
            .optional()?,
        )
      })
      .await?;
    Ok(row)
  }

  /// Every row mapped through `map`.
  pub async fn query_all<T, F>(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
    map: F,
  ) -> Result<Vec<T>>
  where
    T: Send + 'static,
    F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T> + Send + 'static,
  {
    self.ensure_ready()?;
    let sql = sql.into();

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), map)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }

  /// First column of the first row.
  pub async fn query_scalar<T>(
    &self,
    sql: impl Into<String>,
    params: Vec<Value>,
  ) -> Result<Option<T>>
  where
    T: FromSql + Send + 'static,
  {
    self.query_one(sql, params, |r| r.get::<_, T>(0)).await
  }

  // ── Puzzles ───────────────────────────────────────────────────────────────

  pub async fn puzzle_count(&self) -> Result<u64> {
    let count: Option<i64> = self
      .query_scalar("SELECT COUNT(*) FROM puzzles", vec![])
      .await?;
    Ok(count.unwrap_or(0) as u64)
  }

  /// Ids of every puzzle inside `bounds`, in id order. This is the slow path
  /// used when no theme narrows the query.
  pub async fn scan_ids(&self, bounds: &Bounds) -> Result<Vec<String>> {
    let (min_rating, max_rating, min_popularity) = bounds.sql_params();
    self
      .query_all(
        "SELECT id FROM puzzles
         WHERE rating BETWEEN ?1 AND ?2 AND COALESCE(popularity, 0) >= ?3
         ORDER BY id",
        vec![
          Value::Integer(min_rating),
          Value::Integer(max_rating),
          Value::Integer(min_popularity),
        ],
        |r| r.get::<_, String>(0),
      )
      .await
  }

  /// Full records for `ids` with any FEN override applied. Unknown ids are
  /// skipped; row order is unspecified.
  pub async fn fetch_puzzles(&self, ids: &[String]) -> Result<Vec<Puzzle>> {
    self.ensure_ready()?;
    if ids.is_empty() {
      return Ok(Vec::new());
    }
    let ids = ids.to_vec();

    let raws: Vec<RawPuzzle> = self
      .conn
      .call(move |conn| {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_BOUND_IDS) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let mut stmt = conn.prepare(&format!(
            "SELECT {PUZZLE_COLUMNS} {PUZZLE_FROM} WHERE p.id IN ({placeholders})"
          ))?;
          let rows =
            stmt.query_map(rusqlite::params_from_iter(chunk), RawPuzzle::from_row)?;
          for row in rows {
            out.push(row?);
          }
        }
        Ok(out)
      })
      .await?;

    Ok(raws.into_iter().map(RawPuzzle::into_puzzle).collect())
  }

  /// One puzzle joined with its mirrored moderation state.
  pub async fn puzzle_info(&self, puzzle_id: &str) -> Result<Option<PuzzleInfo>> {
    let sql = format!(
      "SELECT {PUZZLE_COLUMNS},
              COALESCE(m.blocked, 0),
              (SELECT COUNT(*) FROM puzzle_reports r WHERE r.puzzle_id = p.id)
       {PUZZLE_FROM}
       WHERE p.id = ?1"
    );

    self
      .query_one(sql, vec![Value::Text(puzzle_id.to_owned())], |row| {
        let raw = RawPuzzle::from_row(row)?;
        let blocked: bool = row.get(10)?;
        let report_count: i64 = row.get(11)?;
        Ok(PuzzleInfo {
          puzzle: raw.into_puzzle(),
          blocked,
          report_count: report_count as u64,
        })
      })
      .await
  }

  // ── Export ────────────────────────────────────────────────────────────────

  /// Serialize the whole in-memory database, mirror tables included.
  pub async fn export(&self) -> Result<Vec<u8>> {
    self.ensure_ready()?;
    let tmp = tempfile::NamedTempFile::new()?;
    let dst = tmp.path().to_path_buf();

    self
      .conn
      .call(move |conn| {
        conn.backup(DatabaseName::Main, &dst, None)?;
        Ok(())
      })
      .await?;

    Ok(tokio::fs::read(tmp.path()).await?)
  }
}

/// Returns whether the restored database has a `puzzles` table.
fn restore_snapshot(
  conn: &mut rusqlite::Connection,
  src: &Path,
  on_progress: Option<ProgressFn>,
) -> rusqlite::Result<bool> {
  match on_progress {
    Some(cb) => conn.restore(
      DatabaseName::Main,
      src,
      Some(move |p: Progress| cb(LoadProgress::from(p))),
    )?,
    None => conn.restore(DatabaseName::Main, src, None::<fn(Progress)>)?,
  }

  conn.query_row(
    "SELECT EXISTS (
       SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'puzzles'
     )",
    [],
    |r| r.get(0),
  )
}

// ─── Row type ────────────────────────────────────────────────────────────────

/// Raw values read from a `puzzles` row joined with its override.
struct RawPuzzle {
  id:               String,
  fen:              String,
  moves:            Option<String>,
  rating:           i64,
  rating_deviation: Option<i64>,
  popularity:       Option<i64>,
  nb_plays:         Option<i64>,
  game_url:         Option<String>,
  themes:           Option<String>,
  modified_fen:     Option<String>,
}

impl RawPuzzle {
  /// Expects the columns in [`PUZZLE_COLUMNS`] order.
  fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      fen:              row.get(1)?,
      moves:            row.get(2)?,
      rating:           row.get(3)?,
      rating_deviation: row.get(4)?,
      popularity:       row.get(5)?,
      nb_plays:         row.get(6)?,
      game_url:         row.get(7)?,
      themes:           row.get(8)?,
      modified_fen:     row.get(9)?,
    })
  }

  fn into_puzzle(self) -> Puzzle {
    let mut puzzle = Puzzle {
      id:               self.id,
      fen:              self.fen,
      original_fen:     None,
      moves:            self.moves.as_deref().map(split_field).unwrap_or_default(),
      rating:           self.rating,
      rating_deviation: self.rating_deviation.unwrap_or_default(),
      popularity:       self.popularity.unwrap_or_default(),
      play_count:       self.nb_plays.unwrap_or_default(),
      game_url:         self.game_url.unwrap_or_default(),
      themes:           self.themes.as_deref().map(split_field).unwrap_or_default(),
    };
    puzzle.apply_fen_override(self.modified_fen);
    puzzle
  }
}
