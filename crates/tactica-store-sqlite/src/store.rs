//! [`SqliteMutationStore`]: the SQLite implementation of [`MutationStore`].

use std::path::{Path, PathBuf};

use chrono::{SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;

use tactica_core::{
  modification::{Modification, ModificationPatch},
  report::{NewReport, Report, ReportPatch, ReportQuery},
  store::{MutationStats, MutationStore, StoreOpener},
};

use crate::{
  Error, Result,
  encode::{
    MODIFICATION_COLUMNS, REPORT_COLUMNS, RawModification, RawReport, encode_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A durable mutation store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteMutationStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteMutationStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    tracing::debug!(path = %path.display(), "opened mutation store");
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// An opener that opens the file at `path` each time it is asked.
  pub fn opener(path: impl Into<PathBuf>) -> SqliteOpener {
    SqliteOpener { path: path.into() }
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── Opener ──────────────────────────────────────────────────────────────────

/// Opens a [`SqliteMutationStore`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SqliteOpener {
  path: PathBuf,
}

impl SqliteOpener {
  pub fn path(&self) -> &Path { &self.path }
}

impl StoreOpener for SqliteOpener {
  type Store = SqliteMutationStore;

  async fn open(&self) -> Result<SqliteMutationStore> {
    SqliteMutationStore::open(&self.path).await
  }
}

// ─── MutationStore impl ──────────────────────────────────────────────────────

impl MutationStore for SqliteMutationStore {
  type Error = Error;

  // ── Reports ───────────────────────────────────────────────────────────────

  async fn save_report(&self, input: NewReport) -> Result<i64> {
    let reported_at = encode_dt(input.reported_at.unwrap_or_else(Utc::now));

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO reports (id, puzzle_id, reason, notes, dismissed, reported_at)
           VALUES (?1, ?2, ?3, ?4, 0, ?5)",
          rusqlite::params![
            input.id,
            input.puzzle_id,
            input.reason.as_ref(),
            input.notes,
            reported_at,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(id)
  }

  async fn get_report(&self, id: i64) -> Result<Option<Report>> {
    let raw: Option<RawReport> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
              rusqlite::params![id],
              RawReport::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReport::into_report).transpose()
  }

  async fn get_reports(&self, query: &ReportQuery) -> Result<Vec<Report>> {
    let include_dismissed = query.include_dismissed;
    // SQLite treats a negative LIMIT as "no limit".
    let limit_val = query.limit.map_or(-1, |l| l as i64);
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE (?1 OR dismissed = 0)
           ORDER BY reported_at DESC, id DESC
           LIMIT ?2 OFFSET ?3"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![include_dismissed, limit_val, offset_val],
            RawReport::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn count_reports(&self, include_dismissed: bool) -> Result<u64> {
    let count: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(
          "SELECT COUNT(*) FROM reports WHERE (?1 OR dismissed = 0)",
          rusqlite::params![include_dismissed],
          |r| r.get(0),
        )?)
      })
      .await?;
    Ok(count as u64)
  }

  async fn get_reports_for_puzzle(&self, puzzle_id: &str) -> Result<Vec<Report>> {
    let puzzle_id = puzzle_id.to_owned();

    let raws: Vec<RawReport> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REPORT_COLUMNS} FROM reports
           WHERE puzzle_id = ?1
           ORDER BY reported_at DESC, id DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![puzzle_id], RawReport::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReport::into_report).collect()
  }

  async fn update_report(&self, id: i64, patch: ReportPatch) -> Result<Option<Report>> {
    let updated: Option<Result<Report>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
            rusqlite::params![id],
            RawReport::from_row,
          )
          .optional()?;

        let Some(raw) = existing else {
          return Ok(None);
        };
        let mut report = match raw.into_report() {
          Ok(report) => report,
          Err(e) => return Ok(Some(Err(e))),
        };
        patch.apply(&mut report);

        tx.execute(
          "UPDATE reports SET dismissed = ?2, notes = ?3 WHERE id = ?1",
          rusqlite::params![report.id, report.dismissed, report.notes],
        )?;
        tx.commit()?;
        Ok(Some(Ok(report)))
      })
      .await?;

    updated.transpose()
  }

  async fn delete_report(&self, id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM reports WHERE id = ?1", rusqlite::params![id])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Modifications ─────────────────────────────────────────────────────────

  async fn save_modification(&self, modification: Modification) -> Result<()> {
    let at_str = encode_dt(modification.modified_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO modifications (puzzle_id, blocked, modified_fen, modified_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            modification.puzzle_id,
            modification.blocked,
            modification.modified_fen,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn patch_modification(
    &self,
    puzzle_id: &str,
    patch: ModificationPatch,
  ) -> Result<Modification> {
    let puzzle_id = puzzle_id.to_owned();
    // Stored at microsecond precision; return exactly what a read gives back.
    let now = Utc::now().trunc_subsecs(6);
    let at_str = encode_dt(now);

    let merged = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existing = tx
          .query_row(
            "SELECT blocked, modified_fen FROM modifications WHERE puzzle_id = ?1",
            rusqlite::params![puzzle_id],
            |r| Ok((r.get::<_, bool>(0)?, r.get::<_, Option<String>>(1)?)),
          )
          .optional()?
          .map(|(blocked, modified_fen)| Modification {
            puzzle_id: puzzle_id.clone(),
            blocked,
            modified_fen,
            modified_at: now,
          });

        let merged = patch.apply(&puzzle_id, existing, now);
        tx.execute(
          "INSERT OR REPLACE INTO modifications (puzzle_id, blocked, modified_fen, modified_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            merged.puzzle_id,
            merged.blocked,
            merged.modified_fen,
            at_str,
          ],
        )?;
        tx.commit()?;
        Ok(merged)
      })
      .await?;

    Ok(merged)
  }

  async fn get_modification(&self, puzzle_id: &str) -> Result<Option<Modification>> {
    let puzzle_id = puzzle_id.to_owned();

    let raw: Option<RawModification> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {MODIFICATION_COLUMNS} FROM modifications WHERE puzzle_id = ?1"
              ),
              rusqlite::params![puzzle_id],
              RawModification::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawModification::into_modification).transpose()
  }

  async fn get_all_modifications(&self) -> Result<Vec<Modification>> {
    let raws: Vec<RawModification> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {MODIFICATION_COLUMNS} FROM modifications ORDER BY puzzle_id"
        ))?;
        let rows = stmt
          .query_map([], RawModification::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawModification::into_modification)
      .collect()
  }

  async fn get_blocked_puzzle_ids(&self) -> Result<Vec<String>> {
    let ids = self
      .conn
      .call(|conn| {
        // Served by modifications_blocked_idx.
        let mut stmt = conn.prepare(
          "SELECT puzzle_id FROM modifications WHERE blocked = 1 ORDER BY puzzle_id",
        )?;
        let rows = stmt
          .query_map([], |r| r.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(ids)
  }

  async fn delete_modification(&self, puzzle_id: &str) -> Result<()> {
    let puzzle_id = puzzle_id.to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM modifications WHERE puzzle_id = ?1",
          rusqlite::params![puzzle_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Maintenance ───────────────────────────────────────────────────────────

  async fn stats(&self) -> Result<MutationStats> {
    let (total, pending, dismissed, blocked, modified): (i64, i64, i64, i64, i64) = self
      .conn
      .call(|conn| {
        Ok(conn.query_row(
          "SELECT
             (SELECT COUNT(*) FROM reports),
             (SELECT COUNT(*) FROM reports WHERE dismissed = 0),
             (SELECT COUNT(*) FROM reports WHERE dismissed = 1),
             (SELECT COUNT(*) FROM modifications WHERE blocked = 1),
             (SELECT COUNT(*) FROM modifications WHERE modified_fen IS NOT NULL)",
          [],
          |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )?)
      })
      .await?;

    Ok(MutationStats {
      total_reports:     total as u64,
      pending_reports:   pending as u64,
      dismissed_reports: dismissed as u64,
      blocked_puzzles:   blocked as u64,
      modified_puzzles:  modified as u64,
    })
  }

  async fn clear_all(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM reports", [])?;
        tx.execute("DELETE FROM modifications", [])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
