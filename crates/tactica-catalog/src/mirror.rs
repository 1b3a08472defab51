//! Mirror tables: relational copies of the durable reports and modifications
//! kept inside the catalog so that puzzle queries can join against them.
//!
//! The mirror is a cache. It starts empty with every snapshot load and is
//! refilled by reconciliation; on any disagreement the durable store wins.

use std::collections::HashSet;

use chrono::SecondsFormat;
use rusqlite::types::Value;
use tactica_core::{modification::Modification, report::Report};

use crate::{CatalogStore, Result};

/// Additive and idempotent; safe to run on every load and every
/// reconciliation.
pub(crate) const MIRROR_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS puzzle_reports (
    id          INTEGER PRIMARY KEY,
    puzzle_id   TEXT    NOT NULL,
    reason      TEXT    NOT NULL,
    notes       TEXT    NOT NULL DEFAULT '',
    dismissed   INTEGER NOT NULL DEFAULT 0,
    reported_at TEXT    NOT NULL
);

CREATE TABLE IF NOT EXISTS puzzle_modifications (
    puzzle_id    TEXT    PRIMARY KEY,
    blocked      INTEGER NOT NULL DEFAULT 0,
    modified_fen TEXT,
    modified_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS puzzle_reports_puzzle_idx ON puzzle_reports(puzzle_id);
";

/// Row counts of the two mirror tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorCounts {
  pub reports:       u64,
  pub modifications: u64,
}

impl CatalogStore {
  pub async fn ensure_mirror_tables(&self) -> Result<()> {
    self.ensure_ready()?;
    self
      .conn_call(|conn| {
        conn.execute_batch(MIRROR_SCHEMA)?;
        Ok(())
      })
      .await
  }

  pub async fn mirror_report_ids(&self) -> Result<HashSet<i64>> {
    let ids = self
      .query_all("SELECT id FROM puzzle_reports", vec![], |r| r.get::<_, i64>(0))
      .await?;
    Ok(ids.into_iter().collect())
  }

  /// Insert or refresh one report row.
  pub async fn mirror_report(&self, report: &Report) -> Result<()> {
    self
      .execute(
        "INSERT OR REPLACE INTO puzzle_reports
           (id, puzzle_id, reason, notes, dismissed, reported_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        vec![
          Value::Integer(report.id),
          Value::Text(report.puzzle_id.clone()),
          Value::Text(report.reason.to_string()),
          Value::Text(report.notes.clone()),
          Value::Integer(i64::from(report.dismissed)),
          Value::Text(
            report
              .reported_at
              .to_rfc3339_opts(SecondsFormat::Micros, true),
          ),
        ],
      )
      .await?;
    Ok(())
  }

  pub async fn mirror_report_dismissed(&self, id: i64, dismissed: bool) -> Result<()> {
    self
      .execute(
        "UPDATE puzzle_reports SET dismissed = ?2 WHERE id = ?1",
        vec![Value::Integer(id), Value::Integer(i64::from(dismissed))],
      )
      .await?;
    Ok(())
  }

  pub async fn unmirror_report(&self, id: i64) -> Result<()> {
    self
      .execute("DELETE FROM puzzle_reports WHERE id = ?1", vec![Value::Integer(id)])
      .await?;
    Ok(())
  }

  /// Upsert; replaying the same modification twice is harmless.
  pub async fn mirror_modification(&self, modification: &Modification) -> Result<()> {
    self
      .execute(
        "INSERT OR REPLACE INTO puzzle_modifications
           (puzzle_id, blocked, modified_fen, modified_at)
         VALUES (?1, ?2, ?3, ?4)",
        vec![
          Value::Text(modification.puzzle_id.clone()),
          Value::Integer(i64::from(modification.blocked)),
          modification
            .modified_fen
            .clone()
            .map_or(Value::Null, Value::Text),
          Value::Text(
            modification
              .modified_at
              .to_rfc3339_opts(SecondsFormat::Micros, true),
          ),
        ],
      )
      .await?;
    Ok(())
  }

  pub async fn unmirror_modification(&self, puzzle_id: &str) -> Result<()> {
    self
      .execute(
        "DELETE FROM puzzle_modifications WHERE puzzle_id = ?1",
        vec![Value::Text(puzzle_id.to_owned())],
      )
      .await?;
    Ok(())
  }

  pub async fn clear_mirror(&self) -> Result<()> {
    self.ensure_ready()?;
    self
      .conn_call(|conn| {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM puzzle_reports", [])?;
        tx.execute("DELETE FROM puzzle_modifications", [])?;
        tx.commit()?;
        Ok(())
      })
      .await
  }

  pub async fn mirror_row_counts(&self) -> Result<MirrorCounts> {
    let counts = self
      .query_one(
        "SELECT (SELECT COUNT(*) FROM puzzle_reports),
                (SELECT COUNT(*) FROM puzzle_modifications)",
        vec![],
        |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
      )
      .await?
      .unwrap_or_default();

    Ok(MirrorCounts {
      reports:       counts.0 as u64,
      modifications: counts.1 as u64,
    })
  }
}
