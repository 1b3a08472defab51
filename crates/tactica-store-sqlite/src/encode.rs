//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed microsecond
//! precision so that lexical order in `ORDER BY reported_at` matches
//! chronological order. Booleans are stored as 0/1 integers.

use chrono::{DateTime, SecondsFormat, Utc};
use tactica_core::{
  modification::Modification,
  report::{Report, ReportReason},
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── ReportReason ────────────────────────────────────────────────────────────

// Encoded with the enum's `AsRef<str>` (snake_case).

pub fn decode_reason(s: &str) -> Result<ReportReason> {
  Ok(ReportReason::parse(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REPORT_COLUMNS: &str =
  "id, puzzle_id, reason, notes, dismissed, reported_at";

/// Raw values read directly from a `reports` row.
pub struct RawReport {
  pub id:          i64,
  pub puzzle_id:   String,
  pub reason:      String,
  pub notes:       String,
  pub dismissed:   bool,
  pub reported_at: String,
}

impl RawReport {
  /// Expects the columns in [`REPORT_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:          row.get(0)?,
      puzzle_id:   row.get(1)?,
      reason:      row.get(2)?,
      notes:       row.get(3)?,
      dismissed:   row.get(4)?,
      reported_at: row.get(5)?,
    })
  }

  pub fn into_report(self) -> Result<Report> {
    Ok(Report {
      id:          self.id,
      puzzle_id:   self.puzzle_id,
      reason:      decode_reason(&self.reason)?,
      notes:       self.notes,
      dismissed:   self.dismissed,
      reported_at: decode_dt(&self.reported_at)?,
    })
  }
}

pub const MODIFICATION_COLUMNS: &str =
  "puzzle_id, blocked, modified_fen, modified_at";

/// Raw values read directly from a `modifications` row.
pub struct RawModification {
  pub puzzle_id:    String,
  pub blocked:      bool,
  pub modified_fen: Option<String>,
  pub modified_at:  String,
}

impl RawModification {
  /// Expects the columns in [`MODIFICATION_COLUMNS`] order.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      puzzle_id:    row.get(0)?,
      blocked:      row.get(1)?,
      modified_fen: row.get(2)?,
      modified_at:  row.get(3)?,
    })
  }

  pub fn into_modification(self) -> Result<Modification> {
    Ok(Modification {
      puzzle_id:    self.puzzle_id,
      blocked:      self.blocked,
      modified_fen: self.modified_fen,
      modified_at:  decode_dt(&self.modified_at)?,
    })
  }
}
