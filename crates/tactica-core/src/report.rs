//! Reports: user complaints about a puzzle.
//!
//! Reports are append-only. The only field that changes after creation is the
//! `dismissed` flag (plus notes, through the same read-merge patch).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::ValidationError;

// ─── Reason ──────────────────────────────────────────────────────────────────

/// Why a puzzle was reported.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  AsRefStr,
  Display,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ReportReason {
  WrongSolution,
  Duplicate,
  BrokenPosition,
  Other,
}

impl ReportReason {
  pub const ALL: [ReportReason; 4] = [
    Self::WrongSolution,
    Self::Duplicate,
    Self::BrokenPosition,
    Self::Other,
  ];

  /// Parse the stored/wire form, rejecting anything outside the enum.
  pub fn parse(s: &str) -> Result<Self, ValidationError> {
    Self::from_str(s).map_err(|_| ValidationError::UnknownReason(s.to_owned()))
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A persisted report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
  /// Assigned by the durable store; monotonic.
  pub id:          i64,
  /// Not enforced as a foreign key: the catalog lives in another database.
  pub puzzle_id:   String,
  pub reason:      ReportReason,
  pub notes:       String,
  pub dismissed:   bool,
  pub reported_at: DateTime<Utc>,
}

/// Input to [`MutationStore::save_report`](crate::store::MutationStore::save_report).
///
/// `id` and `reported_at` are filled in by the store when absent; callers
/// replaying records from elsewhere may supply them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReport {
  pub id:          Option<i64>,
  pub puzzle_id:   String,
  pub reason:      ReportReason,
  pub notes:       String,
  pub reported_at: Option<DateTime<Utc>>,
}

impl NewReport {
  pub fn new(puzzle_id: impl Into<String>, reason: ReportReason) -> Self {
    Self {
      id: None,
      puzzle_id: puzzle_id.into(),
      reason,
      notes: String::new(),
      reported_at: None,
    }
  }

  pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
    self.notes = notes.into();
    self
  }
}

/// Partial update merged into an existing report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportPatch {
  pub dismissed: Option<bool>,
  pub notes:     Option<String>,
}

impl ReportPatch {
  pub fn dismiss() -> Self {
    Self { dismissed: Some(true), ..Self::default() }
  }

  pub fn apply(self, report: &mut Report) {
    if let Some(dismissed) = self.dismissed {
      report.dismissed = dismissed;
    }
    if let Some(notes) = self.notes {
      report.notes = notes;
    }
  }
}

// ─── Query type ──────────────────────────────────────────────────────────────

/// Parameters for [`MutationStore::get_reports`](crate::store::MutationStore::get_reports).
///
/// Results are always ordered newest first.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
  pub include_dismissed: bool,
  pub limit:             Option<usize>,
  pub offset:            Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reason_uses_snake_case_everywhere() {
    assert_eq!(ReportReason::WrongSolution.as_ref(), "wrong_solution");
    assert_eq!(ReportReason::BrokenPosition.to_string(), "broken_position");
    assert_eq!(
      serde_json::to_string(&ReportReason::Duplicate).unwrap(),
      "\"duplicate\""
    );
    assert_eq!(ReportReason::parse("other").unwrap(), ReportReason::Other);
  }

  #[test]
  fn reason_rejects_unknown_values() {
    assert_eq!(
      ReportReason::parse("not_a_reason"),
      Err(ValidationError::UnknownReason("not_a_reason".into()))
    );
    assert!(ReportReason::parse("WrongSolution").is_err());
  }

  #[test]
  fn patch_only_touches_given_fields() {
    let mut report = Report {
      id:          7,
      puzzle_id:   "abc12".into(),
      reason:      ReportReason::Duplicate,
      notes:       "same as 00008".into(),
      dismissed:   false,
      reported_at: Utc::now(),
    };

    ReportPatch::dismiss().apply(&mut report);
    assert!(report.dismissed);
    assert_eq!(report.notes, "same as 00008");

    ReportPatch { notes: Some("edited".into()), ..Default::default() }
      .apply(&mut report);
    assert!(report.dismissed);
    assert_eq!(report.notes, "edited");
  }
}
