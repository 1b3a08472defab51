//! Modifications: the single override record kept per puzzle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The live override for one puzzle. At most one exists per `puzzle_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
  pub puzzle_id:    String,
  pub blocked:      bool,
  /// Replaces the catalog FEN when present.
  pub modified_fen: Option<String>,
  pub modified_at:  DateTime<Utc>,
}

/// A partial update to a [`Modification`].
///
/// `None` leaves the existing value alone. `modified_fen: Some(None)` clears
/// the override.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationPatch {
  pub blocked:      Option<bool>,
  pub modified_fen: Option<Option<String>>,
}

impl ModificationPatch {
  pub fn blocked(blocked: bool) -> Self {
    Self { blocked: Some(blocked), ..Self::default() }
  }

  pub fn fen(fen: impl Into<String>) -> Self {
    Self { modified_fen: Some(Some(fen.into())), ..Self::default() }
  }

  /// Merge onto `existing` (or a blank record) and stamp `now`.
  pub fn apply(
    self,
    puzzle_id: &str,
    existing: Option<Modification>,
    now: DateTime<Utc>,
  ) -> Modification {
    let mut merged = existing.unwrap_or_else(|| Modification {
      puzzle_id:    puzzle_id.to_owned(),
      blocked:      false,
      modified_fen: None,
      modified_at:  now,
    });

    if let Some(blocked) = self.blocked {
      merged.blocked = blocked;
    }
    if let Some(fen) = self.modified_fen {
      merged.modified_fen = fen;
    }
    merged.modified_at = now;
    merged
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn block_patch_keeps_existing_fen() {
    let now = Utc::now();
    let existing = Modification {
      puzzle_id:    "p1".into(),
      blocked:      false,
      modified_fen: Some("8/8/8/8/8/8/8/K6k w - - 0 1".into()),
      modified_at:  now,
    };

    let merged = ModificationPatch::blocked(true).apply("p1", Some(existing), now);
    assert!(merged.blocked);
    assert_eq!(
      merged.modified_fen.as_deref(),
      Some("8/8/8/8/8/8/8/K6k w - - 0 1")
    );
  }

  #[test]
  fn fen_patch_on_missing_record_starts_unblocked() {
    let merged = ModificationPatch::fen("8/8/8/8/8/8/8/K6k w - - 0 1")
      .apply("p2", None, Utc::now());
    assert_eq!(merged.puzzle_id, "p2");
    assert!(!merged.blocked);
    assert!(merged.modified_fen.is_some());
  }

  #[test]
  fn clearing_the_override() {
    let now = Utc::now();
    let existing = Modification {
      puzzle_id:    "p3".into(),
      blocked:      true,
      modified_fen: Some("x".into()),
      modified_at:  now,
    };
    let patch = ModificationPatch { modified_fen: Some(None), ..Default::default() };
    let merged = patch.apply("p3", Some(existing), now);
    assert!(merged.blocked);
    assert!(merged.modified_fen.is_none());
  }
}
