//! Puzzle: the read model handed to callers of the catalog.
//!
//! Puzzles are produced by the offline snapshot build and never mutated at
//! runtime. Overrides from the moderation layer are applied on read.

use serde::{Deserialize, Serialize};

/// Split a space-joined snapshot column (`moves`, `themes`).
pub fn split_field(raw: &str) -> Vec<String> {
  raw.split_whitespace().map(str::to_owned).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Puzzle {
  pub id:               String,
  /// The effective FEN: the moderation override if one exists.
  pub fen:              String,
  /// The catalog FEN, set only when `fen` was overridden.
  pub original_fen:     Option<String>,
  pub moves:            Vec<String>,
  pub rating:           i64,
  pub rating_deviation: i64,
  pub popularity:       i64,
  pub play_count:       i64,
  pub game_url:         String,
  pub themes:           Vec<String>,
}

impl Puzzle {
  /// Swap in an overriding FEN, remembering the catalog one.
  pub fn apply_fen_override(&mut self, modified_fen: Option<String>) {
    if let Some(fen) = modified_fen {
      let original = std::mem::replace(&mut self.fen, fen);
      self.original_fen = Some(original);
    }
  }

  pub fn is_overridden(&self) -> bool { self.original_fen.is_some() }
}

/// A puzzle joined with its moderation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PuzzleInfo {
  pub puzzle:       Puzzle,
  pub blocked:      bool,
  /// Reports currently mirrored into the catalog for this puzzle.
  pub report_count: u64,
}

/// A theme tag with the number of puzzles carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeCount {
  pub theme: String,
  pub count: usize,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn split_field_ignores_repeated_separators() {
    assert_eq!(split_field("e2e4  e7e5\t"), vec!["e2e4", "e7e5"]);
    assert!(split_field("").is_empty());
  }

  #[test]
  fn fen_override_keeps_original() {
    let mut p = Puzzle {
      id:               "00008".into(),
      fen:              "catalog".into(),
      original_fen:     None,
      moves:            vec![],
      rating:           1500,
      rating_deviation: 75,
      popularity:       90,
      play_count:       100,
      game_url:         String::new(),
      themes:           vec![],
    };

    p.apply_fen_override(None);
    assert!(!p.is_overridden());

    p.apply_fen_override(Some("fixed".into()));
    assert_eq!(p.fen, "fixed");
    assert_eq!(p.original_fen.as_deref(), Some("catalog"));
  }
}
