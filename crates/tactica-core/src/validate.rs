//! Input validation shared by every write path.

use crate::{ValidationError, report::ReportReason};

pub const MAX_PUZZLE_ID_LEN: usize = 32;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_FEN_LEN: usize = 200;

/// Non-empty, bounded, ASCII alphanumeric.
pub fn validate_puzzle_id(id: &str) -> Result<(), ValidationError> {
  if id.is_empty() {
    return Err(ValidationError::EmptyPuzzleId);
  }
  if id.len() > MAX_PUZZLE_ID_LEN {
    return Err(ValidationError::PuzzleIdTooLong { max: MAX_PUZZLE_ID_LEN });
  }
  if !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
    return Err(ValidationError::InvalidPuzzleId(id.to_owned()));
  }
  Ok(())
}

pub fn parse_reason(reason: &str) -> Result<ReportReason, ValidationError> {
  ReportReason::parse(reason)
}

/// Trim and truncate to [`MAX_NOTES_LEN`] characters (not bytes).
pub fn normalize_notes(notes: &str) -> String {
  notes.trim().chars().take(MAX_NOTES_LEN).collect()
}

/// Length only; whether the FEN describes a legal position is not checked
/// here.
pub fn validate_fen(fen: &str) -> Result<String, ValidationError> {
  let fen = fen.trim();
  if fen.is_empty() {
    return Err(ValidationError::EmptyFen);
  }
  if fen.chars().count() > MAX_FEN_LEN {
    return Err(ValidationError::FenTooLong { max: MAX_FEN_LEN });
  }
  Ok(fen.to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn puzzle_ids() {
    assert!(validate_puzzle_id("abc123").is_ok());
    assert!(validate_puzzle_id("00sHx").is_ok());
    assert_eq!(validate_puzzle_id(""), Err(ValidationError::EmptyPuzzleId));
    assert!(matches!(
      validate_puzzle_id("bad id!"),
      Err(ValidationError::InvalidPuzzleId(_))
    ));
    assert!(matches!(
      validate_puzzle_id(&"a".repeat(MAX_PUZZLE_ID_LEN + 1)),
      Err(ValidationError::PuzzleIdTooLong { .. })
    ));
    assert!(validate_puzzle_id(&"a".repeat(MAX_PUZZLE_ID_LEN)).is_ok());
  }

  #[test]
  fn notes_are_trimmed_then_truncated() {
    assert_eq!(normalize_notes("  hello \n"), "hello");
    let long = format!("  {}", "é".repeat(MAX_NOTES_LEN + 20));
    let normalized = normalize_notes(&long);
    assert_eq!(normalized.chars().count(), MAX_NOTES_LEN);
    assert!(normalized.starts_with('é'));
  }

  #[test]
  fn fen_length_bounds() {
    assert_eq!(validate_fen("   "), Err(ValidationError::EmptyFen));
    assert!(matches!(
      validate_fen(&"p".repeat(MAX_FEN_LEN + 1)),
      Err(ValidationError::FenTooLong { .. })
    ));
    assert_eq!(validate_fen(" 8/8/8/8/8/8/8/8 w - - 0 1 ").unwrap(), "8/8/8/8/8/8/8/8 w - - 0 1");
  }
}
