//! Paging and result shapes handed to callers of the coordinator.

use serde::{Deserialize, Serialize};
use tactica_core::report::Report;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 200;

// ─── Report paging ───────────────────────────────────────────────────────────

/// Which page of the report list to fetch. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportListing {
  pub include_dismissed: bool,
  pub page:              usize,
  pub page_size:         usize,
}

impl Default for ReportListing {
  fn default() -> Self {
    Self { include_dismissed: false, page: 1, page_size: DEFAULT_PAGE_SIZE }
  }
}

impl ReportListing {
  pub fn page(page: usize) -> Self { Self { page, ..Self::default() } }

  /// Page 0 is read as page 1; the size is clamped to `1..=MAX_PAGE_SIZE`.
  pub(crate) fn normalized(self) -> Self {
    Self {
      include_dismissed: self.include_dismissed,
      page:              self.page.max(1),
      page_size:         self.page_size.clamp(1, MAX_PAGE_SIZE),
    }
  }

  pub(crate) fn offset(&self) -> usize { (self.page - 1) * self.page_size }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportPage {
  pub reports:   Vec<Report>,
  /// Matching reports across all pages.
  pub total:     u64,
  pub page:      usize,
  pub page_size: usize,
  pub has_more:  bool,
}

// ─── Action result ───────────────────────────────────────────────────────────

/// A mutation outcome flattened for a UI layer: `error` carries the
/// message when `success` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult<T> {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub data:    Option<T>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:   Option<String>,
}

impl<T> ActionResult<T> {
  pub fn ok(data: T) -> Self {
    Self { success: true, data: Some(data), error: None }
  }

  pub fn err(message: impl Into<String>) -> Self {
    Self { success: false, data: None, error: Some(message.into()) }
  }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for ActionResult<T> {
  fn from(result: Result<T, E>) -> Self {
    match result {
      Ok(data) => Self::ok(data),
      Err(e) => Self::err(e.to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::Error;

  #[test]
  fn listing_is_normalized() {
    let listing = ReportListing { include_dismissed: true, page: 0, page_size: 0 }.normalized();
    assert_eq!(listing.page, 1);
    assert_eq!(listing.page_size, 1);
    assert_eq!(listing.offset(), 0);

    let listing = ReportListing { page: 3, page_size: 10_000, ..Default::default() }.normalized();
    assert_eq!(listing.page_size, MAX_PAGE_SIZE);
    assert_eq!(listing.offset(), 2 * MAX_PAGE_SIZE);
  }

  #[test]
  fn action_result_from_error() {
    let failed: ActionResult<i64> = Err::<i64, _>(Error::NotFound(7)).into();
    assert!(!failed.success);
    assert_eq!(failed.error.as_deref(), Some("report 7 not found"));

    let json = serde_json::to_value(ActionResult::ok(3)).unwrap();
    assert_eq!(json, serde_json::json!({ "success": true, "data": 3 }));
  }
}
