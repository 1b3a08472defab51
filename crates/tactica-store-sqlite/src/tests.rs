//! Integration tests for `SqliteMutationStore` against in-memory and
//! on-disk databases.

use chrono::{Duration, TimeZone, Utc};
use tactica_core::{
  modification::{Modification, ModificationPatch},
  report::{NewReport, ReportPatch, ReportQuery, ReportReason},
  store::{MutationStats, MutationStore, StoreOpener},
};

use crate::SqliteMutationStore;

async fn store() -> SqliteMutationStore {
  SqliteMutationStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn report_at(puzzle_id: &str, minutes: i64) -> NewReport {
  let base = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
  let mut input = NewReport::new(puzzle_id, ReportReason::WrongSolution);
  input.reported_at = Some(base + Duration::minutes(minutes));
  input
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn save_and_get_report() {
  let s = store().await;

  let id = s
    .save_report(NewReport::new("abc123", ReportReason::Duplicate).with_notes("dupe of xyz"))
    .await
    .unwrap();

  let report = s.get_report(id).await.unwrap().unwrap();
  assert_eq!(report.id, id);
  assert_eq!(report.puzzle_id, "abc123");
  assert_eq!(report.reason, ReportReason::Duplicate);
  assert_eq!(report.notes, "dupe of xyz");
  assert!(!report.dismissed);
}

#[tokio::test]
async fn report_ids_are_monotonic() {
  let s = store().await;
  let a = s.save_report(report_at("p1", 0)).await.unwrap();
  let b = s.save_report(report_at("p2", 1)).await.unwrap();
  s.delete_report(b).await.unwrap();
  let c = s.save_report(report_at("p3", 2)).await.unwrap();

  assert!(a < b);
  assert!(b < c);
}

#[tokio::test]
async fn save_report_keeps_supplied_id_and_timestamp() {
  let s = store().await;
  let mut input = report_at("p1", 30);
  input.id = Some(42);
  let expected_at = input.reported_at.unwrap();

  let id = s.save_report(input).await.unwrap();
  assert_eq!(id, 42);
  assert_eq!(s.get_report(42).await.unwrap().unwrap().reported_at, expected_at);
}

#[tokio::test]
async fn get_reports_newest_first() {
  let s = store().await;
  s.save_report(report_at("old", 0)).await.unwrap();
  s.save_report(report_at("new", 10)).await.unwrap();
  s.save_report(report_at("mid", 5)).await.unwrap();

  let reports = s.get_reports(&ReportQuery::default()).await.unwrap();
  let ids: Vec<_> = reports.iter().map(|r| r.puzzle_id.as_str()).collect();
  assert_eq!(ids, ["new", "mid", "old"]);
}

#[tokio::test]
async fn get_reports_excludes_dismissed_unless_asked() {
  let s = store().await;
  let keep = s.save_report(report_at("a", 0)).await.unwrap();
  let gone = s.save_report(report_at("b", 1)).await.unwrap();
  s.update_report(gone, ReportPatch::dismiss()).await.unwrap();

  let pending = s.get_reports(&ReportQuery::default()).await.unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].id, keep);

  let all = s
    .get_reports(&ReportQuery { include_dismissed: true, ..Default::default() })
    .await
    .unwrap();
  assert_eq!(all.len(), 2);

  assert_eq!(s.count_reports(false).await.unwrap(), 1);
  assert_eq!(s.count_reports(true).await.unwrap(), 2);
}

#[tokio::test]
async fn get_reports_limit_and_offset() {
  let s = store().await;
  for minute in 0..7 {
    s.save_report(report_at(&format!("p{minute}"), minute)).await.unwrap();
  }

  let page = s
    .get_reports(&ReportQuery { limit: Some(3), offset: Some(3), ..Default::default() })
    .await
    .unwrap();
  let ids: Vec<_> = page.iter().map(|r| r.puzzle_id.as_str()).collect();
  assert_eq!(ids, ["p3", "p2", "p1"]);
}

#[tokio::test]
async fn reports_for_one_puzzle() {
  let s = store().await;
  s.save_report(report_at("target", 0)).await.unwrap();
  s.save_report(report_at("other", 1)).await.unwrap();
  s.save_report(report_at("target", 2)).await.unwrap();

  let reports = s.get_reports_for_puzzle("target").await.unwrap();
  assert_eq!(reports.len(), 2);
  assert!(reports.iter().all(|r| r.puzzle_id == "target"));
  assert!(reports[0].reported_at > reports[1].reported_at);
}

#[tokio::test]
async fn update_report_merges_fields() {
  let s = store().await;
  let id = s
    .save_report(report_at("p1", 0).with_notes("first"))
    .await
    .unwrap();

  let updated = s.update_report(id, ReportPatch::dismiss()).await.unwrap().unwrap();
  assert!(updated.dismissed);
  assert_eq!(updated.notes, "first");
  assert_eq!(updated.reason, ReportReason::WrongSolution);

  let stored = s.get_report(id).await.unwrap().unwrap();
  assert_eq!(stored, updated);
}

#[tokio::test]
async fn update_report_applies_notes_and_undismiss() {
  let s = store().await;
  let id = s.save_report(report_at("p1", 0).with_notes("first")).await.unwrap();
  s.update_report(id, ReportPatch::dismiss()).await.unwrap();

  let patch = ReportPatch { dismissed: Some(false), notes: Some("second".into()) };
  let updated = s.update_report(id, patch).await.unwrap().unwrap();
  assert!(!updated.dismissed);
  assert_eq!(updated.notes, "second");
  assert_eq!(s.get_report(id).await.unwrap().unwrap(), updated);

  let untouched = s.update_report(id, ReportPatch::default()).await.unwrap().unwrap();
  assert_eq!(untouched, updated);
}

#[tokio::test]
async fn update_missing_report_is_none() {
  let s = store().await;
  assert!(s.update_report(999, ReportPatch::dismiss()).await.unwrap().is_none());
}

#[tokio::test]
async fn delete_report_is_unconditional() {
  let s = store().await;
  let id = s.save_report(report_at("p1", 0)).await.unwrap();
  s.delete_report(id).await.unwrap();
  s.delete_report(id).await.unwrap();
  assert!(s.get_report(id).await.unwrap().is_none());
}

// ─── Modifications ───────────────────────────────────────────────────────────

#[tokio::test]
async fn save_modification_overwrites_whole_record() {
  let s = store().await;
  s.save_modification(Modification {
    puzzle_id:    "p1".into(),
    blocked:      true,
    modified_fen: Some("fen-a".into()),
    modified_at:  Utc::now(),
  })
  .await
  .unwrap();

  s.save_modification(Modification {
    puzzle_id:    "p1".into(),
    blocked:      false,
    modified_fen: None,
    modified_at:  Utc::now(),
  })
  .await
  .unwrap();

  let m = s.get_modification("p1").await.unwrap().unwrap();
  assert!(!m.blocked);
  assert!(m.modified_fen.is_none());
  assert_eq!(s.get_all_modifications().await.unwrap().len(), 1);
}

#[tokio::test]
async fn patch_modification_preserves_siblings() {
  let s = store().await;
  s.patch_modification("p1", ModificationPatch::fen("fen-a")).await.unwrap();
  let blocked = s
    .patch_modification("p1", ModificationPatch::blocked(true))
    .await
    .unwrap();
  assert!(blocked.blocked);
  assert_eq!(blocked.modified_fen.as_deref(), Some("fen-a"));

  let unblocked = s
    .patch_modification("p1", ModificationPatch::blocked(false))
    .await
    .unwrap();
  assert!(!unblocked.blocked);
  assert_eq!(unblocked.modified_fen.as_deref(), Some("fen-a"));

  let stored = s.get_modification("p1").await.unwrap().unwrap();
  assert_eq!(stored, unblocked);
}

#[tokio::test]
async fn blocked_ids_only_lists_blocked() {
  let s = store().await;
  s.patch_modification("b", ModificationPatch::blocked(true)).await.unwrap();
  s.patch_modification("a", ModificationPatch::blocked(true)).await.unwrap();
  s.patch_modification("c", ModificationPatch::fen("fen")).await.unwrap();
  s.patch_modification("d", ModificationPatch::blocked(false)).await.unwrap();

  assert_eq!(s.get_blocked_puzzle_ids().await.unwrap(), ["a", "b"]);
}

#[tokio::test]
async fn missing_modification_is_none_and_delete_is_unconditional() {
  let s = store().await;
  assert!(s.get_modification("nope").await.unwrap().is_none());
  s.delete_modification("nope").await.unwrap();

  s.patch_modification("p1", ModificationPatch::blocked(true)).await.unwrap();
  s.delete_modification("p1").await.unwrap();
  assert!(s.get_modification("p1").await.unwrap().is_none());
  assert!(s.get_blocked_puzzle_ids().await.unwrap().is_empty());
}

// ─── Maintenance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_reflect_both_collections() {
  let s = store().await;
  let a = s.save_report(report_at("a", 0)).await.unwrap();
  s.save_report(report_at("b", 1)).await.unwrap();
  s.save_report(report_at("c", 2)).await.unwrap();
  s.update_report(a, ReportPatch::dismiss()).await.unwrap();
  s.patch_modification("a", ModificationPatch::blocked(true)).await.unwrap();
  s.patch_modification("b", ModificationPatch::fen("fen")).await.unwrap();

  let stats = s.stats().await.unwrap();
  assert_eq!(stats.total_reports, 3);
  assert_eq!(stats.pending_reports, 2);
  assert_eq!(stats.dismissed_reports, 1);
  assert_eq!(stats.blocked_puzzles, 1);
  assert_eq!(stats.modified_puzzles, 1);
}

#[tokio::test]
async fn clear_all_empties_everything() {
  let s = store().await;
  s.save_report(report_at("a", 0)).await.unwrap();
  s.patch_modification("a", ModificationPatch::blocked(true)).await.unwrap();

  s.clear_all().await.unwrap();

  assert_eq!(s.stats().await.unwrap(), MutationStats::default());
  assert!(s.get_all_modifications().await.unwrap().is_empty());
}

#[tokio::test]
async fn records_survive_reopen() {
  let dir = tempfile::tempdir().unwrap();
  let opener = SqliteMutationStore::opener(dir.path().join("mutations.db"));

  let first = opener.open().await.unwrap();
  first.save_report(report_at("p1", 0)).await.unwrap();
  first.patch_modification("p1", ModificationPatch::blocked(true)).await.unwrap();
  drop(first);

  let second = opener.open().await.unwrap();
  assert_eq!(second.count_reports(true).await.unwrap(), 1);
  assert_eq!(second.get_blocked_puzzle_ids().await.unwrap(), ["p1"]);
}

#[tokio::test]
async fn open_in_missing_directory_fails() {
  let dir = tempfile::tempdir().unwrap();
  let opener = SqliteMutationStore::opener(dir.path().join("missing").join("m.db"));
  assert!(opener.open().await.is_err());
}
