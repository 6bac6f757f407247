//! Integration tests for `SqliteStore` against an in-memory database.
//!
//! Temporal scenarios capture timestamps between writes and sleep a few
//! milliseconds around mutations so that period boundaries are strictly
//! ordered at microsecond storage precision.

use std::time::Duration;

use chrono::Utc;
use strata_core::{
  detail::{DetailPatch, NewDetail},
  store::{CardinalityPolicy, TemporalStore},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn tick() {
  tokio::time::sleep(Duration::from_millis(5)).await;
}

/// Root + open record, the minimal writable hierarchy.
async fn seeded(s: &SqliteStore) -> (Uuid, Uuid) {
  let root = s.create_root("Mariner Books".into()).await.unwrap();
  let record = s.open_record(root.root_id).await.unwrap();
  (root.root_id, record.record_id)
}

// ─── Roots ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_root() {
  let s = store().await;

  let root = s.create_root("Mariner Books".into()).await.unwrap();
  assert_eq!(root.name, "Mariner Books");

  let fetched = s.get_root(root.root_id).await.unwrap().unwrap();
  assert_eq!(fetched, root);
}

#[tokio::test]
async fn get_root_missing_returns_none() {
  let s = store().await;
  assert!(s.get_root(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn list_roots_all() {
  let s = store().await;
  s.create_root("a".into()).await.unwrap();
  s.create_root("b".into()).await.unwrap();
  s.create_root("c".into()).await.unwrap();

  let all = s.list_roots().await.unwrap();
  assert_eq!(all.len(), 3);
}

// ─── Record lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn open_record_for_unknown_root_errors() {
  let s = store().await;
  let err = s.open_record(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::RootNotFound(_)));
}

#[tokio::test]
async fn second_open_record_errors() {
  let s = store().await;
  let (root_id, _) = seeded(&s).await;

  let err = s.open_record(root_id).await.unwrap_err();
  assert!(matches!(err, crate::Error::OpenRecordExists(_)));
}

#[tokio::test]
async fn close_then_reopen_record() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;

  tick().await;
  let closed = s.close_record(record_id).await.unwrap();
  assert!(!closed.period.is_open());

  // With no open record left, a new one may be opened.
  let reopened = s.open_record(root_id).await.unwrap();
  assert_ne!(reopened.record_id, record_id);
  assert!(reopened.period.is_open());
}

#[tokio::test]
async fn close_record_twice_errors() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  tick().await;
  s.close_record(record_id).await.unwrap();
  let err = s.close_record(record_id).await.unwrap_err();
  assert!(matches!(err, crate::Error::RecordClosed(_)));
}

#[tokio::test]
async fn close_unknown_record_errors() {
  let s = store().await;
  let err = s.close_record(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::RecordNotFound(_)));
}

// ─── Detail lifecycle ────────────────────────────────────────────────────────

#[tokio::test]
async fn add_detail_to_unknown_record_errors() {
  let s = store().await;
  let err = s
    .add_detail(NewDetail::new(Uuid::new_v4(), "Home", "Springfield"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::RecordNotFound(_)));
}

#[tokio::test]
async fn single_policy_rejects_second_open_detail() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  s.add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  let err = s
    .add_detail(NewDetail::new(record_id, "Office", "Shelbyville"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DetailLimitExceeded(_)));
}

#[tokio::test]
async fn multiple_policy_allows_concurrent_details() {
  let s = store().await.with_policy(CardinalityPolicy::Multiple);
  let (root_id, record_id) = seeded(&s).await;

  s.add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  s.add_detail(NewDetail::new(record_id, "Office", "Shelbyville"))
    .await
    .unwrap();

  let view = s.resolve_current(root_id).await.unwrap();
  assert_eq!(view.details.len(), 2);
}

#[tokio::test]
async fn closing_a_detail_frees_the_single_slot() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  tick().await;
  s.close_detail(detail.detail_id).await.unwrap();

  s.add_detail(NewDetail::new(record_id, "Home", "Ogdenville"))
    .await
    .unwrap();
}

#[tokio::test]
async fn update_detail_closes_old_row_and_opens_replacement() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();
  tick().await;

  let replacement = s
    .update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  // Same logical key, untouched name, new period start.
  assert_eq!(replacement.detail_id, detail.detail_id);
  assert_eq!(replacement.name, "Home");
  assert_eq!(replacement.city, "Correct City");
  assert!(replacement.period.is_open());

  let history = s.detail_history(detail.detail_id).await.unwrap();
  assert_eq!(history.len(), 2);
  assert_eq!(history[0].city, "Wrong City");
  assert!(!history[0].period.is_open());
  assert_eq!(history[1].city, "Correct City");
  assert!(history[1].period.is_open());

  // History is contiguous: the closed row ends where the replacement starts.
  assert_eq!(
    history[0].period.valid_to,
    Some(history[1].period.valid_from)
  );
}

#[tokio::test]
async fn update_unknown_detail_errors() {
  let s = store().await;
  let err = s
    .update_detail(Uuid::new_v4(), DetailPatch::city("Nowhere"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DetailNotFound(_)));
}

#[tokio::test]
async fn update_closed_detail_errors() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  tick().await;
  s.close_detail(detail.detail_id).await.unwrap();

  let err = s
    .update_detail(detail.detail_id, DetailPatch::city("Ogdenville"))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::DetailClosed(_)));
}

#[tokio::test]
async fn updating_a_detail_leaves_the_record_period_alone() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;

  let before = s.record_as_of(root_id, Utc::now()).await.unwrap().unwrap();

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();
  tick().await;
  s.update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  let after = s.record_as_of(root_id, Utc::now()).await.unwrap().unwrap();
  assert_eq!(after.period, before.period);
}

// ─── As-of resolution ────────────────────────────────────────────────────────

#[tokio::test]
async fn resolve_as_of_straddling_an_update() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();

  tick().await;
  let before_update = Utc::now();
  tick().await;

  s.update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  tick().await;
  let after_update = Utc::now();

  let old_view = s.resolve_as_of(root_id, before_update).await.unwrap();
  assert_eq!(old_view.details.len(), 1);
  assert_eq!(old_view.details[0].city, "Wrong City");

  let new_view = s.resolve_as_of(root_id, after_update).await.unwrap();
  assert_eq!(new_view.details.len(), 1);
  assert_eq!(new_view.details[0].city, "Correct City");
}

#[tokio::test]
async fn resolve_unknown_root_errors() {
  let s = store().await;
  let err = s
    .resolve_as_of(Uuid::new_v4(), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::RootNotFound(_)));
}

#[tokio::test]
async fn no_active_record_yields_empty_view_not_error() {
  let s = store().await;
  let before_everything = Utc::now();
  tick().await;
  let (root_id, _) = seeded(&s).await;

  // The root exists now, but had no record version at the probe instant.
  let view = s.resolve_as_of(root_id, before_everything).await.unwrap();
  assert!(view.is_empty());
  assert!(view.details.is_empty());
}

#[tokio::test]
async fn gap_between_record_versions_yields_empty_view() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;

  tick().await;
  s.close_record(record_id).await.unwrap();
  tick().await;
  let in_the_gap = Utc::now();
  tick().await;
  s.open_record(root_id).await.unwrap();

  let view = s.resolve_as_of(root_id, in_the_gap).await.unwrap();
  assert!(view.is_empty());
}

#[tokio::test]
async fn future_timestamp_resolves_to_open_rows() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;
  s.add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();

  let next_year = Utc::now() + chrono::Duration::days(365);
  let view = s.resolve_as_of(root_id, next_year).await.unwrap();

  assert!(!view.is_empty());
  assert_eq!(view.details.len(), 1);
  assert_eq!(view.details[0].city, "Springfield");
}

#[tokio::test]
async fn repeated_resolution_is_idempotent() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;
  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();
  tick().await;
  let t = Utc::now();
  tick().await;
  s.update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  let first  = s.resolve_as_of(root_id, t).await.unwrap();
  let second = s.resolve_as_of(root_id, t).await.unwrap();
  assert_eq!(first, second);
}

#[tokio::test]
async fn resolve_current_agrees_with_as_of_now() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;
  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();
  tick().await;
  s.update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  let current = s.resolve_current(root_id).await.unwrap();
  let as_of_now = s.resolve_as_of(root_id, Utc::now()).await.unwrap();

  // The probe instants differ, the resolved state must not.
  assert_eq!(current.record, as_of_now.record);
  assert_eq!(current.details, as_of_now.details);
  assert_eq!(current.current_detail().unwrap().city, "Correct City");
}

#[tokio::test]
async fn current_detail_is_the_open_period_not_the_first_element() {
  let s = store().await.with_policy(CardinalityPolicy::Multiple);
  let (root_id, record_id) = seeded(&s).await;

  let first = s
    .add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  tick().await;
  s.close_detail(first.detail_id).await.unwrap();
  tick().await;
  s.add_detail(NewDetail::new(record_id, "Home", "Ogdenville"))
    .await
    .unwrap();

  let current = s.resolve_current(root_id).await.unwrap();
  assert_eq!(current.current_detail().unwrap().city, "Ogdenville");
}

#[tokio::test]
async fn details_as_of_excludes_closed_rows() {
  let s = store().await;
  let (_, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Springfield"))
    .await
    .unwrap();
  tick().await;
  s.close_detail(detail.detail_id).await.unwrap();
  tick().await;

  let now = s.details_as_of(record_id, Utc::now()).await.unwrap();
  assert!(now.is_empty());

  // The closed row is still visible inside its own period.
  let then = s
    .details_as_of(record_id, detail.period.valid_from)
    .await
    .unwrap();
  assert_eq!(then.len(), 1);
}

// ─── The eager-include pitfall ───────────────────────────────────────────────

#[tokio::test]
async fn eager_include_returns_latest_details_regardless_of_as_of() {
  let s = store().await;
  let (root_id, record_id) = seeded(&s).await;

  let detail = s
    .add_detail(NewDetail::new(record_id, "Home", "Wrong City"))
    .await
    .unwrap();

  tick().await;
  let before_update = Utc::now();
  tick().await;

  s.update_detail(detail.detail_id, DetailPatch::city("Correct City"))
    .await
    .unwrap();

  // The include-shaped read filters only the record level; the attached
  // details come back at their latest state even for a historical probe.
  let (_, eager_details) = s
    .record_as_of_with_details(root_id, before_update)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(eager_details.len(), 1);
  assert_eq!(eager_details[0].city, "Correct City");

  // The explicit two-sided join returns the period-correct row.
  let joined = s.resolve_as_of(root_id, before_update).await.unwrap();
  assert_eq!(joined.details[0].city, "Wrong City");
}
