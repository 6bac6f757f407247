//! The `TemporalStore` trait and supporting configuration types.
//!
//! The trait is implemented by storage backends (e.g. `strata-store-sqlite`).
//! Callers depend on this abstraction, not on any concrete backend.

use std::{future::Future, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  detail::{Detail, DetailPatch, NewDetail},
  record::RecordVersion,
  root::Root,
  view::HierarchyView,
};

// ─── Cardinality policy ──────────────────────────────────────────────────────

/// How many concurrently-open details a record may carry.
///
/// Single-detail records are the common shape, so `Single` is the default and
/// the store rejects a second open detail. `Multiple` lifts the check; the
/// resolver itself never cares either way.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CardinalityPolicy {
  #[default]
  Single,
  Multiple,
}

impl FromStr for CardinalityPolicy {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "single" => Ok(Self::Single),
      "multiple" => Ok(Self::Multiple),
      other => Err(Error::UnknownCardinality(other.to_owned())),
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a versioned-hierarchy store backend.
///
/// Rows of versioned tables are never updated in place. A mutation closes the
/// open period row and inserts a replacement carrying the same logical key,
/// atomically with respect to concurrent readers: an as-of read observes
/// either the complete pre-mutation state or the complete post-mutation
/// state, never a torn intermediate.
///
/// Reads are side-effect free and idempotent. An as-of read with a future
/// timestamp resolves to the currently-open rows, since no period ends in the
/// future. Retry policy belongs to the backend, not to this surface.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait TemporalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Roots ─────────────────────────────────────────────────────────────

  /// Create and persist a new root. Roots are never historized.
  fn create_root(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Root, Self::Error>> + Send + '_;

  /// Retrieve a root by UUID. Returns `None` if not found.
  fn get_root(
    &self,
    root_id: Uuid,
  ) -> impl Future<Output = Result<Option<Root>, Self::Error>> + Send + '_;

  /// List all roots.
  fn list_roots(
    &self,
  ) -> impl Future<Output = Result<Vec<Root>, Self::Error>> + Send + '_;

  // ── Versioned writes ──────────────────────────────────────────────────

  /// Open a new record version under a root. At most one record may be open
  /// per root at any instant; errors if one already is, or if the root does
  /// not exist.
  fn open_record(
    &self,
    root_id: Uuid,
  ) -> impl Future<Output = Result<RecordVersion, Self::Error>> + Send + '_;

  /// Close the open period row of a logical record. Errors if the record is
  /// unknown or already closed.
  fn close_record(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<RecordVersion, Self::Error>> + Send + '_;

  /// Attach a new detail to a record, opening its first period row. Under
  /// [`CardinalityPolicy::Single`], errors if the record already has an open
  /// detail.
  fn add_detail(
    &self,
    input: NewDetail,
  ) -> impl Future<Output = Result<Detail, Self::Error>> + Send + '_;

  /// Apply `patch` to the open row of a logical detail: the open row is
  /// closed and a replacement is inserted with the same `detail_id` and a
  /// fresh period start, in one transaction. The parent record's period is
  /// not touched.
  fn update_detail(
    &self,
    detail_id: Uuid,
    patch: DetailPatch,
  ) -> impl Future<Output = Result<Detail, Self::Error>> + Send + '_;

  /// Close the open period row of a logical detail with no replacement (a
  /// system-versioned delete). Errors if the detail is unknown or already
  /// closed.
  fn close_detail(
    &self,
    detail_id: Uuid,
  ) -> impl Future<Output = Result<Detail, Self::Error>> + Send + '_;

  // ── As-of reads ───────────────────────────────────────────────────────

  /// The record version of `root_id` whose period contains `as_of`, if any.
  fn record_as_of(
    &self,
    root_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<RecordVersion>, Self::Error>> + Send + '_;

  /// All detail rows of `record_id` whose periods contain `as_of`.
  fn details_as_of(
    &self,
    record_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Detail>, Self::Error>> + Send + '_;

  /// Resolve the full hierarchy of `root_id` as it existed at `as_of`.
  ///
  /// Every versioned level is filtered to the same instant and the levels
  /// are joined on the foreign key inside the storage query. Temporal
  /// filters do not cascade through parent-child navigation — loading a
  /// detail collection eagerly off an as-of-filtered record returns the
  /// latest detail rows, not the rows valid at `as_of` — so the join is the
  /// only safe composition.
  ///
  /// An unknown root is an error; a root with no record period covering
  /// `as_of` yields an empty view.
  fn resolve_as_of(
    &self,
    root_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> impl Future<Output = Result<HierarchyView, Self::Error>> + Send + '_;

  /// Resolve the currently-open hierarchy of `root_id`. Agrees with
  /// [`resolve_as_of`](Self::resolve_as_of) at the present instant.
  fn resolve_current(
    &self,
    root_id: Uuid,
  ) -> impl Future<Output = Result<HierarchyView, Self::Error>> + Send + '_;

  /// Every period row of a logical detail, ordered by period start.
  fn detail_history(
    &self,
    detail_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Detail>, Self::Error>> + Send + '_;
}
