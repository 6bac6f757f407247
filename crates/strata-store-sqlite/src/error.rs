//! Error type for `strata-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] strata_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("root not found: {0}")]
  RootNotFound(Uuid),

  #[error("record not found: {0}")]
  RecordNotFound(Uuid),

  #[error("detail not found: {0}")]
  DetailNotFound(Uuid),

  /// The logical record has no open period row left to close or mutate.
  #[error("record {0} is closed")]
  RecordClosed(Uuid),

  /// The logical detail has no open period row left to close or mutate.
  #[error("detail {0} is closed")]
  DetailClosed(Uuid),

  #[error("root {0} already has an open record")]
  OpenRecordExists(Uuid),

  /// Single-detail cardinality policy rejected a second open detail.
  #[error("record {0} already has an open detail")]
  DetailLimitExceeded(Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
