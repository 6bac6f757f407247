//! Error types for `strata-core`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid period: valid_to {valid_to} is not after valid_from {valid_from}")]
  InvalidPeriod {
    valid_from: DateTime<Utc>,
    valid_to:   DateTime<Utc>,
  },

  #[error("unknown cardinality policy: {0:?}")]
  UnknownCardinality(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
