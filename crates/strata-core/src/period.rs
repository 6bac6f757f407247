//! Validity periods — the temporal backbone of every versioned row.
//!
//! A period is the half-open interval `[valid_from, valid_to)` during which a
//! row version is current. `valid_to = None` marks the row as still open. The
//! store closes a row by stamping `valid_to` and opening a replacement whose
//! `valid_from` equals that stamp, so per logical key the history is
//! contiguous and non-overlapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The `[valid_from, valid_to)` interval of a single row version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub valid_from: DateTime<Utc>,
  /// `None` while the row version is current.
  pub valid_to:   Option<DateTime<Utc>>,
}

impl Period {
  /// A period opened at `valid_from` with no end.
  pub fn open(valid_from: DateTime<Utc>) -> Self {
    Self { valid_from, valid_to: None }
  }

  /// A closed period. Rejects empty and inverted intervals.
  pub fn closed(
    valid_from: DateTime<Utc>,
    valid_to: DateTime<Utc>,
  ) -> Result<Self> {
    if valid_to <= valid_from {
      return Err(Error::InvalidPeriod { valid_from, valid_to });
    }
    Ok(Self { valid_from, valid_to: Some(valid_to) })
  }

  /// Close an open period at `at`. Closing an already-closed period or
  /// closing at (or before) `valid_from` is an error.
  pub fn close_at(self, at: DateTime<Utc>) -> Result<Self> {
    match self.valid_to {
      Some(valid_to) => Err(Error::InvalidPeriod {
        valid_from: self.valid_from,
        valid_to,
      }),
      None => Self::closed(self.valid_from, at),
    }
  }

  pub fn is_open(&self) -> bool { self.valid_to.is_none() }

  /// Whether `t` falls inside the interval. The start is inclusive, the end
  /// exclusive: the instant a row is superseded belongs to its successor.
  pub fn contains(&self, t: DateTime<Utc>) -> bool {
    self.valid_from <= t && self.valid_to.is_none_or(|end| t < end)
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn at(secs: i64) -> DateTime<Utc> { Utc.timestamp_opt(secs, 0).unwrap() }

  #[test]
  fn open_period_contains_everything_from_start() {
    let p = Period::open(at(100));
    assert!(!p.contains(at(99)));
    assert!(p.contains(at(100)));
    assert!(p.contains(at(1_000_000)));
    assert!(p.is_open());
  }

  #[test]
  fn closed_period_is_half_open() {
    let p = Period::closed(at(100), at(200)).unwrap();
    assert!(!p.contains(at(99)));
    assert!(p.contains(at(100)));
    assert!(p.contains(at(199)));
    // The end instant belongs to the successor row.
    assert!(!p.contains(at(200)));
  }

  #[test]
  fn empty_and_inverted_periods_rejected() {
    assert!(matches!(
      Period::closed(at(100), at(100)),
      Err(Error::InvalidPeriod { .. })
    ));
    assert!(matches!(
      Period::closed(at(100), at(50)),
      Err(Error::InvalidPeriod { .. })
    ));
  }

  #[test]
  fn close_at_stamps_the_end() {
    let p = Period::open(at(100)).close_at(at(150)).unwrap();
    assert_eq!(p.valid_to, Some(at(150)));
    assert!(!p.is_open());
  }

  #[test]
  fn close_at_rejects_already_closed() {
    let p = Period::closed(at(100), at(150)).unwrap();
    assert!(p.close_at(at(200)).is_err());
  }
}
