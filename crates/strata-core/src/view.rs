//! The assembled as-of read model — never stored, always derived.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{detail::Detail, record::RecordVersion, root::Root};

/// The state of a hierarchy as it existed at `as_of`.
///
/// `record` is `None` when no record period covered `as_of` — a valid empty
/// state (versions can have gaps), not an error. `details` holds exactly the
/// detail rows whose own periods contained `as_of`; both levels are filtered
/// to the same instant by the store before assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyView {
  pub root:    Root,
  /// The point in time this view was resolved at.
  pub as_of:   DateTime<Utc>,
  pub record:  Option<RecordVersion>,
  pub details: Vec<Detail>,
}

impl HierarchyView {
  /// No record version was active at `as_of`.
  pub fn is_empty(&self) -> bool { self.record.is_none() }

  /// The detail whose period is still open, if any.
  ///
  /// Defined by the open-ended period, not as "the first/only element" — a
  /// view resolved in the past can carry details that have since been
  /// superseded, and a multi-cardinality record can carry several.
  pub fn current_detail(&self) -> Option<&Detail> {
    self.details.iter().find(|d| d.period.is_open())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use uuid::Uuid;

  use super::*;
  use crate::period::Period;

  fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
  }

  fn detail(city: &str, period: Period) -> Detail {
    Detail {
      detail_id: Uuid::new_v4(),
      record_id: Uuid::new_v4(),
      name: "Home".into(),
      city: city.into(),
      period,
    }
  }

  #[test]
  fn current_detail_picks_the_open_period() {
    let root = Root {
      root_id:    Uuid::new_v4(),
      name:       "r".into(),
      created_at: at(0),
    };
    let view = HierarchyView {
      root,
      as_of: at(500),
      record: None,
      details: vec![
        detail("Old Town", Period::closed(at(0), at(100)).unwrap()),
        detail("New Town", Period::open(at(100))),
      ],
    };

    assert_eq!(view.current_detail().unwrap().city, "New Town");
  }
}
