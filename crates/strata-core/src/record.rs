//! Record versions — the system-versioned middle level of the hierarchy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::period::Period;

/// One period row of a versioned record. The logical record is identified by
/// `record_id`; over time the same `record_id` accumulates multiple period
/// rows, of which at most one is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVersion {
  pub record_id: Uuid,
  pub root_id:   Uuid,
  pub period:    Period,
}
