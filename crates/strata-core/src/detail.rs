//! Details — the system-versioned leaf level of the hierarchy.
//!
//! A detail's period is fully independent of its parent record's period:
//! updating a detail closes and reopens the detail row only, and closing a
//! record leaves its detail rows untouched.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::period::Period;

/// One period row of a versioned detail. Like records, the logical detail is
/// identified by `detail_id` across all of its period rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
  pub detail_id: Uuid,
  pub record_id: Uuid,
  pub name:      String,
  pub city:      String,
  pub period:    Period,
}

/// Input to [`crate::store::TemporalStore::add_detail`].
/// The period is always opened by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewDetail {
  pub record_id: Uuid,
  pub name:      String,
  pub city:      String,
}

impl NewDetail {
  pub fn new(
    record_id: Uuid,
    name: impl Into<String>,
    city: impl Into<String>,
  ) -> Self {
    Self { record_id, name: name.into(), city: city.into() }
  }
}

/// Field changes for [`crate::store::TemporalStore::update_detail`].
/// `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct DetailPatch {
  pub name: Option<String>,
  pub city: Option<String>,
}

impl DetailPatch {
  pub fn city(city: impl Into<String>) -> Self {
    Self { name: None, city: Some(city.into()) }
  }

  pub fn name(name: impl Into<String>) -> Self {
    Self { name: Some(name.into()), city: None }
  }
}
