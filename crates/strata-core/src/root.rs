//! Root — the stable, never-historized anchor of a hierarchy.
//!
//! A root holds only identity metadata. Everything that changes over time
//! lives in its versioned children and is reconstructed on read.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stable identity that versioned records attach to. Roots are never
/// historized; only their children carry periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
  pub root_id:    Uuid,
  pub name:       String,
  pub created_at: DateTime<Utc>,
}
