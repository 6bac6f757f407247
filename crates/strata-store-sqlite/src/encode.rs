//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! UUIDs are stored as hyphenated lowercase strings. Timestamps are stored as
//! RFC 3339 UTC with fixed microsecond precision: period predicates compare
//! timestamps inside SQL as text, and a fixed-width fractional part keeps
//! lexicographic order identical to chronological order.

use chrono::{DateTime, SecondsFormat, Utc};
use strata_core::{
  detail::Detail,
  period::Period,
  record::RecordVersion,
  root::Root,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Period ──────────────────────────────────────────────────────────────────

pub fn decode_period(
  valid_from: &str,
  valid_to: Option<&str>,
) -> Result<Period> {
  let valid_from = decode_dt(valid_from)?;
  match valid_to {
    None => Ok(Period::open(valid_from)),
    Some(end) => Ok(Period::closed(valid_from, decode_dt(end)?)?),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `roots` row.
pub struct RawRoot {
  pub root_id:    String,
  pub name:       String,
  pub created_at: String,
}

impl RawRoot {
  pub fn into_root(self) -> Result<Root> {
    Ok(Root {
      root_id:    decode_uuid(&self.root_id)?,
      name:       self.name,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `record_versions` row.
pub struct RawRecordVersion {
  pub record_id:  String,
  pub root_id:    String,
  pub valid_from: String,
  pub valid_to:   Option<String>,
}

impl RawRecordVersion {
  pub fn into_record(self) -> Result<RecordVersion> {
    Ok(RecordVersion {
      record_id: decode_uuid(&self.record_id)?,
      root_id:   decode_uuid(&self.root_id)?,
      period:    decode_period(&self.valid_from, self.valid_to.as_deref())?,
    })
  }
}

/// Raw strings read directly from a `details` row.
pub struct RawDetail {
  pub detail_id:  String,
  pub record_id:  String,
  pub name:       String,
  pub city:       String,
  pub valid_from: String,
  pub valid_to:   Option<String>,
}

impl RawDetail {
  pub fn into_detail(self) -> Result<Detail> {
    Ok(Detail {
      detail_id: decode_uuid(&self.detail_id)?,
      record_id: decode_uuid(&self.record_id)?,
      name:      self.name,
      city:      self.city,
      period:    decode_period(&self.valid_from, self.valid_to.as_deref())?,
    })
  }
}
