//! [`SqliteStore`] — the SQLite implementation of [`TemporalStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use strata_core::{
  detail::{Detail, DetailPatch, NewDetail},
  period::Period,
  record::RecordVersion,
  root::Root,
  store::{CardinalityPolicy, TemporalStore},
  view::HierarchyView,
};

use crate::{
  Error, Result,
  encode::{RawDetail, RawRecordVersion, RawRoot, encode_dt, encode_uuid},
  schema::SCHEMA,
};

/// Timestamp for closing a row opened at `valid_from`. A close in the same
/// microsecond as the open would produce an empty period, so the stamp is
/// nudged just past the start when the clock has not advanced.
fn close_stamp(valid_from: DateTime<Utc>) -> DateTime<Utc> {
  let now = Utc::now();
  if now > valid_from {
    now
  } else {
    valid_from + chrono::Duration::microseconds(1)
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A versioned-hierarchy store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:   tokio_rusqlite::Connection,
  policy: CardinalityPolicy,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, policy: CardinalityPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, policy: CardinalityPolicy::default() };
    store.init_schema().await?;
    Ok(store)
  }

  /// Replace the detail cardinality policy (default: `Single`).
  pub fn with_policy(mut self, policy: CardinalityPolicy) -> Self {
    self.policy = policy;
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Check the lifecycle state of a logical record.
  ///
  /// Returns `(exists, open_row)`: whether any period row carries the id,
  /// and the open row if one does.
  async fn record_lifecycle_check(
    &self,
    record_id: Uuid,
  ) -> Result<(bool, Option<RawRecordVersion>)> {
    let id_str = encode_uuid(record_id);

    let (exists, open): (bool, Option<RawRecordVersion>) = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM record_versions WHERE record_id = ?1 LIMIT 1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok((false, None));
        }

        let open = conn
          .query_row(
            "SELECT record_id, root_id, valid_from, valid_to
             FROM record_versions
             WHERE record_id = ?1 AND valid_to IS NULL",
            rusqlite::params![id_str],
            |row| {
              Ok(RawRecordVersion {
                record_id:  row.get(0)?,
                root_id:    row.get(1)?,
                valid_from: row.get(2)?,
                valid_to:   row.get(3)?,
              })
            },
          )
          .optional()?;

        Ok((true, open))
      })
      .await?;

    Ok((exists, open))
  }

  /// Check the lifecycle state of a logical detail; same shape as
  /// [`record_lifecycle_check`](Self::record_lifecycle_check).
  async fn detail_lifecycle_check(
    &self,
    detail_id: Uuid,
  ) -> Result<(bool, Option<RawDetail>)> {
    let id_str = encode_uuid(detail_id);

    let (exists, open): (bool, Option<RawDetail>) = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM details WHERE detail_id = ?1 LIMIT 1",
            rusqlite::params![id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok((false, None));
        }

        let open = conn
          .query_row(
            "SELECT detail_id, record_id, name, city, valid_from, valid_to
             FROM details
             WHERE detail_id = ?1 AND valid_to IS NULL",
            rusqlite::params![id_str],
            |row| {
              Ok(RawDetail {
                detail_id:  row.get(0)?,
                record_id:  row.get(1)?,
                name:       row.get(2)?,
                city:       row.get(3)?,
                valid_from: row.get(4)?,
                valid_to:   row.get(5)?,
              })
            },
          )
          .optional()?;

        Ok((true, open))
      })
      .await?;

    Ok((exists, open))
  }

  /// The as-of record filter applied at the record level only, with the
  /// detail collection loaded by foreign key alone — i.e. the shape an eager
  /// relational include produces.
  ///
  /// The returned details are the *currently-open* rows, whatever `as_of`
  /// was: a temporal filter on the parent does not cascade to the children.
  /// This is almost never what a historical read wants; use
  /// [`TemporalStore::resolve_as_of`] instead.
  pub async fn record_as_of_with_details(
    &self,
    root_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> Result<Option<(RecordVersion, Vec<Detail>)>> {
    let record = match self.record_as_of(root_id, as_of).await? {
      Some(r) => r,
      None => return Ok(None),
    };

    let record_id_str = encode_uuid(record.record_id);

    let raws: Vec<RawDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT detail_id, record_id, name, city, valid_from, valid_to
           FROM details
           WHERE record_id = ?1 AND valid_to IS NULL
           ORDER BY valid_from",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![record_id_str], |row| {
            Ok(RawDetail {
              detail_id:  row.get(0)?,
              record_id:  row.get(1)?,
              name:       row.get(2)?,
              city:       row.get(3)?,
              valid_from: row.get(4)?,
              valid_to:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let details = raws
      .into_iter()
      .map(RawDetail::into_detail)
      .collect::<Result<Vec<_>>>()?;

    Ok(Some((record, details)))
  }

  /// The as-of join behind [`resolve_as_of`](TemporalStore::resolve_as_of):
  /// both sides are filtered to the same instant before combination, so a
  /// detail row either joins fully or is absent — never a mix of instants.
  async fn resolve_joined(
    &self,
    root: Root,
    as_of: DateTime<Utc>,
  ) -> Result<HierarchyView> {
    let root_id_str = encode_uuid(root.root_id);
    let as_of_str   = encode_dt(as_of);

    type JoinedRow = (RawRecordVersion, Option<RawDetail>);

    let rows: Vec<JoinedRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             r.record_id, r.root_id, r.valid_from, r.valid_to,
             d.detail_id, d.record_id, d.name, d.city,
             d.valid_from, d.valid_to
           FROM record_versions r
           LEFT JOIN details d
             ON d.record_id = r.record_id
            AND d.valid_from <= ?2
            AND (d.valid_to IS NULL OR d.valid_to > ?2)
           WHERE r.root_id = ?1
             AND r.valid_from <= ?2
             AND (r.valid_to IS NULL OR r.valid_to > ?2)
           ORDER BY d.valid_from",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![root_id_str, as_of_str], |row| {
            let record = RawRecordVersion {
              record_id:  row.get(0)?,
              root_id:    row.get(1)?,
              valid_from: row.get(2)?,
              valid_to:   row.get(3)?,
            };
            // LEFT JOIN: all detail columns are NULL when no detail period
            // covered the instant.
            let detail_id: Option<String> = row.get(4)?;
            let detail = match detail_id {
              None => None,
              Some(detail_id) => Some(RawDetail {
                detail_id,
                record_id:  row.get(5)?,
                name:       row.get(6)?,
                city:       row.get(7)?,
                valid_from: row.get(8)?,
                valid_to:   row.get(9)?,
              }),
            };
            Ok((record, detail))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    let mut record  = None;
    let mut details = Vec::new();
    for (raw_record, raw_detail) in rows {
      if record.is_none() {
        record = Some(raw_record.into_record()?);
      }
      if let Some(raw) = raw_detail {
        details.push(raw.into_detail()?);
      }
    }

    Ok(HierarchyView { root, as_of, record, details })
  }
}

// ─── TemporalStore impl ──────────────────────────────────────────────────────

impl TemporalStore for SqliteStore {
  type Error = Error;

  // ── Roots ─────────────────────────────────────────────────────────────────

  async fn create_root(&self, name: String) -> Result<Root> {
    let root = Root {
      root_id:    Uuid::new_v4(),
      name,
      created_at: Utc::now(),
    };

    let id_str   = encode_uuid(root.root_id);
    let name_str = root.name.clone();
    let at_str   = encode_dt(root.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO roots (root_id, name, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, name_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(root)
  }

  async fn get_root(&self, root_id: Uuid) -> Result<Option<Root>> {
    let id_str = encode_uuid(root_id);

    let raw: Option<RawRoot> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT root_id, name, created_at FROM roots WHERE root_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawRoot {
                root_id:    row.get(0)?,
                name:       row.get(1)?,
                created_at: row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRoot::into_root).transpose()
  }

  async fn list_roots(&self) -> Result<Vec<Root>> {
    let raws: Vec<RawRoot> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare("SELECT root_id, name, created_at FROM roots ORDER BY created_at")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawRoot {
              root_id:    row.get(0)?,
              name:       row.get(1)?,
              created_at: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRoot::into_root).collect()
  }

  // ── Versioned writes ──────────────────────────────────────────────────────

  async fn open_record(&self, root_id: Uuid) -> Result<RecordVersion> {
    if self.get_root(root_id).await?.is_none() {
      return Err(Error::RootNotFound(root_id));
    }

    let root_id_str = encode_uuid(root_id);

    let has_open: bool = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT 1 FROM record_versions
             WHERE root_id = ?1 AND valid_to IS NULL",
            rusqlite::params![root_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false))
      })
      .await?;

    if has_open {
      return Err(Error::OpenRecordExists(root_id));
    }

    let record = RecordVersion {
      record_id: Uuid::new_v4(),
      root_id,
      period:    Period::open(Utc::now()),
    };

    let record_id_str = encode_uuid(record.record_id);
    let root_id_str   = encode_uuid(root_id);
    let from_str      = encode_dt(record.period.valid_from);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO record_versions (record_id, root_id, valid_from, valid_to)
           VALUES (?1, ?2, ?3, NULL)",
          rusqlite::params![record_id_str, root_id_str, from_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn close_record(&self, record_id: Uuid) -> Result<RecordVersion> {
    let (exists, open) = self.record_lifecycle_check(record_id).await?;

    if !exists {
      return Err(Error::RecordNotFound(record_id));
    }
    let open = open.ok_or(Error::RecordClosed(record_id))?;

    let mut record = open.into_record()?;
    let closed_at = close_stamp(record.period.valid_from);
    record.period = record.period.close_at(closed_at)?;

    let record_id_str = encode_uuid(record_id);
    let to_str        = encode_dt(closed_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE record_versions SET valid_to = ?2
           WHERE record_id = ?1 AND valid_to IS NULL",
          rusqlite::params![record_id_str, to_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  async fn add_detail(&self, input: NewDetail) -> Result<Detail> {
    let (record_exists, _) =
      self.record_lifecycle_check(input.record_id).await?;
    if !record_exists {
      return Err(Error::RecordNotFound(input.record_id));
    }

    if self.policy == CardinalityPolicy::Single {
      let record_id_str = encode_uuid(input.record_id);
      let has_open: bool = self
        .conn
        .call(move |conn| {
          Ok(conn
            .query_row(
              "SELECT 1 FROM details
               WHERE record_id = ?1 AND valid_to IS NULL LIMIT 1",
              rusqlite::params![record_id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false))
        })
        .await?;

      if has_open {
        return Err(Error::DetailLimitExceeded(input.record_id));
      }
    }

    let detail = Detail {
      detail_id: Uuid::new_v4(),
      record_id: input.record_id,
      name:      input.name,
      city:      input.city,
      period:    Period::open(Utc::now()),
    };

    let detail_id_str = encode_uuid(detail.detail_id);
    let record_id_str = encode_uuid(detail.record_id);
    let name_str      = detail.name.clone();
    let city_str      = detail.city.clone();
    let from_str      = encode_dt(detail.period.valid_from);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO details (detail_id, record_id, name, city, valid_from, valid_to)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
          rusqlite::params![
            detail_id_str,
            record_id_str,
            name_str,
            city_str,
            from_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(detail)
  }

  async fn update_detail(
    &self,
    detail_id: Uuid,
    patch: DetailPatch,
  ) -> Result<Detail> {
    let (exists, open) = self.detail_lifecycle_check(detail_id).await?;

    if !exists {
      return Err(Error::DetailNotFound(detail_id));
    }
    let open = open.ok_or(Error::DetailClosed(detail_id))?.into_detail()?;

    let now = close_stamp(open.period.valid_from);
    let replacement = Detail {
      detail_id,
      record_id: open.record_id,
      name:      patch.name.unwrap_or(open.name),
      city:      patch.city.unwrap_or(open.city),
      period:    Period::open(now),
    };

    let detail_id_str = encode_uuid(detail_id);
    let record_id_str = encode_uuid(replacement.record_id);
    let name_str      = replacement.name.clone();
    let city_str      = replacement.city.clone();
    let now_str       = encode_dt(now);

    // Close the old row and open the replacement in one transaction so a
    // concurrent as-of reader sees either the complete pre-update state or
    // the complete post-update state. The closed row's valid_to equals the
    // replacement's valid_from, keeping the history contiguous.
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "UPDATE details SET valid_to = ?2
           WHERE detail_id = ?1 AND valid_to IS NULL",
          rusqlite::params![detail_id_str, now_str],
        )?;
        tx.execute(
          "INSERT INTO details (detail_id, record_id, name, city, valid_from, valid_to)
           VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
          rusqlite::params![
            detail_id_str,
            record_id_str,
            name_str,
            city_str,
            now_str,
          ],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(replacement)
  }

  async fn close_detail(&self, detail_id: Uuid) -> Result<Detail> {
    let (exists, open) = self.detail_lifecycle_check(detail_id).await?;

    if !exists {
      return Err(Error::DetailNotFound(detail_id));
    }
    let open = open.ok_or(Error::DetailClosed(detail_id))?;

    let mut detail = open.into_detail()?;
    let closed_at = close_stamp(detail.period.valid_from);
    detail.period = detail.period.close_at(closed_at)?;

    let detail_id_str = encode_uuid(detail_id);
    let to_str        = encode_dt(closed_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE details SET valid_to = ?2
           WHERE detail_id = ?1 AND valid_to IS NULL",
          rusqlite::params![detail_id_str, to_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(detail)
  }

  // ── As-of reads ───────────────────────────────────────────────────────────

  async fn record_as_of(
    &self,
    root_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> Result<Option<RecordVersion>> {
    let root_id_str = encode_uuid(root_id);
    let as_of_str   = encode_dt(as_of);

    let raw: Option<RawRecordVersion> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT record_id, root_id, valid_from, valid_to
             FROM record_versions
             WHERE root_id = ?1
               AND valid_from <= ?2
               AND (valid_to IS NULL OR valid_to > ?2)",
            rusqlite::params![root_id_str, as_of_str],
            |row| {
              Ok(RawRecordVersion {
                record_id:  row.get(0)?,
                root_id:    row.get(1)?,
                valid_from: row.get(2)?,
                valid_to:   row.get(3)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawRecordVersion::into_record).transpose()
  }

  async fn details_as_of(
    &self,
    record_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> Result<Vec<Detail>> {
    let record_id_str = encode_uuid(record_id);
    let as_of_str     = encode_dt(as_of);

    let raws: Vec<RawDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT detail_id, record_id, name, city, valid_from, valid_to
           FROM details
           WHERE record_id = ?1
             AND valid_from <= ?2
             AND (valid_to IS NULL OR valid_to > ?2)
           ORDER BY valid_from",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![record_id_str, as_of_str], |row| {
            Ok(RawDetail {
              detail_id:  row.get(0)?,
              record_id:  row.get(1)?,
              name:       row.get(2)?,
              city:       row.get(3)?,
              valid_from: row.get(4)?,
              valid_to:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDetail::into_detail).collect()
  }

  async fn resolve_as_of(
    &self,
    root_id: Uuid,
    as_of: DateTime<Utc>,
  ) -> Result<HierarchyView> {
    let root = self
      .get_root(root_id)
      .await?
      .ok_or(Error::RootNotFound(root_id))?;

    self.resolve_joined(root, as_of).await
  }

  async fn resolve_current(&self, root_id: Uuid) -> Result<HierarchyView> {
    // "Current" is defined by the open-ended period, not by the latest
    // period start, so this is a distinct predicate rather than an as-of
    // read at now(). The two agree at the present instant.
    let root = self
      .get_root(root_id)
      .await?
      .ok_or(Error::RootNotFound(root_id))?;

    let root_id_str = encode_uuid(root_id);

    type JoinedRow = (RawRecordVersion, Option<RawDetail>);

    let rows: Vec<JoinedRow> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT
             r.record_id, r.root_id, r.valid_from, r.valid_to,
             d.detail_id, d.record_id, d.name, d.city,
             d.valid_from, d.valid_to
           FROM record_versions r
           LEFT JOIN details d
             ON d.record_id = r.record_id AND d.valid_to IS NULL
           WHERE r.root_id = ?1 AND r.valid_to IS NULL
           ORDER BY d.valid_from",
        )?;

        let rows = stmt
          .query_map(rusqlite::params![root_id_str], |row| {
            let record = RawRecordVersion {
              record_id:  row.get(0)?,
              root_id:    row.get(1)?,
              valid_from: row.get(2)?,
              valid_to:   row.get(3)?,
            };
            let detail_id: Option<String> = row.get(4)?;
            let detail = match detail_id {
              None => None,
              Some(detail_id) => Some(RawDetail {
                detail_id,
                record_id:  row.get(5)?,
                name:       row.get(6)?,
                city:       row.get(7)?,
                valid_from: row.get(8)?,
                valid_to:   row.get(9)?,
              }),
            };
            Ok((record, detail))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    let as_of = Utc::now();
    let mut record  = None;
    let mut details = Vec::new();
    for (raw_record, raw_detail) in rows {
      if record.is_none() {
        record = Some(raw_record.into_record()?);
      }
      if let Some(raw) = raw_detail {
        details.push(raw.into_detail()?);
      }
    }

    Ok(HierarchyView { root, as_of, record, details })
  }

  async fn detail_history(&self, detail_id: Uuid) -> Result<Vec<Detail>> {
    let detail_id_str = encode_uuid(detail_id);

    let raws: Vec<RawDetail> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT detail_id, record_id, name, city, valid_from, valid_to
           FROM details
           WHERE detail_id = ?1
           ORDER BY valid_from",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![detail_id_str], |row| {
            Ok(RawDetail {
              detail_id:  row.get(0)?,
              record_id:  row.get(1)?,
              name:       row.get(2)?,
              city:       row.get(3)?,
              valid_from: row.get(4)?,
              valid_to:   row.get(5)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDetail::into_detail).collect()
  }
}
