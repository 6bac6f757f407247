//! SQL schema for the Strata SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
///
/// Versioned tables keep every period row, so their logical keys
/// (`record_id`, `detail_id`) are indexed rather than primary — the rowid
/// serves as the surrogate key for history rows.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Roots are never historized; plain rows, no period columns.
CREATE TABLE IF NOT EXISTS roots (
    root_id     TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- One row per period of a logical record. valid_to IS NULL marks the open
-- row. Rows are closed by stamping valid_to, never deleted.
CREATE TABLE IF NOT EXISTS record_versions (
    row_id      INTEGER PRIMARY KEY,
    record_id   TEXT NOT NULL,
    root_id     TEXT NOT NULL REFERENCES roots(root_id),
    valid_from  TEXT NOT NULL,
    valid_to    TEXT
);

-- One row per period of a logical detail. Period columns are independent of
-- the parent record's period.
CREATE TABLE IF NOT EXISTS details (
    row_id      INTEGER PRIMARY KEY,
    detail_id   TEXT NOT NULL,
    record_id   TEXT NOT NULL,
    name        TEXT NOT NULL,
    city        TEXT NOT NULL,
    valid_from  TEXT NOT NULL,
    valid_to    TEXT
);

CREATE INDEX IF NOT EXISTS record_versions_root_idx   ON record_versions(root_id, valid_from);
CREATE INDEX IF NOT EXISTS record_versions_record_idx ON record_versions(record_id);
CREATE INDEX IF NOT EXISTS details_record_idx         ON details(record_id, valid_from);
CREATE INDEX IF NOT EXISTS details_detail_idx         ON details(detail_id);

PRAGMA user_version = 1;
";
