//! SQL schema for the control-plane catalog.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full catalog DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const CATALOG_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS organization_members (
    organization_id TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    PRIMARY KEY (organization_id, user_id)
);

-- db_name is generated once and never rewritten.
CREATE TABLE IF NOT EXISTS projects (
    project_id      TEXT PRIMARY KEY,
    organization_id TEXT NOT NULL,
    name            TEXT NOT NULL COLLATE NOCASE,
    db_name         TEXT NOT NULL UNIQUE,
    created_by      TEXT NOT NULL,
    updated_by      TEXT NOT NULL,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    UNIQUE (organization_id, name)
);

-- One row per tenant table. columns is the JSON-encoded column list in
-- position order.
CREATE TABLE IF NOT EXISTS catalog_tables (
    table_id   TEXT PRIMARY KEY,
    project_id TEXT NOT NULL REFERENCES projects(project_id) ON DELETE CASCADE,
    name       TEXT NOT NULL COLLATE NOCASE,
    columns    TEXT NOT NULL DEFAULT '[]',
    created_by TEXT NOT NULL,
    updated_by TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (project_id, name)
);

PRAGMA user_version = 1;
";
