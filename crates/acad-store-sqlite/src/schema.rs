//! SQL schema for the SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Accounts are never deleted; only `status` and `updated_at` change.
CREATE TABLE IF NOT EXISTS accounts (
    account_id     TEXT PRIMARY KEY,
    role           TEXT NOT NULL CHECK (role IN ('student', 'faculty', 'admin')),
    external_id    TEXT NOT NULL,   -- register number | faculty id | username
    name           TEXT NOT NULL,
    department     TEXT,
    semester       INTEGER,         -- students only
    institution    TEXT,            -- admins only
    status         TEXT NOT NULL DEFAULT 'Active'
                   CHECK (status IN ('Active', 'Disabled')),
    password_hash  TEXT NOT NULL,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    UNIQUE (role, external_id)
);

CREATE TABLE IF NOT EXISTS sessions (
    token_digest TEXT PRIMARY KEY,  -- SHA-256 hex of the bearer token
    account_id   TEXT NOT NULL REFERENCES accounts(account_id),
    created_at   TEXT NOT NULL,
    expires_at   TEXT NOT NULL    -- fixed-width RFC 3339, compared lexically
);

CREATE INDEX IF NOT EXISTS sessions_expiry_idx ON sessions(expires_at);

-- Owner, category and metadata are written once. A row leaves 'Pending'
-- exactly once; points are present iff the row is approved.
CREATE TABLE IF NOT EXISTS submissions (
    submission_id  TEXT PRIMARY KEY,
    student_id     TEXT NOT NULL REFERENCES accounts(account_id),
    category       TEXT NOT NULL
                   CHECK (category IN ('Group I', 'Group II', 'Group III')),
    activity_type  TEXT NOT NULL,
    title          TEXT NOT NULL,
    description    TEXT NOT NULL DEFAULT '',
    points         INTEGER CHECK (points IS NULL OR points >= 1),
    status         TEXT NOT NULL DEFAULT 'Pending'
                   CHECK (status IN ('Pending', 'Approved', 'Rejected')),
    reviewer_id    TEXT REFERENCES accounts(account_id),
    remarks        TEXT,
    file_name      TEXT NOT NULL,
    original_name  TEXT NOT NULL,
    media_type     TEXT NOT NULL,
    file_size      INTEGER NOT NULL,
    sha256         TEXT NOT NULL,
    created_at     TEXT NOT NULL,   -- fixed-width RFC 3339; orders the queue
    updated_at     TEXT NOT NULL,
    CHECK ((status = 'Approved') = (points IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS submissions_cap_idx
    ON submissions(student_id, category, status);
CREATE INDEX IF NOT EXISTS submissions_queue_idx
    ON submissions(status, created_at);
CREATE INDEX IF NOT EXISTS accounts_role_idx ON accounts(role, department);

PRAGMA user_version = 1;
";
