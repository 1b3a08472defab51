//! SQL schema for the durable mutation store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Append-only apart from `dismissed` and `notes`.
-- AUTOINCREMENT keeps ids monotonic even after deletes.
CREATE TABLE IF NOT EXISTS reports (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    puzzle_id   TEXT    NOT NULL,   -- catalog id; not a foreign key
    reason      TEXT    NOT NULL,   -- wrong_solution | duplicate | broken_position | other
    notes       TEXT    NOT NULL DEFAULT '',
    dismissed   INTEGER NOT NULL DEFAULT 0,
    reported_at TEXT    NOT NULL    -- RFC 3339 UTC, fixed precision
);

-- One live override per puzzle.
CREATE TABLE IF NOT EXISTS modifications (
    puzzle_id    TEXT    PRIMARY KEY,
    blocked      INTEGER NOT NULL DEFAULT 0,
    modified_fen TEXT,
    modified_at  TEXT    NOT NULL
);

CREATE INDEX IF NOT EXISTS reports_reported_at_idx     ON reports(reported_at);
CREATE INDEX IF NOT EXISTS reports_puzzle_idx          ON reports(puzzle_id);
CREATE INDEX IF NOT EXISTS modifications_blocked_idx   ON modifications(blocked);

PRAGMA user_version = 1;
";
