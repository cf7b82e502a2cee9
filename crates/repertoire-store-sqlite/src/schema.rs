//! SQL schema for the repertoire SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per ply. Only the review columns are ever updated.
CREATE TABLE IF NOT EXISTS moves (
    move_id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id         TEXT    NOT NULL,
    parent_id        INTEGER REFERENCES moves(move_id),
    fen              TEXT    NOT NULL,   -- position after the move
    san              TEXT    NOT NULL,
    perspective      TEXT    NOT NULL CHECK (perspective IN ('w', 'b')),
    is_book_move     INTEGER NOT NULL,
    created_at       TEXT    NOT NULL,   -- RFC 3339 UTC; server-assigned
    last_review_at   TEXT,               -- RFC 3339 UTC
    next_review_at   TEXT,               -- calendar date, YYYY-MM-DD
    repetition_count INTEGER,
    easiness_factor  REAL,
    interval_days    INTEGER,
    -- Review columns are all set or all unset.
    CHECK (
      (last_review_at IS NULL AND next_review_at IS NULL
        AND repetition_count IS NULL AND easiness_factor IS NULL
        AND interval_days IS NULL)
      OR
      (last_review_at IS NOT NULL AND next_review_at IS NOT NULL
        AND repetition_count IS NOT NULL AND easiness_factor IS NOT NULL
        AND interval_days IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS moves_owner_parent_idx ON moves(owner_id, parent_id);
CREATE INDEX IF NOT EXISTS moves_owner_book_idx   ON moves(owner_id, is_book_move);

PRAGMA user_version = 1;
";
