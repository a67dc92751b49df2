//! SQL schema for the mealpass SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Schema DDL. Safe to run on every open.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    role          TEXT NOT NULL,          -- 'operator' | 'viewer' | 'superviewer'
    active        INTEGER NOT NULL DEFAULT 1,
    created_at    TEXT NOT NULL,
    last_login_at TEXT
);

CREATE TABLE IF NOT EXISTS persons (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    full_name   TEXT NOT NULL,
    email       TEXT UNIQUE,
    category    TEXT NOT NULL,            -- 'staff' | 'guest' | 'substitute'
    active      INTEGER NOT NULL DEFAULT 1,
    valid_from  TEXT,                     -- YYYY-MM-DD, inclusive
    valid_to    TEXT                      -- YYYY-MM-DD, inclusive
);

-- Rows are insert-only. The UNIQUE constraint is the sole guard against
-- registering the same person twice on one day.
CREATE TABLE IF NOT EXISTS deliveries (
    id                 INTEGER PRIMARY KEY AUTOINCREMENT,
    person_id          INTEGER NOT NULL REFERENCES persons(id),
    date               TEXT NOT NULL,     -- civil date, YYYY-MM-DD
    meal_type          TEXT,
    created_at         TEXT NOT NULL,     -- RFC 3339 UTC
    created_by_user_id INTEGER NOT NULL REFERENCES users(id),
    UNIQUE (person_id, date)
);

-- Single-row table written by administration.
CREATE TABLE IF NOT EXISTS access_config (
    id                      INTEGER PRIMARY KEY CHECK (id = 1),
    window_start            TEXT,         -- HH:MM
    window_end              TEXT,         -- HH:MM
    closed_message          TEXT,
    fallback_notify_address TEXT
);

CREATE INDEX IF NOT EXISTS deliveries_date_idx ON deliveries(date);

PRAGMA user_version = 1;
";
