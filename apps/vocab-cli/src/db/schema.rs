//! SQLite schema definitions.

/// Current schema version for migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema for the word store.
///
/// Ids are 16-byte uuid blobs, so `ORDER BY id` matches uuid ordering.
/// Timestamps are unix microseconds.
pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS words (
    id BLOB PRIMARY KEY,
    course_id BLOB NOT NULL,
    text TEXT NOT NULL,
    pinyin TEXT NOT NULL,
    definition TEXT NOT NULL,
    example TEXT,
    audio_link TEXT,
    UNIQUE (course_id, text)
);

CREATE TABLE IF NOT EXISTS learning_states (
    word_id BLOB PRIMARY KEY REFERENCES words(id) ON DELETE CASCADE,
    error_count INTEGER NOT NULL DEFAULT 0,
    consecutive_correct INTEGER NOT NULL DEFAULT 0,
    last_reviewed INTEGER,
    next_review INTEGER,
    is_difficult INTEGER NOT NULL DEFAULT 0
);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_words_course ON words(course_id);
CREATE INDEX IF NOT EXISTS idx_learning_states_review ON learning_states(is_difficult, next_review);
CREATE INDEX IF NOT EXISTS idx_learning_states_seen ON learning_states(last_reviewed);
"#;

/// Record the schema version if not present. Bind [`SCHEMA_VERSION`].
pub const INIT_SCHEMA_VERSION: &str = "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)";
