//! Database schema definitions for LocalCloud.
//!
//! Migrations are applied in order. Each migration is a SQL string.

/// List of migrations to apply.
///
/// Each migration is applied in order, and the schema version is tracked
/// in the `schema_version` table.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id                INTEGER PRIMARY KEY AUTOINCREMENT,
    username          TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email             TEXT,
    storage_limit_mb  INTEGER,              -- NULL or <= 0 falls back to the default
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);
"#,
    // v2: folders
    r#"
CREATE TABLE folders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    parent_id   INTEGER REFERENCES folders(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    is_deleted  INTEGER NOT NULL DEFAULT 0,
    deleted_at  TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,
    CHECK ((is_deleted = 0 AND deleted_at IS NULL) OR (is_deleted = 1 AND deleted_at IS NOT NULL))
);

CREATE INDEX idx_folders_user ON folders(user_id);
CREATE INDEX idx_folders_user_deleted ON folders(user_id, is_deleted);
CREATE INDEX idx_folders_parent ON folders(parent_id);
"#,
    // v3: files (payload inline)
    r#"
CREATE TABLE files (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id        INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    folder_id      INTEGER REFERENCES folders(id) ON DELETE SET NULL,
    filename       TEXT NOT NULL,
    original_name  TEXT NOT NULL,
    size           INTEGER NOT NULL,
    mime_type      TEXT NOT NULL,
    content        BLOB NOT NULL,
    content_hash   TEXT,
    is_deleted     INTEGER NOT NULL DEFAULT 0,
    deleted_at     TEXT,
    summary        TEXT,
    tags           TEXT,                    -- JSON array
    embedding      BLOB,                    -- little-endian f32
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    CHECK (size = length(content)),
    CHECK ((is_deleted = 0 AND deleted_at IS NULL) OR (is_deleted = 1 AND deleted_at IS NOT NULL))
);

CREATE INDEX idx_files_user ON files(user_id);
CREATE INDEX idx_files_user_deleted ON files(user_id, is_deleted);
CREATE INDEX idx_files_folder ON files(folder_id);
CREATE INDEX idx_files_hash ON files(content_hash);
"#,
    // v4: file versions
    r#"
CREATE TABLE file_versions (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    file_id     INTEGER NOT NULL REFERENCES files(id) ON DELETE CASCADE,
    version     INTEGER NOT NULL,
    content     BLOB NOT NULL,
    size        INTEGER NOT NULL,
    mime_type   TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    UNIQUE (file_id, version),
    CHECK (version >= 1),
    CHECK (size = length(content))
);

CREATE INDEX idx_file_versions_file ON file_versions(file_id);
"#,
];
