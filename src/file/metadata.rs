//! File metadata types and repository for LocalCloud.
//!
//! The payload lives inline in the `files` table. Everything here except
//! [`FileRepository::get_content`] leaves it out of the SELECT.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::analysis::codec;
use crate::{LocalCloudError, Result};

pub(crate) const FILE_COLUMNS: &str = "id, user_id, folder_id, filename, original_name, size,
     mime_type, content_hash, is_deleted, deleted_at, summary, tags, embedding,
     created_at, updated_at";

/// Stored file metadata (payload excluded).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileMetadata {
    /// Unique file ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Containing folder (None = root).
    pub folder_id: Option<i64>,
    /// Sanitized display name.
    pub filename: String,
    /// Filename as uploaded.
    pub original_name: String,
    /// Payload size in bytes.
    pub size: i64,
    /// MIME type.
    pub mime_type: String,
    /// SHA-256 hex digest of the payload as first uploaded.
    pub content_hash: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the file was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Analysis summary.
    pub summary: Option<String>,
    /// Analysis tags (JSON array).
    pub tags: Option<String>,
    /// Analysis embedding (little-endian f32).
    pub embedding: Option<Vec<u8>>,
    /// Upload time.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

impl FileMetadata {
    /// Decoded analysis tags; empty when none are stored.
    pub fn tags(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .map(codec::decode_tags)
            .unwrap_or_default()
    }

    /// Decoded analysis embedding; empty when none is stored.
    pub fn embedding(&self) -> Vec<f32> {
        self.embedding
            .as_deref()
            .map(codec::decode_embedding)
            .unwrap_or_default()
    }
}

/// Data for inserting a new file.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Owner.
    pub user_id: i64,
    /// Containing folder.
    pub folder_id: Option<i64>,
    /// Sanitized display name.
    pub filename: String,
    /// Filename as uploaded.
    pub original_name: String,
    /// MIME type.
    pub mime_type: String,
    /// Payload.
    pub content: Vec<u8>,
    /// Payload digest.
    pub content_hash: Option<String>,
}

impl NewFile {
    /// Create a new file record at the user's root.
    pub fn new(
        user_id: i64,
        filename: impl Into<String>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        Self {
            user_id,
            folder_id: None,
            filename: filename.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
            content,
            content_hash: None,
        }
    }

    /// Place the file in a folder.
    pub fn with_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }

    /// Set the payload digest.
    pub fn with_hash(mut self, hash: impl Into<String>) -> Self {
        self.content_hash = Some(hash.into());
        self
    }
}

/// Repository for file record queries.
pub struct FileRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a file record.
    pub async fn create(&self, file: &NewFile) -> Result<FileMetadata> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO files (user_id, folder_id, filename, original_name, size, mime_type,
                                content, content_hash, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(file.user_id)
        .bind(file.folder_id)
        .bind(&file.filename)
        .bind(&file.original_name)
        .bind(file.content.len() as i64)
        .bind(&file.mime_type)
        .bind(&file.content)
        .bind(&file.content_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_owned(file.user_id, id)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("file".to_string()))
    }

    /// Get a file owned by `user_id` in any state.
    pub async fn get_owned(&self, user_id: i64, id: i64) -> Result<Option<FileMetadata>> {
        let query = format!("SELECT {FILE_COLUMNS} FROM files WHERE id = ? AND user_id = ?");
        let file = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Get a file owned by `user_id` whose delete flag equals `deleted`.
    pub async fn get_in_state(
        &self,
        user_id: i64,
        id: i64,
        deleted: bool,
    ) -> Result<Option<FileMetadata>> {
        Ok(self
            .get_owned(user_id, id)
            .await?
            .filter(|file| file.is_deleted == deleted))
    }

    /// Get the payload of a live file owned by `user_id`.
    pub async fn get_content(&self, user_id: i64, id: i64) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> = sqlx::query_as(
            "SELECT content FROM files WHERE id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(row.map(|r| r.0))
    }

    /// List live files in a folder (None = root), newest first.
    pub async fn list_active_in(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
    ) -> Result<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND folder_id IS ? AND is_deleted = 0
             ORDER BY created_at DESC, id DESC"
        );
        let files = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(user_id)
            .bind(folder_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List every live file of a user.
    pub async fn list_active(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND is_deleted = 0 ORDER BY created_at, id"
        );
        let files = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List live files that carry a digest, oldest first.
    pub async fn list_active_hashed(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND is_deleted = 0 AND content_hash IS NOT NULL
             ORDER BY created_at, id"
        );
        let files = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List soft-deleted files, most recently deleted first.
    pub async fn list_deleted(&self, user_id: i64) -> Result<Vec<FileMetadata>> {
        let query = format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE user_id = ? AND is_deleted = 1 ORDER BY deleted_at DESC, id DESC"
        );
        let files = sqlx::query_as::<_, FileMetadata>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Move a live file to another folder. Returns false if nothing matched.
    pub async fn set_folder(&self, user_id: i64, id: i64, folder_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET folder_id = ?, updated_at = ?
             WHERE id = ? AND user_id = ? AND is_deleted = 0",
        )
        .bind(folder_id)
        .bind(Utc::now())
        .bind(id)
        .bind(user_id)
        .execute(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Flip a file's delete state. Returns false if the file was not owned
    /// or not in the opposite state.
    pub async fn set_deleted(&self, user_id: i64, id: i64, deleted: bool) -> Result<bool> {
        let now = Utc::now();
        let deleted_at = deleted.then_some(now);
        let result = sqlx::query(
            "UPDATE files SET is_deleted = ?, deleted_at = ?, updated_at = ?
             WHERE id = ? AND user_id = ? AND is_deleted = ?",
        )
        .bind(deleted)
        .bind(deleted_at)
        .bind(now)
        .bind(id)
        .bind(user_id)
        .bind(!deleted)
        .execute(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
