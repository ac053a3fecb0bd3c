//! Archived file versions.
//!
//! A version is written exactly once, from the file row, right before the
//! row's payload is replaced. See [`super::service::FileService::upload_version`].

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{LocalCloudError, Result};

/// Metadata of an archived version (payload excluded).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileVersion {
    /// Row ID.
    pub id: i64,
    /// Parent file.
    pub file_id: i64,
    /// Version number, starting at 1.
    pub version: i64,
    /// Payload size in bytes.
    pub size: i64,
    /// MIME type at archive time.
    pub mime_type: String,
    /// When the version was archived.
    pub created_at: DateTime<Utc>,
}

/// Repository for version queries.
///
/// Every method scopes by owner through a join on `files`.
pub struct VersionRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> VersionRepository<'a> {
    /// Create a new VersionRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List the versions of a file, oldest first.
    pub async fn list(&self, user_id: i64, file_id: i64) -> Result<Vec<FileVersion>> {
        let versions = sqlx::query_as::<_, FileVersion>(
            "SELECT v.id, v.file_id, v.version, v.size, v.mime_type, v.created_at
             FROM file_versions v JOIN files f ON f.id = v.file_id
             WHERE v.file_id = ? AND f.user_id = ?
             ORDER BY v.version",
        )
        .bind(file_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(versions)
    }

    /// Get one version with its payload.
    pub async fn get_with_content(
        &self,
        user_id: i64,
        file_id: i64,
        version: i64,
    ) -> Result<Option<(FileVersion, Vec<u8>)>> {
        let version_row = sqlx::query_as::<_, FileVersion>(
            "SELECT v.id, v.file_id, v.version, v.size, v.mime_type, v.created_at
             FROM file_versions v JOIN files f ON f.id = v.file_id
             WHERE v.file_id = ? AND v.version = ? AND f.user_id = ?",
        )
        .bind(file_id)
        .bind(version)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        let Some(version_row) = version_row else {
            return Ok(None);
        };

        let content: (Vec<u8>,) = sqlx::query_as("SELECT content FROM file_versions WHERE id = ?")
            .bind(version_row.id)
            .fetch_one(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(Some((version_row, content.0)))
    }
}
