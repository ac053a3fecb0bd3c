//! Folder types and repository for LocalCloud.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{LocalCloudError, Result};

const FOLDER_COLUMNS: &str =
    "id, user_id, parent_id, name, is_deleted, deleted_at, created_at, updated_at";

/// A folder owned by a user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Owner.
    pub user_id: i64,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
    /// Folder name, unique among live siblings.
    pub name: String,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// When the folder was soft-deleted.
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the folder was created.
    pub created_at: DateTime<Utc>,
    /// Last modification.
    pub updated_at: DateTime<Utc>,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Owner.
    pub user_id: i64,
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<i64>,
}

impl NewFolder {
    /// Create a new root folder for a user.
    pub fn new(user_id: i64, name: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            parent_id: None,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Repository for folder queries.
///
/// Subtree mutations live in [`super::tree::FolderTreeService`] because they
/// need a transaction.
pub struct FolderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a folder. Callers are expected to have validated the name.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO folders (user_id, parent_id, name, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(folder.user_id)
        .bind(folder.parent_id)
        .bind(&folder.name)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_owned(folder.user_id, id)
            .await?
            .ok_or_else(|| LocalCloudError::NotFound("folder".to_string()))
    }

    /// Get a folder owned by `user_id`, deleted or not.
    pub async fn get_owned(&self, user_id: i64, id: i64) -> Result<Option<Folder>> {
        let query = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ? AND user_id = ?");
        let folder = sqlx::query_as::<_, Folder>(&query)
            .bind(id)
            .bind(user_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// Get a live folder owned by `user_id`.
    pub async fn get_active(&self, user_id: i64, id: i64) -> Result<Option<Folder>> {
        Ok(self
            .get_owned(user_id, id)
            .await?
            .filter(|folder| !folder.is_deleted))
    }

    /// Find a live sibling with the given name under `parent_id` (None = root).
    pub async fn find_active_sibling(
        &self,
        user_id: i64,
        parent_id: Option<i64>,
        name: &str,
    ) -> Result<Option<Folder>> {
        let query = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE user_id = ? AND parent_id IS ? AND name = ? AND is_deleted = 0
             LIMIT 1"
        );
        let folder = sqlx::query_as::<_, Folder>(&query)
            .bind(user_id)
            .bind(parent_id)
            .bind(name)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List every live folder of a user.
    pub async fn list_active(&self, user_id: i64) -> Result<Vec<Folder>> {
        let query = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE user_id = ? AND is_deleted = 0 ORDER BY name, id"
        );
        let folders = sqlx::query_as::<_, Folder>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// List every folder of a user, including soft-deleted ones.
    pub async fn list_all(&self, user_id: i64) -> Result<Vec<Folder>> {
        let query = format!("SELECT {FOLDER_COLUMNS} FROM folders WHERE user_id = ? ORDER BY id");
        let folders = sqlx::query_as::<_, Folder>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// List soft-deleted folders, most recently deleted first.
    pub async fn list_deleted(&self, user_id: i64) -> Result<Vec<Folder>> {
        let query = format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE user_id = ? AND is_deleted = 1 ORDER BY deleted_at DESC, id DESC"
        );
        let folders = sqlx::query_as::<_, Folder>(&query)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Count live files per folder for a user.
    pub async fn live_file_counts(&self, user_id: i64) -> Result<HashMap<i64, i64>> {
        let rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT folder_id, COUNT(*) FROM files
             WHERE user_id = ? AND is_deleted = 0 AND folder_id IS NOT NULL
             GROUP BY folder_id",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(rows.into_iter().collect())
    }
}
