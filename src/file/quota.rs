//! Per-user storage accounting.
//!
//! Usage counts every stored byte: live files, soft-deleted files, and all
//! archived versions. Only a permanent delete gives space back.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::db::UserRepository;
use crate::{LocalCloudError, Result};

const BYTES_PER_MB: i64 = 1024 * 1024;

/// A resolved storage ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "bytes", rename_all = "snake_case")]
pub enum StorageLimit {
    /// At most this many bytes.
    Bounded(i64),
    /// No ceiling.
    Unbounded,
}

impl StorageLimit {
    /// Resolve the ceiling: the account value if positive, else the default
    /// if positive, else unbounded.
    pub fn resolve(account_mb: Option<i64>, default_mb: i64) -> Self {
        match account_mb.filter(|mb| *mb > 0) {
            Some(mb) => Self::Bounded(mb.saturating_mul(BYTES_PER_MB)),
            None if default_mb > 0 => Self::Bounded(default_mb.saturating_mul(BYTES_PER_MB)),
            None => Self::Unbounded,
        }
    }

    /// The ceiling in bytes, if bounded.
    pub fn bytes(&self) -> Option<i64> {
        match self {
            Self::Bounded(bytes) => Some(*bytes),
            Self::Unbounded => None,
        }
    }
}

/// Stored bytes for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes held by current payloads, live or soft-deleted.
    pub file_bytes: i64,
    /// Bytes held by archived versions.
    pub version_bytes: i64,
}

impl StorageUsage {
    /// Everything counted against the ceiling.
    pub fn total(&self) -> i64 {
        self.file_bytes + self.version_bytes
    }
}

/// Storage ledger for all users, with the process-wide default ceiling.
pub struct QuotaLedger<'a> {
    pool: &'a SqlitePool,
    default_quota_mb: i64,
}

impl<'a> QuotaLedger<'a> {
    /// Create a ledger. `default_quota_mb <= 0` means no default ceiling.
    pub fn new(pool: &'a SqlitePool, default_quota_mb: i64) -> Self {
        Self {
            pool,
            default_quota_mb,
        }
    }

    /// Bytes stored by the user, split between files (any state) and versions.
    pub async fn usage(&self, user_id: i64) -> Result<StorageUsage> {
        let files: (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(size), 0) FROM files WHERE user_id = ?")
                .bind(user_id)
                .fetch_one(self.pool)
                .await
                .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        let versions: (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(v.size), 0)
             FROM file_versions v JOIN files f ON f.id = v.file_id
             WHERE f.user_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| LocalCloudError::Database(e.to_string()))?;

        Ok(StorageUsage {
            file_bytes: files.0,
            version_bytes: versions.0,
        })
    }

    /// Bytes stored by the user across files (any state) and versions.
    pub async fn current_usage_bytes(&self, user_id: i64) -> Result<i64> {
        Ok(self.usage(user_id).await?.total())
    }

    /// The user's resolved ceiling.
    pub async fn limit_bytes(&self, user_id: i64) -> Result<StorageLimit> {
        let account_mb = UserRepository::new(self.pool)
            .get_by_id(user_id)
            .await?
            .and_then(|user| user.storage_limit_mb);

        Ok(StorageLimit::resolve(account_mb, self.default_quota_mb))
    }

    /// Fail with `QuotaExceeded` if storing `bytes_to_add` more bytes would
    /// push the user past their ceiling.
    pub async fn ensure_available(&self, user_id: i64, bytes_to_add: i64) -> Result<()> {
        if bytes_to_add <= 0 {
            return Ok(());
        }

        let StorageLimit::Bounded(limit) = self.limit_bytes(user_id).await? else {
            return Ok(());
        };

        let usage = self.current_usage_bytes(user_id).await?;
        debug!(user_id, usage, limit, bytes_to_add, "Quota check");

        if usage.saturating_add(bytes_to_add) > limit {
            return Err(LocalCloudError::QuotaExceeded {
                available: (limit - usage).max(0),
                attempted: bytes_to_add,
            });
        }

        Ok(())
    }
}
