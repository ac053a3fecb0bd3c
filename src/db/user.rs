//! User model for LocalCloud.
//!
//! Users own folders and files. Authentication happens elsewhere; this
//! record only carries identity and the optional storage ceiling.

use chrono::{DateTime, Utc};

/// User entity representing a registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Account-specific storage ceiling in megabytes.
    ///
    /// `None` or a value `<= 0` means the process-wide default applies.
    pub storage_limit_mb: Option<i64>,
    /// Account creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last profile update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// The account-specific ceiling in bytes, if one is set and positive.
    pub fn storage_limit_bytes(&self) -> Option<i64> {
        self.storage_limit_mb
            .filter(|mb| *mb > 0)
            .map(|mb| mb.saturating_mul(1024 * 1024))
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Email address (optional).
    pub email: Option<String>,
    /// Storage ceiling in megabytes (optional).
    pub storage_limit_mb: Option<i64>,
}

impl NewUser {
    /// Create a new user with the required username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            email: None,
            storage_limit_mb: None,
        }
    }

    /// Set the email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Set the storage ceiling in megabytes.
    pub fn with_storage_limit_mb(mut self, limit_mb: i64) -> Self {
        self.storage_limit_mb = Some(limit_mb);
        self
    }
}

/// Data for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New email address.
    pub email: Option<Option<String>>,
    /// New storage ceiling (`Some(None)` clears it).
    pub storage_limit_mb: Option<Option<i64>>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new email.
    pub fn email(mut self, email: Option<String>) -> Self {
        self.email = Some(email);
        self
    }

    /// Set or clear the storage ceiling.
    pub fn storage_limit_mb(mut self, limit_mb: Option<i64>) -> Self {
        self.storage_limit_mb = Some(limit_mb);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.email.is_none() && self.storage_limit_mb.is_none()
    }
}
