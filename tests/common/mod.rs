//! Test helpers for integration tests.
//!
//! Provides database setup, user creation, and a recording analysis
//! collaborator.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use localcloud::config::StorageConfig;
use localcloud::{
    AnalysisCollaborator, AnalysisOutcome, Database, Enricher, FileService, LocalCloudError,
    NewUser, Result, UserRepository,
};

/// One megabyte.
pub const MB: usize = 1024 * 1024;

/// Timeout handed to the enricher in tests.
pub const ENRICH_TIMEOUT: Duration = Duration::from_secs(2);

/// Calls seen by [`RecordingCollaborator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Process { file_id: i64, len: usize },
    Remove { file_id: i64 },
}

/// Collaborator that records calls and answers from a script.
#[derive(Default)]
pub struct RecordingCollaborator {
    calls: Mutex<Vec<Call>>,
    outcome: Mutex<Option<AnalysisOutcome>>,
}

impl RecordingCollaborator {
    /// A collaborator that always fails.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A collaborator that answers every call with `outcome`.
    pub fn answering(outcome: AnalysisOutcome) -> Arc<Self> {
        let collaborator = Self::default();
        *collaborator.outcome.lock().unwrap() = Some(outcome);
        Arc::new(collaborator)
    }

    /// Change the scripted answer.
    pub fn set_outcome(&self, outcome: Option<AnalysisOutcome>) {
        *self.outcome.lock().unwrap() = outcome;
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisCollaborator for RecordingCollaborator {
    async fn process(
        &self,
        file_id: i64,
        _user_id: i64,
        bytes: &[u8],
        _filename: &str,
    ) -> Result<AnalysisOutcome> {
        self.calls.lock().unwrap().push(Call::Process {
            file_id,
            len: bytes.len(),
        });
        self.outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| LocalCloudError::CollaboratorUnavailable("offline".to_string()))
    }

    async fn remove_index_entry(&self, file_id: i64) -> Result<()> {
        self.calls.lock().unwrap().push(Call::Remove { file_id });
        Err(LocalCloudError::CollaboratorUnavailable("offline".to_string()))
    }

    async fn is_available(&self) -> bool {
        self.outcome.lock().unwrap().is_some()
    }
}

/// Create an in-memory database.
pub async fn setup_db() -> Database {
    Database::open_in_memory()
        .await
        .expect("Failed to create test database")
}

/// Create a user, optionally with a storage ceiling in MB.
pub async fn create_user(db: &Database, username: &str, limit_mb: Option<i64>) -> i64 {
    let mut new_user = NewUser::new(username);
    if let Some(limit) = limit_mb {
        new_user = new_user.with_storage_limit_mb(limit);
    }
    UserRepository::new(db.pool())
        .create(&new_user)
        .await
        .expect("Failed to create user")
        .id
}

/// A file service without analysis and with no per-upload cap.
pub async fn setup_service() -> FileService {
    let db = setup_db().await;
    FileService::new(db, &uncapped_storage())
}

/// A file service wired to `collaborator`.
pub async fn setup_service_with(collaborator: Arc<dyn AnalysisCollaborator>) -> FileService {
    let db = setup_db().await;
    FileService::new(db, &uncapped_storage())
        .with_enricher(Enricher::new(collaborator, ENRICH_TIMEOUT))
}

fn uncapped_storage() -> StorageConfig {
    StorageConfig {
        default_quota_mb: 0,
        max_upload_size_mb: 0,
    }
}
