//! Best-effort enrichment runner.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use super::codec::{encode_embedding, encode_tags};
use super::AnalysisCollaborator;
use crate::file::FileMetadata;

/// Runs analysis calls with a hard timeout and stores their results.
///
/// Payload analysis is bounded by the process timeout. Index removal and the
/// availability check are bounded by the shorter request timeout.
///
/// Nothing here returns an error. Failures are logged at `warn` and the
/// caller carries on.
#[derive(Clone)]
pub struct Enricher {
    collaborator: Option<Arc<dyn AnalysisCollaborator>>,
    process_timeout: Duration,
    request_timeout: Duration,
}

impl Enricher {
    /// Create an enricher around a collaborator. `timeout` bounds every call
    /// until [`Enricher::with_request_timeout`] sets a separate one for
    /// metadata-sized calls.
    pub fn new(collaborator: Arc<dyn AnalysisCollaborator>, timeout: Duration) -> Self {
        Self {
            collaborator: Some(collaborator),
            process_timeout: timeout,
            request_timeout: timeout,
        }
    }

    /// Bound index removal and the availability check by `timeout`.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// An enricher that never calls out.
    pub fn disabled() -> Self {
        Self {
            collaborator: None,
            process_timeout: Duration::ZERO,
            request_timeout: Duration::ZERO,
        }
    }

    /// Whether a collaborator is configured.
    pub fn is_enabled(&self) -> bool {
        self.collaborator.is_some()
    }

    /// Analyse `bytes` for `file` and store the outcome.
    ///
    /// The write only lands if the file is still live and still holds the
    /// analysed payload. Returns true if results were stored.
    pub async fn enrich(&self, pool: &SqlitePool, file: &FileMetadata, bytes: &[u8]) -> bool {
        let Some(ref collaborator) = self.collaborator else {
            return false;
        };

        let call = collaborator.process(file.id, file.user_id, bytes, &file.original_name);
        let outcome = match tokio::time::timeout(self.process_timeout, call).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                warn!(file_id = file.id, "Enrichment failed: {}", e);
                return false;
            }
            Err(_) => {
                warn!(
                    file_id = file.id,
                    timeout_secs = self.process_timeout.as_secs(),
                    "Enrichment timed out"
                );
                return false;
            }
        };

        let result = sqlx::query(
            "UPDATE files SET summary = ?, tags = ?, embedding = ?, updated_at = ?
             WHERE id = ? AND content = ? AND is_deleted = 0",
        )
        .bind(&outcome.summary)
        .bind(encode_tags(&outcome.tags))
        .bind(encode_embedding(&outcome.embedding))
        .bind(Utc::now())
        .bind(file.id)
        .bind(bytes)
        .execute(pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => {
                info!(
                    file_id = file.id,
                    tags = outcome.tags.len(),
                    dims = outcome.embedding.len(),
                    "File enriched"
                );
                true
            }
            Ok(_) => {
                debug!(file_id = file.id, "File changed during enrichment; result dropped");
                false
            }
            Err(e) => {
                warn!(file_id = file.id, "Failed to store enrichment: {}", e);
                false
            }
        }
    }

    /// Ask the collaborator to drop its index entry for a file.
    pub async fn forget(&self, file_id: i64) {
        let Some(ref collaborator) = self.collaborator else {
            return;
        };

        let call = collaborator.remove_index_entry(file_id);
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(Ok(())) => debug!(file_id, "Analysis index entry removed"),
            Ok(Err(e)) => warn!(file_id, "Index removal failed: {}", e),
            Err(_) => warn!(file_id, "Index removal timed out"),
        }
    }

    /// Whether the collaborator answers its availability check.
    pub async fn is_available(&self) -> bool {
        let Some(ref collaborator) = self.collaborator else {
            return false;
        };

        tokio::time::timeout(self.request_timeout, collaborator.is_available())
            .await
            .unwrap_or(false)
    }
}
