//! Analysis collaborator: optional AI-derived summaries, tags and embeddings.
//!
//! The lifecycle engine never depends on this service for correctness. Every
//! call goes through [`Enricher`], which bounds it with a timeout and logs
//! failures instead of returning them.

mod client;
pub mod codec;
mod enrichment;

pub use client::HttpAnalysisClient;
pub use enrichment::Enricher;

use async_trait::async_trait;
use serde::Deserialize;

use crate::Result;

/// What the analysis service derived from a payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalysisOutcome {
    /// Short text summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Ordered tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Embedding vector.
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Contract with the external analysis service.
#[async_trait]
pub trait AnalysisCollaborator: Send + Sync {
    /// Analyse a payload.
    async fn process(
        &self,
        file_id: i64,
        user_id: i64,
        bytes: &[u8],
        filename: &str,
    ) -> Result<AnalysisOutcome>;

    /// Drop any index entry derived from a file.
    async fn remove_index_entry(&self, file_id: i64) -> Result<()>;

    /// Whether the service is reachable.
    async fn is_available(&self) -> bool;
}
