//! HTTP client for the analysis service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{AnalysisCollaborator, AnalysisOutcome};
use crate::config::AnalysisConfig;
use crate::{LocalCloudError, Result};

/// User agent string for analysis calls.
const USER_AGENT: &str = "LocalCloud/0.1 (analysis client)";

#[derive(Debug, Deserialize)]
struct ProcessResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(flatten)]
    outcome: AnalysisOutcome,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Analysis collaborator backed by the HTTP analysis service.
pub struct HttpAnalysisClient {
    client: Client,
    base_url: Url,
    request_timeout: Duration,
    process_timeout: Duration,
}

impl HttpAnalysisClient {
    /// Create a client from configuration.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)
            .map_err(|e| LocalCloudError::Config(format!("invalid analysis.base_url: {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                LocalCloudError::CollaboratorUnavailable(format!("failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url,
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            process_timeout: Duration::from_secs(config.process_timeout_secs),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| LocalCloudError::Config(format!("invalid analysis endpoint {path}: {e}")))
    }
}

fn unavailable(context: &str, e: impl std::fmt::Display) -> LocalCloudError {
    LocalCloudError::CollaboratorUnavailable(format!("{context}: {e}"))
}

#[async_trait]
impl AnalysisCollaborator for HttpAnalysisClient {
    async fn process(
        &self,
        file_id: i64,
        user_id: i64,
        bytes: &[u8],
        filename: &str,
    ) -> Result<AnalysisOutcome> {
        let url = self.endpoint("api/ai/process")?;
        let form = Form::new()
            .text("file_id", file_id.to_string())
            .text("user_id", user_id.to_string())
            .text("filename", filename.to_string())
            .part("file", Part::bytes(bytes.to_vec()).file_name(filename.to_string()));

        debug!(file_id, bytes = bytes.len(), "Sending payload for analysis");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .timeout(self.process_timeout)
            .send()
            .await
            .map_err(|e| unavailable("analysis request failed", e))?;

        if !response.status().is_success() {
            return Err(unavailable("analysis HTTP error", response.status()));
        }

        let body: ProcessResponse = response
            .json()
            .await
            .map_err(|e| unavailable("malformed analysis response", e))?;

        if !body.success {
            return Err(LocalCloudError::CollaboratorUnavailable(
                body.error.unwrap_or_else(|| "analysis reported failure".to_string()),
            ));
        }

        Ok(body.outcome)
    }

    async fn remove_index_entry(&self, file_id: i64) -> Result<()> {
        let url = self.endpoint(&format!("api/ai/index/{file_id}"))?;
        let response = self
            .client
            .delete(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| unavailable("index removal failed", e))?;

        // Nothing indexed is as good as removed.
        if response.status().is_success() || response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(unavailable("index removal HTTP error", response.status()))
    }

    async fn is_available(&self) -> bool {
        let Ok(url) = self.endpoint("health") else {
            return false;
        };

        let response = match self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Analysis health check returned {}", response.status());
                return false;
            }
            Err(e) => {
                debug!("Analysis health check failed: {}", e);
                return false;
            }
        };

        match response.json::<HealthResponse>().await {
            Ok(health) => health.status == "healthy",
            Err(_) => false,
        }
    }
}
