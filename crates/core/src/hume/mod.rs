mod batch;

use crate::emotion::Modality;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use batch::HumeBatchClient;

/// Inference model run over one media file.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Prosody,
    Language,
    Face,
}

impl ModelKind {
    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::Prosody => "prosody",
            ModelKind::Language => "language",
            ModelKind::Face => "face",
        }
    }

    pub fn modality(&self) -> Modality {
        match self {
            ModelKind::Prosody => Modality::Audio,
            ModelKind::Language => Modality::Text,
            ModelKind::Face => Modality::Video,
        }
    }

    /// The `models` section of a batch job request for this model alone.
    pub fn job_models(&self) -> serde_json::Value {
        let config = match self {
            ModelKind::Prosody => serde_json::json!({
                "granularity": "utterance",
                "identify_speakers": true,
            }),
            ModelKind::Language => serde_json::json!({ "granularity": "utterance" }),
            ModelKind::Face => serde_json::json!({}),
        };
        serde_json::json!({ "models": { self.name(): config } })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    InProgress,
    Completed,
    Failed(Option<String>),
    Other(String),
}

impl JobStatus {
    pub fn parse(status: &str, message: Option<String>) -> Self {
        match status {
            "QUEUED" => JobStatus::Queued,
            "IN_PROGRESS" => JobStatus::InProgress,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed(message),
            other => JobStatus::Other(other.to_owned()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HumeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("job {job_id} did not complete within {waited:?}")]
    Timeout { job_id: String, waited: Duration },
}

impl HumeError {
    pub fn is_retryable(&self) -> bool {
        match self {
            HumeError::Http(e) => e.is_timeout() || e.is_connect(),
            HumeError::HttpStatus(status, _) => crate::util::is_http_retryable(*status),
            _ => false,
        }
    }
}

/// Runs one model over one file and returns the raw predictions payload.
pub trait InferenceService: Send + Sync {
    fn analyze(
        &self,
        path: PathBuf,
        model: ModelKind,
    ) -> BoxFuture<'_, Result<serde_json::Value, HumeError>>;
}
