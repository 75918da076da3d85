use crate::config::{endpoint, ApiKey, HumeConfig, PollSettings};
use crate::hume::{HumeError, InferenceService, JobStatus, ModelKind};
use crate::util::{retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

const LOG_TARGET: &str = "hume::batch";
const API_KEY_HEADER: &str = "X-Hume-Api-Key";

/// Client for the batch job API: submit a file, poll until the job settles,
/// fetch its predictions.
#[derive(Clone)]
pub struct HumeBatchClient {
    client: Client,
    api_key: ApiKey,
    base_url: Url,
    poll: PollSettings,
    retry: RetryConfig,
}

#[derive(Deserialize)]
struct SubmitResponse {
    job_id: String,
}

#[derive(Deserialize)]
struct JobDetails {
    state: JobState,
}

#[derive(Deserialize)]
struct JobState {
    status: String,
    #[serde(default)]
    message: Option<String>,
}

impl HumeBatchClient {
    pub fn new(api_key: ApiKey, config: &HumeConfig) -> Result<Self, HumeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            poll: config.poll,
            retry: RetryConfig::default(),
        })
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub async fn submit_job(&self, path: &Path, model: ModelKind) -> Result<String, HumeError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| HumeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let size = bytes.len();

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("json", model.job_models().to_string());

        let response = self
            .client
            .post(endpoint(&self.base_url, "batch/jobs"))
            .header(API_KEY_HEADER, self.api_key.expose())
            .multipart(form)
            .send()
            .await?;
        let submitted: SubmitResponse = read_json(response).await?;

        tracing::info!(
            target: LOG_TARGET,
            job_id = %submitted.job_id,
            model = model.name(),
            bytes = size,
            "job submitted"
        );
        Ok(submitted.job_id)
    }

    pub async fn job_status(&self, job_id: &str) -> Result<JobStatus, HumeError> {
        let url = endpoint(&self.base_url, &format!("batch/jobs/{job_id}"));
        let details: JobDetails =
            retry_with_backoff(&self.retry, || self.get_json(&url), HumeError::is_retryable)
                .await?;
        Ok(JobStatus::parse(&details.state.status, details.state.message))
    }

    pub async fn predictions(&self, job_id: &str) -> Result<serde_json::Value, HumeError> {
        let url = endpoint(&self.base_url, &format!("batch/jobs/{job_id}/predictions"));
        retry_with_backoff(&self.retry, || self.get_json(&url), HumeError::is_retryable).await
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, HumeError> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.api_key.expose())
            .send()
            .await?;
        read_json(response).await
    }

    /// Polls until the job completes, fails, or the poll timeout passes.
    pub async fn wait_for_completion(&self, job_id: &str, model: ModelKind) -> Result<(), HumeError> {
        let started = Instant::now();
        loop {
            let status = self.job_status(job_id).await?;
            tracing::info!(target: LOG_TARGET, job_id, model = model.name(), ?status, "job status");
            if status.is_terminal() {
                return match status {
                    JobStatus::Failed(message) => Err(HumeError::JobFailed {
                        job_id: job_id.to_owned(),
                        message: message.unwrap_or_else(|| "no reason given".to_owned()),
                    }),
                    _ => Ok(()),
                };
            }

            let waited = started.elapsed();
            if waited + self.poll.interval > self.poll.timeout {
                return Err(HumeError::Timeout {
                    job_id: job_id.to_owned(),
                    waited,
                });
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }
}

impl InferenceService for HumeBatchClient {
    fn analyze(
        &self,
        path: PathBuf,
        model: ModelKind,
    ) -> BoxFuture<'_, Result<serde_json::Value, HumeError>> {
        async move {
            let job_id = self.submit_job(&path, model).await?;
            self.wait_for_completion(&job_id, model).await?;
            let predictions = self.predictions(&job_id).await?;
            tracing::info!(target: LOG_TARGET, job_id = %job_id, model = model.name(), "predictions fetched");
            Ok(predictions)
        }
        .boxed()
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(response: Response) -> Result<T, HumeError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_owned());
        return Err(HumeError::HttpStatus(status.as_u16(), body));
    }
    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| HumeError::InvalidResponse(format!("failed to parse JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use std::io::Write;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, interval_ms: u64, timeout_ms: u64) -> HumeBatchClient {
        let config = HumeConfig {
            base_url: parse_base_url(&server.uri()).expect("mock url"),
            poll: PollSettings {
                interval: Duration::from_millis(interval_ms),
                timeout: Duration::from_millis(timeout_ms),
            },
        };
        HumeBatchClient::new(ApiKey::new("test-key").expect("key"), &config)
            .expect("client")
            .with_retry(RetryConfig::new(2, Duration::from_millis(1)))
    }

    /// Matches requests whose raw body contains the given text.
    struct BodyContains(String);

    impl wiremock::Match for BodyContains {
        fn matches(&self, request: &wiremock::Request) -> bool {
            String::from_utf8_lossy(&request.body).contains(&self.0)
        }
    }

    fn body_contains(needle: impl Into<String>) -> BodyContains {
        BodyContains(needle.into())
    }

    fn media_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(b"RIFF....WAVE").expect("write");
        file
    }

    #[tokio::test]
    async fn submit_poll_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/jobs"))
            .and(header(API_KEY_HEADER, "test-key"))
            .and(body_contains("name=\"file\""))
            .and(body_contains("RIFF....WAVE"))
            .and(body_contains("name=\"json\""))
            .and(body_contains(r#""identify_speakers":true"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "job_id": "job-1" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                serde_json::json!({ "job_id": "job-1", "state": { "status": "COMPLETED" } }),
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-1/predictions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([{ "results": {} }])),
            )
            .mount(&server)
            .await;

        let file = media_file();
        let client = client_for(&server, 1, 1_000);
        let predictions = client
            .analyze(file.path().to_path_buf(), ModelKind::Prosody)
            .await
            .expect("analyze");
        assert_eq!(predictions, serde_json::json!([{ "results": {} }]));
    }

    #[tokio::test]
    async fn submission_carries_the_requested_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/jobs"))
            .and(body_contains(ModelKind::Face.job_models().to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "job_id": "job-face" })))
            .expect(1)
            .mount(&server)
            .await;

        let file = media_file();
        let client = client_for(&server, 1, 1_000);
        let job_id = client
            .submit_job(file.path(), ModelKind::Face)
            .await
            .expect("submit");
        assert_eq!(job_id, "job-face");

        // a prosody config is not accepted where face was mounted
        let err = client
            .submit_job(file.path(), ModelKind::Prosody)
            .await
            .unwrap_err();
        assert!(matches!(err, HumeError::HttpStatus(404, _)));
    }

    #[tokio::test]
    async fn failed_job_surfaces_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": { "status": "FAILED", "message": "unsupported media" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, 1, 1_000);
        let err = client
            .wait_for_completion("job-2", ModelKind::Face)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            HumeError::JobFailed { ref message, .. } if message == "unsupported media"
        ));
    }

    #[tokio::test]
    async fn stuck_job_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "state": { "status": "IN_PROGRESS" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, 5, 20);
        let err = client
            .wait_for_completion("job-3", ModelKind::Language)
            .await
            .unwrap_err();
        assert!(matches!(err, HumeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn rejected_submission_is_an_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/batch/jobs"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let file = media_file();
        let client = client_for(&server, 1, 1_000);
        let err = client
            .submit_job(file.path(), ModelKind::Prosody)
            .await
            .unwrap_err();
        assert!(matches!(err, HumeError::HttpStatus(401, ref body) if body == "bad key"));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-4/predictions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/batch/jobs/job-4/predictions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server, 1, 1_000);
        let predictions = client.predictions("job-4").await.expect("predictions");
        assert_eq!(predictions, serde_json::json!([]));
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let server = MockServer::start().await;
        let client = client_for(&server, 1, 1_000);
        let err = client
            .submit_job(Path::new("/definitely/not/here.wav"), ModelKind::Prosody)
            .await
            .unwrap_err();
        assert!(matches!(err, HumeError::Io { .. }));
    }
}
