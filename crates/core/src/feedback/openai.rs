use crate::config::{endpoint, ApiKey, FeedbackConfig};
use crate::feedback::{build_messages, ChatMessage, FeedbackClient, FeedbackError, FeedbackRequest};
use crate::util::{retry_with_backoff, RetryConfig};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

const LOG_TARGET: &str = "feedback::openai";

/// Chat-completions client that turns an emotion transcript into coaching text.
#[derive(Clone)]
pub struct OpenAiFeedbackClient {
    client: Client,
    api_key: ApiKey,
    base_url: Url,
    model: String,
    retry: RetryConfig,
}

impl OpenAiFeedbackClient {
    pub fn new(api_key: ApiKey, config: &FeedbackConfig) -> Result<Self, FeedbackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(180))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            retry: RetryConfig::default(),
        })
    }

    #[cfg(test)]
    fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn complete(&self, body: &ChatRequest<'_>) -> Result<String, FeedbackError> {
        let response = self
            .client
            .post(endpoint(&self.base_url, "chat/completions"))
            .bearer_auth(self.api_key.expose())
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(FeedbackError::HttpStatus(status.as_u16(), error_text));
        }

        let bytes = response.bytes().await?;
        let parsed: ChatResponse = serde_json::from_slice(&bytes)
            .map_err(|e| FeedbackError::InvalidResponse(format!("failed to parse JSON: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| FeedbackError::InvalidResponse("no message content in response".to_owned()))
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl FeedbackClient for OpenAiFeedbackClient {
    fn feedback(&self, request: FeedbackRequest) -> BoxFuture<'_, Result<String, FeedbackError>> {
        async move {
            let messages = build_messages(request.kind, &request.transcript);
            let body = ChatRequest {
                model: &self.model,
                messages: &messages,
            };
            tracing::info!(
                target: LOG_TARGET,
                model = %self.model,
                kind = %request.kind,
                transcript_bytes = request.transcript.len(),
                "requesting feedback"
            );
            let text = retry_with_backoff(
                &self.retry,
                || self.complete(&body),
                FeedbackError::is_retryable,
            )
            .await?;
            tracing::info!(target: LOG_TARGET, chars = text.len(), "feedback received");
            Ok(text)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_base_url;
    use crate::feedback::FeedbackKind;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiFeedbackClient {
        let config = FeedbackConfig {
            base_url: parse_base_url(&server.uri()).expect("mock url"),
            ..FeedbackConfig::default()
        };
        OpenAiFeedbackClient::new(ApiKey::new("sk-test").expect("key"), &config)
            .expect("client")
            .with_retry(RetryConfig::new(2, Duration::from_millis(1)))
    }

    fn request() -> FeedbackRequest {
        FeedbackRequest {
            kind: FeedbackKind::Presentation,
            transcript: "[]".into(),
        }
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "gpt-4o" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "index": 0, "message": { "role": "assistant", "content": "Nice pacing." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).feedback(request()).await.expect("feedback");
        assert_eq!(text, "Nice pacing.");
    }

    #[tokio::test]
    async fn empty_choices_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).feedback(request()).await.unwrap_err();
        assert!(matches!(err, FeedbackError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let err = client_for(&server).feedback(request()).await.unwrap_err();
        assert!(matches!(err, FeedbackError::HttpStatus(400, _)));
    }
}
