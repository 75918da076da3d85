use crate::feedback::{FeedbackClient, FeedbackError, FeedbackRequest};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Stand-in used when feedback is disabled; always answers with empty text.
#[derive(Clone, Debug, Default)]
pub struct DummyFeedbackClient;

impl DummyFeedbackClient {
    pub fn new() -> Self {
        Self
    }
}

impl FeedbackClient for DummyFeedbackClient {
    fn feedback(&self, _request: FeedbackRequest) -> BoxFuture<'_, Result<String, FeedbackError>> {
        async move { Ok(String::new()) }.boxed()
    }
}
