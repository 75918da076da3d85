mod dummy;
mod openai;

use crate::config::ConfigError;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

pub use dummy::DummyFeedbackClient;
pub use openai::OpenAiFeedbackClient;

/// The coaching scenario the feedback is written for.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FeedbackKind {
    OneOnOne,
    #[default]
    Presentation,
}

impl FeedbackKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::OneOnOne => "one-on-one",
            FeedbackKind::Presentation => "presentation",
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedbackKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "one-on-one" | "one_on_one" | "1:1" => Ok(FeedbackKind::OneOnOne),
            "presentation" => Ok(FeedbackKind::Presentation),
            _ => Err(ConfigError::UnknownFeedbackKind(s.to_owned())),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// An emotion transcript to be turned into coaching feedback. `transcript`
/// is passed through verbatim.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackRequest {
    pub kind: FeedbackKind,
    pub transcript: String,
}

#[derive(thiserror::Error, Debug)]
pub enum FeedbackError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http error {0}: {1}")]
    HttpStatus(u16, String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl FeedbackError {
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedbackError::Http(e) => e.is_timeout() || e.is_connect(),
            FeedbackError::HttpStatus(status, _) => crate::util::is_http_retryable(*status),
            FeedbackError::InvalidResponse(_) => false,
        }
    }
}

pub trait FeedbackClient: Send + Sync {
    fn feedback(&self, request: FeedbackRequest) -> BoxFuture<'_, Result<String, FeedbackError>>;
}

const ONE_ON_ONE_SYSTEM: &str = "You are an executive coach who gives feedback to managers. \
Analyze the conversation in the JSON transcript, which includes emotion analysis of the voice, \
the words and the facial expressions. Help the user grow their emotional intelligence by pointing \
out interactions and trends they might have missed. Structure the feedback as: 1. A summary of the \
conversation. 2. What went well. 3. What did not go well. 4. Insights or trends the user may have missed.";

const PRESENTATION_SYSTEM: &str = "You are an executive coach who gives feedback to public \
speakers. Analyze the presentation in the JSON transcript, which includes emotion analysis of the \
voice, the words and the physical expression. Help the user understand how they come across and \
grow their emotional intelligence by pointing out moments, trends and behaviors they may have \
missed. Structure the feedback as: what went well, what to improve, and behaviors the speaker may \
have overlooked.";

const ONE_ON_ONE_GUIDANCE: &str = "Keep the feedback constructive and actionable, citing specific \
moments from the transcript where relevant. Explain what went well, what did not, and which \
insights or trends the manager may have missed.";

const PRESENTATION_GUIDANCE: &str = "Keep the feedback constructive and actionable, citing \
specific moments from the transcript where relevant. Explain what went well, what did not, and \
which behaviors the presenter may have missed.";

/// System prompt, user request carrying the transcript, and assistant guidance.
pub fn build_messages(kind: FeedbackKind, transcript: &str) -> Vec<ChatMessage> {
    let (system, user, guidance) = match kind {
        FeedbackKind::OneOnOne => (
            ONE_ON_ONE_SYSTEM,
            format!(
                "Analyze the following JSON transcript of a conversation. Provide a summary of \
the conversation, what was done well and what was not done well. JSON transcript: {transcript}"
            ),
            ONE_ON_ONE_GUIDANCE,
        ),
        FeedbackKind::Presentation => (
            PRESENTATION_SYSTEM,
            format!(
                "Analyze the following JSON transcript of a presentation. Provide feedback on \
what was done well and what was not done well. JSON transcript of the video analysis: {transcript}"
            ),
            PRESENTATION_GUIDANCE,
        ),
    };

    vec![
        ChatMessage::new(Role::System, system),
        ChatMessage::new(Role::User, user),
        ChatMessage::new(Role::Assistant, guidance),
    ]
}
