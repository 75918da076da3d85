use crate::feedback::FeedbackKind;
use crate::sync::SyncOptions;
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_HUME_BASE_URL: &str = "https://api.hume.ai/v0";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_FEEDBACK_MODEL: &str = "gpt-4o";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 900;
pub const DEFAULT_OUTPUT_DIR: &str = ".";
pub const ENV_HUME_API_KEY: &str = "HUME_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_HUME_BASE_URL: &str = "HUME_BASE_URL";
pub const ENV_OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKeys {
    pub hume: Option<ApiKey>,
    pub openai: Option<ApiKey>,
}

/// Media files for one recorded interaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingInputs {
    pub audio: PathBuf,
    pub transcript: Option<PathBuf>,
    pub video: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollSettings {
    pub fn new(interval_secs: u64, timeout_secs: u64) -> Result<Self, ConfigError> {
        if interval_secs == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(Self {
            interval: Duration::from_secs(interval_secs),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_POLL_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HumeConfig {
    pub base_url: Url,
    pub poll: PollSettings,
}

impl Default for HumeConfig {
    fn default() -> Self {
        Self {
            base_url: default_url(DEFAULT_HUME_BASE_URL),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub kind: FeedbackKind,
    pub model: String,
    pub base_url: Url,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            kind: FeedbackKind::default(),
            model: DEFAULT_FEEDBACK_MODEL.to_owned(),
            base_url: default_url(DEFAULT_OPENAI_BASE_URL),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AnalysisMode {
    /// Audio, transcript and video fused into synchronized records.
    #[default]
    Fused,
    /// Prosody only, summarized per utterance.
    ProsodyOnly,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub inputs: RecordingInputs,
    pub api_keys: ApiKeys,
    pub hume: HumeConfig,
    pub feedback: FeedbackConfig,
    pub sync: SyncOptions,
    pub output_dir: PathBuf,
    pub mode: AnalysisMode,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("{0} is required")]
    MissingApiKey(&'static str),
    #[error("poll interval must be > 0 s")]
    ZeroPollInterval,
    #[error("top-k must be at least 1")]
    ZeroTopK,
    #[error("invalid base url {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("unknown feedback kind {0:?}, expected one-on-one or presentation")]
    UnknownFeedbackKind(String),
}

pub fn parse_base_url(value: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value).map_err(|e| ConfigError::InvalidBaseUrl {
        url: value.to_owned(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidBaseUrl {
            url: value.to_owned(),
            reason: "expected an http(s) url".to_owned(),
        });
    }
    Ok(url)
}

/// `base` joined with `path`, keeping any path prefix the base already has.
pub fn endpoint(base: &Url, path: &str) -> String {
    format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

fn default_url(value: &str) -> Url {
    match Url::parse(value) {
        Ok(url) => url,
        Err(e) => unreachable!("built-in url {value} is invalid: {e}"),
    }
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value.or_else(|| env.var(env_key)) {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => Ok(None),
    }
}

/// Unwraps a key that the chosen run needs, naming its env var when absent.
pub fn require_api_key(key: Option<ApiKey>, env_key: &'static str) -> Result<ApiKey, ConfigError> {
    key.ok_or(ConfigError::MissingApiKey(env_key))
}

pub fn sync_options(top_k: usize) -> Result<SyncOptions, ConfigError> {
    if top_k == 0 {
        return Err(ConfigError::ZeroTopK);
    }
    Ok(SyncOptions { top_k })
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    cli_value
        .or_else(|| env.var(env_key))
        .unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_cli_takes_precedence_over_env() {
        let env = MapEnv::default().with_var(ENV_HUME_API_KEY, "env-key");
        let key = resolve_api_key(Some("cli-key".to_owned()), ENV_HUME_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "cli-key");
    }

    #[test]
    fn api_key_env_used_when_cli_missing() {
        let env = MapEnv::default().with_var(ENV_OPENAI_API_KEY, "env-key");
        let key = resolve_api_key(None, ENV_OPENAI_API_KEY, &env)
            .expect("valid key")
            .expect("present");
        assert_eq!(key.expose(), "env-key");
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let env = MapEnv::default().with_var(ENV_HUME_API_KEY, "   ");
        assert_eq!(
            resolve_api_key(None, ENV_HUME_API_KEY, &env),
            Err(ConfigError::EmptyApiKey)
        );
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("secret").expect("valid");
        assert_eq!(format!("{key:?}"), "ApiKey(**redacted**)");
    }

    #[test]
    fn string_resolution_order() {
        let env = MapEnv::default().with_var(ENV_HUME_BASE_URL, "env");
        assert_eq!(
            resolve_string_with_default(Some("cli".into()), ENV_HUME_BASE_URL, &env, "def"),
            "cli"
        );
        assert_eq!(
            resolve_string_with_default(None, ENV_HUME_BASE_URL, &env, "def"),
            "env"
        );
        assert_eq!(
            resolve_string_with_default(None, ENV_HUME_BASE_URL, &MapEnv::default(), "def"),
            "def"
        );
    }

    #[test]
    fn poll_interval_must_be_positive() {
        assert_eq!(PollSettings::new(0, 10), Err(ConfigError::ZeroPollInterval));
        let p = PollSettings::new(2, 30).expect("valid");
        assert_eq!(p.interval, Duration::from_secs(2));
    }

    #[test]
    fn missing_required_key_names_its_variable() {
        assert_eq!(
            require_api_key(None, ENV_HUME_API_KEY),
            Err(ConfigError::MissingApiKey(ENV_HUME_API_KEY))
        );
        let err = require_api_key(None, ENV_OPENAI_API_KEY).unwrap_err();
        assert_eq!(err.to_string(), "OPENAI_API_KEY is required");
        let key = ApiKey::new("k").expect("valid");
        assert_eq!(require_api_key(Some(key.clone()), ENV_HUME_API_KEY), Ok(key));
    }

    #[test]
    fn top_k_must_be_positive() {
        assert_eq!(sync_options(0), Err(ConfigError::ZeroTopK));
        assert_eq!(sync_options(2), Ok(SyncOptions { top_k: 2 }));
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("https://api.hume.ai/v0").is_ok());
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("not a url"),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn endpoint_keeps_version_prefix() {
        let base = parse_base_url("https://api.hume.ai/v0").expect("valid");
        assert_eq!(endpoint(&base, "batch/jobs"), "https://api.hume.ai/v0/batch/jobs");
        let base = parse_base_url("http://127.0.0.1:9000/").expect("valid");
        assert_eq!(endpoint(&base, "/batch/jobs"), "http://127.0.0.1:9000/batch/jobs");
    }
}
