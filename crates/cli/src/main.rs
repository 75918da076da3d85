#![deny(warnings)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use emosync_core::config::{
    parse_base_url, require_api_key, resolve_api_key, resolve_string_with_default, sync_options,
    AnalysisMode, ApiKeys, AppConfig, Env, FeedbackConfig, HumeConfig, PollSettings,
    RecordingInputs, StdEnv, DEFAULT_FEEDBACK_MODEL, DEFAULT_HUME_BASE_URL,
    DEFAULT_OPENAI_BASE_URL, DEFAULT_OUTPUT_DIR, DEFAULT_POLL_INTERVAL_SECS,
    DEFAULT_POLL_TIMEOUT_SECS, ENV_HUME_API_KEY, ENV_HUME_BASE_URL, ENV_OPENAI_API_KEY,
    ENV_OPENAI_BASE_URL,
};
use emosync_core::emotion::DEFAULT_TOP_K;
use emosync_core::feedback::{
    DummyFeedbackClient, FeedbackClient, FeedbackKind, OpenAiFeedbackClient,
};
use emosync_core::hume::HumeBatchClient;
use emosync_core::pipeline::{
    synchronize_predictions, write_synchronized, Pipeline, PipelineConfig,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emosync")]
#[command(about = "Fuse voice, transcript and face emotion predictions onto one timeline")]
struct Cli {
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit the recording for inference, synchronize and write reports.
    Analyze(AnalyzeArgs),
    /// Synchronize previously saved prediction payloads, no network access.
    Sync(SyncArgs),
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    #[arg(long)]
    audio: PathBuf,

    #[arg(long)]
    transcript: Option<PathBuf>,

    #[arg(long)]
    video: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(long, default_value_t = FeedbackKind::default())]
    feedback: FeedbackKind,

    #[arg(long)]
    no_feedback: bool,

    /// Analyze audio only and summarize top emotions per utterance.
    #[arg(long)]
    prosody_only: bool,

    #[arg(long)]
    hume_api_key: Option<String>,

    #[arg(long)]
    openai_api_key: Option<String>,

    #[arg(long)]
    hume_base_url: Option<String>,

    #[arg(long)]
    openai_base_url: Option<String>,

    #[arg(long, default_value = DEFAULT_FEEDBACK_MODEL)]
    feedback_model: String,

    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    poll_interval_secs: u64,

    #[arg(long, default_value_t = DEFAULT_POLL_TIMEOUT_SECS)]
    poll_timeout_secs: u64,

    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
}

#[derive(Args, Debug)]
struct SyncArgs {
    #[arg(long)]
    audio_predictions: PathBuf,

    #[arg(long)]
    text_predictions: Option<PathBuf>,

    #[arg(long)]
    video_predictions: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Command::Analyze(args) => {
            let cfg = build_config(args, &StdEnv)?;
            tracing::info!(
                audio = %cfg.inputs.audio.display(),
                mode = ?cfg.mode,
                feedback = cfg.feedback.enabled,
                output_dir = %cfg.output_dir.display(),
                "config loaded"
            );
            run_analyze(cfg).await
        }
        Command::Sync(args) => run_sync(args).await,
    }
}

async fn run_analyze(cfg: AppConfig) -> anyhow::Result<()> {
    let hume_key = require_api_key(cfg.api_keys.hume.clone(), ENV_HUME_API_KEY)
        .context("pass --hume-api-key or set the variable")?;
    let inference = HumeBatchClient::new(hume_key, &cfg.hume)?;

    if cfg.feedback.enabled {
        let openai_key = require_api_key(cfg.api_keys.openai.clone(), ENV_OPENAI_API_KEY)
            .context("feedback needs --openai-api-key, or pass --no-feedback")?;
        let feedback = OpenAiFeedbackClient::new(openai_key, &cfg.feedback)?;
        run_pipeline(inference, feedback, &cfg).await
    } else {
        run_pipeline(inference, DummyFeedbackClient::new(), &cfg).await
    }
}

async fn run_pipeline<F: FeedbackClient>(
    inference: HumeBatchClient,
    feedback: F,
    cfg: &AppConfig,
) -> anyhow::Result<()> {
    let pipeline = Pipeline {
        inference,
        feedback,
        config: PipelineConfig::from_app(cfg),
    };

    let outcome = pipeline.run().await.context("analysis failed")?;
    for path in &outcome.artifacts {
        tracing::info!(path = %path.display(), "artifact written");
    }
    if let Some(text) = outcome.feedback {
        println!("{text}");
    }
    Ok(())
}

async fn run_sync(args: SyncArgs) -> anyhow::Result<()> {
    let options = sync_options(args.top_k)?;
    let audio = read_payload(&args.audio_predictions).await?;
    let text = match &args.text_predictions {
        Some(path) => Some(read_payload(path).await?),
        None => None,
    };
    let video = match &args.video_predictions {
        Some(path) => Some(read_payload(path).await?),
        None => None,
    };

    let records = synchronize_predictions(&audio, text.as_ref(), video.as_ref(), options)?;
    let written = write_synchronized(&args.output_dir, &records).await?;

    tracing::info!(records = records.len(), "synchronized saved predictions");
    for path in &written {
        tracing::info!(path = %path.display(), "artifact written");
    }
    Ok(())
}

async fn read_payload(path: &Path) -> anyhow::Result<serde_json::Value> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("{} is not valid JSON", path.display()))
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: AnalyzeArgs, env: &impl Env) -> anyhow::Result<AppConfig> {
    let hume = resolve_api_key(args.hume_api_key, ENV_HUME_API_KEY, env)?;
    let openai = resolve_api_key(args.openai_api_key, ENV_OPENAI_API_KEY, env)?;

    let hume_base_url = parse_base_url(&resolve_string_with_default(
        args.hume_base_url,
        ENV_HUME_BASE_URL,
        env,
        DEFAULT_HUME_BASE_URL,
    ))?;
    let openai_base_url = parse_base_url(&resolve_string_with_default(
        args.openai_base_url,
        ENV_OPENAI_BASE_URL,
        env,
        DEFAULT_OPENAI_BASE_URL,
    ))?;
    let poll = PollSettings::new(args.poll_interval_secs, args.poll_timeout_secs)?;
    let sync = sync_options(args.top_k)?;

    Ok(AppConfig {
        inputs: RecordingInputs {
            audio: args.audio,
            transcript: args.transcript,
            video: args.video,
        },
        api_keys: ApiKeys { hume, openai },
        hume: HumeConfig {
            base_url: hume_base_url,
            poll,
        },
        feedback: FeedbackConfig {
            enabled: !args.no_feedback,
            kind: args.feedback,
            model: args.feedback_model,
            base_url: openai_base_url,
        },
        sync,
        output_dir: args.output_dir,
        mode: if args.prosody_only {
            AnalysisMode::ProsodyOnly
        } else {
            AnalysisMode::Fused
        },
    })
}
