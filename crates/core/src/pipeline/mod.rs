use crate::{
    adapter::{self, AdaptError},
    config::{AnalysisMode, AppConfig, RecordingInputs},
    emotion::TopK,
    feedback::{FeedbackClient, FeedbackError, FeedbackKind, FeedbackRequest},
    hume::{HumeError, InferenceService, ModelKind},
    report::{self, ReportError},
    sync::{self, summary, SyncError, SyncOptions, SynchronizedRecord},
};
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "pipeline";

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("inference failed: {0}")]
    Inference(#[from] HumeError),

    #[error("malformed inference result: {0}")]
    Adapt(#[from] AdaptError),

    #[error("synchronization failed: {0}")]
    Sync(#[from] SyncError),

    #[error("feedback request failed: {0}")]
    Feedback(#[from] FeedbackError),

    #[error("report output failed: {0}")]
    Report(#[from] ReportError),
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub inputs: RecordingInputs,
    pub output_dir: PathBuf,
    pub sync: SyncOptions,
    pub mode: AnalysisMode,
    pub feedback_enabled: bool,
    pub feedback_kind: FeedbackKind,
}

impl PipelineConfig {
    pub fn from_app(app: &AppConfig) -> Self {
        Self {
            inputs: app.inputs.clone(),
            output_dir: app.output_dir.clone(),
            sync: app.sync,
            mode: app.mode,
            feedback_enabled: app.feedback.enabled,
            feedback_kind: app.feedback.kind,
        }
    }
}

/// What a run produced. Paths point at the artifacts written to the output
/// directory.
#[derive(Clone, Debug, Default)]
pub struct PipelineOutcome {
    pub records: Vec<SynchronizedRecord>,
    pub utterances: Vec<summary::UtteranceEmotions>,
    pub artifacts: Vec<PathBuf>,
    pub feedback: Option<String>,
}

pub struct Pipeline<S, F> {
    pub inference: S,
    pub feedback: F,
    pub config: PipelineConfig,
}

impl<S, F> Pipeline<S, F>
where
    S: InferenceService,
    F: FeedbackClient,
{
    pub async fn run(&self) -> Result<PipelineOutcome, PipelineError> {
        match self.config.mode {
            AnalysisMode::Fused => self.run_fused().await,
            AnalysisMode::ProsodyOnly => self.run_prosody_only().await,
        }
    }

    async fn run_fused(&self) -> Result<PipelineOutcome, PipelineError> {
        let inputs = &self.config.inputs;
        let dir = self.config.output_dir.as_path();
        let mut outcome = PipelineOutcome::default();

        // modalities are independent until the join, so fetch them together
        let (audio, text, video) = tokio::try_join!(
            self.analyze(&inputs.audio, ModelKind::Prosody),
            self.analyze_optional(inputs.transcript.as_deref(), ModelKind::Language),
            self.analyze_optional(inputs.video.as_deref(), ModelKind::Face),
        )?;

        let path = report::write_json_artifact(dir, report::AUDIO_PREDICTIONS_FILE, &audio).await?;
        outcome.artifacts.push(path);
        if let Some(text) = &text {
            let path = report::write_json_artifact(dir, report::TEXT_PREDICTIONS_FILE, text).await?;
            outcome.artifacts.push(path);
        }
        if let Some(video) = &video {
            let path =
                report::write_json_artifact(dir, report::VIDEO_PREDICTIONS_FILE, video).await?;
            outcome.artifacts.push(path);
        }

        let records =
            synchronize_predictions(&audio, text.as_ref(), video.as_ref(), self.config.sync)?;
        tracing::info!(target: LOG_TARGET, records = records.len(), "modalities synchronized");

        outcome
            .artifacts
            .extend(write_synchronized(dir, &records).await?);

        if self.config.feedback_enabled {
            let transcript = report::render_json(&records)?;
            let text = self.request_feedback(transcript).await?;
            outcome
                .artifacts
                .push(report::write_artifact(dir, report::FEEDBACK_FILE, &text).await?);
            outcome.feedback = Some(text);
        }

        outcome.records = records;
        Ok(outcome)
    }

    async fn run_prosody_only(&self) -> Result<PipelineOutcome, PipelineError> {
        let dir = self.config.output_dir.as_path();
        let mut outcome = PipelineOutcome::default();

        let audio = self
            .analyze(&self.config.inputs.audio, ModelKind::Prosody)
            .await?;
        let path = report::write_json_artifact(dir, report::AUDIO_PREDICTIONS_FILE, &audio).await?;
        outcome.artifacts.push(path);

        let groups = adapter::speech_groups(&audio)?;
        let utterances = summary::summarize_speech(&groups, TopK::new(self.config.sync.top_k));
        let rendered = report::render_summary(&utterances);
        let path = report::write_artifact(dir, report::SUMMARY_TEXT_FILE, &rendered).await?;
        outcome.artifacts.push(path);

        if self.config.feedback_enabled {
            let transcript = report::render_summary_json(&utterances)?;
            let text = self.request_feedback(transcript).await?;
            outcome
                .artifacts
                .push(report::write_artifact(dir, report::FEEDBACK_FILE, &text).await?);
            outcome.feedback = Some(text);
        }

        outcome.utterances = utterances;
        Ok(outcome)
    }

    async fn analyze(
        &self,
        path: &Path,
        model: ModelKind,
    ) -> Result<serde_json::Value, HumeError> {
        tracing::info!(
            target: LOG_TARGET,
            model = model.name(),
            path = %path.display(),
            "analyzing"
        );
        self.inference.analyze(path.to_path_buf(), model).await
    }

    async fn analyze_optional(
        &self,
        path: Option<&Path>,
        model: ModelKind,
    ) -> Result<Option<serde_json::Value>, HumeError> {
        match path {
            Some(p) => self.analyze(p, model).await.map(Some),
            None => {
                tracing::info!(
                    target: LOG_TARGET,
                    modality = %model.modality(),
                    "no input given, skipping"
                );
                Ok(None)
            }
        }
    }

    async fn request_feedback(&self, transcript: String) -> Result<String, FeedbackError> {
        self.feedback
            .feedback(FeedbackRequest {
                kind: self.config.feedback_kind,
                transcript,
            })
            .await
    }
}

/// Adapts raw predictions and synchronizes them. Missing transcript or video
/// results count as empty sequences.
pub fn synchronize_predictions(
    audio: &serde_json::Value,
    text: Option<&serde_json::Value>,
    video: Option<&serde_json::Value>,
    options: SyncOptions,
) -> Result<Vec<SynchronizedRecord>, PipelineError> {
    let groups = adapter::speech_groups(audio)?;
    let text = text.map(adapter::text_segments).transpose()?.unwrap_or_default();
    let frames = video.map(adapter::video_frames).transpose()?.unwrap_or_default();
    Ok(sync::synchronize(&groups, &text, &frames, options)?)
}

/// Writes the text and JSON renderings of `records`.
pub async fn write_synchronized(
    dir: &Path,
    records: &[SynchronizedRecord],
) -> Result<Vec<PathBuf>, ReportError> {
    let text = report::render_text(records);
    let json = report::render_json(records)?;
    Ok(vec![
        report::write_artifact(dir, report::SYNCHRONIZED_TEXT_FILE, &text).await?,
        report::write_artifact(dir, report::SYNCHRONIZED_JSON_FILE, &json).await?,
    ])
}
