//! Turns raw per-modality prediction payloads into the flat segment and frame
//! sequences the synchronizer consumes.
//!
//! Ordering is preserved everywhere: sources, files, groups and predictions
//! are visited in payload order and nothing is dropped. Missing emotion lists
//! become empty vectors; a missing speaker id, text or time bound is a
//! [`AdaptError::MissingField`].

mod raw;

use crate::emotion::{EmotionScore, EmotionVector, Modality};
use crate::segment::{SpeakerGroup, SpeechSegment, TextSegment, VideoFrame};
use raw::{RawEmotion, RawGroup, RawModel, RawModels, RawSourcePrediction};
use serde::Deserialize;

const LOG_TARGET: &str = "adapter";

#[derive(thiserror::Error, Debug)]
pub enum AdaptError {
    #[error("{modality} predictions do not have the expected shape: {source}")]
    Decode {
        modality: Modality,
        #[source]
        source: serde_json::Error,
    },

    #[error("{modality} predictions are missing `{field}` at {location}")]
    MissingField {
        modality: Modality,
        field: &'static str,
        location: String,
    },

    #[error("{modality} predictions have no `{model}` model output at {location}")]
    MissingModel {
        modality: Modality,
        model: &'static str,
        location: String,
    },

    #[error("segment at {location} ends before it begins ({begin}s > {end}s)")]
    InvalidInterval {
        location: String,
        begin: f64,
        end: f64,
    },
}

/// Speaker-grouped speech segments from a prosody result.
pub fn speech_groups(payload: &serde_json::Value) -> Result<Vec<SpeakerGroup>, AdaptError> {
    let modality = Modality::Audio;
    let mut out = Vec::new();

    for (location, group) in model_groups(payload, modality, "prosody", |m| m.prosody)? {
        let speaker_id = group.id.ok_or_else(|| AdaptError::MissingField {
            modality,
            field: "id",
            location: location.clone(),
        })?;

        let mut segments = Vec::with_capacity(group.predictions.len());
        for (i, p) in group.predictions.into_iter().enumerate() {
            let at = format!("{location}.predictions[{i}]");
            let text = p.text.ok_or_else(|| missing(modality, "text", &at))?;
            let time = p.time.ok_or_else(|| missing(modality, "time", &at))?;
            let begin = time
                .begin
                .ok_or_else(|| missing(modality, "time.begin", &at))?;
            let end = time.end.ok_or_else(|| missing(modality, "time.end", &at))?;
            if begin > end {
                return Err(AdaptError::InvalidInterval {
                    location: at,
                    begin,
                    end,
                });
            }
            segments.push(SpeechSegment {
                speaker_id: speaker_id.clone(),
                text,
                begin,
                end,
                emotions: emotion_vector(p.emotions),
            });
        }

        out.push(SpeakerGroup {
            speaker_id,
            segments,
        });
    }

    tracing::debug!(
        target: LOG_TARGET,
        groups = out.len(),
        segments = out.iter().map(|g| g.segments.len()).sum::<usize>(),
        "adapted prosody predictions"
    );
    Ok(out)
}

/// Utterance segments from a language result, flattened across groups.
pub fn text_segments(payload: &serde_json::Value) -> Result<Vec<TextSegment>, AdaptError> {
    let modality = Modality::Text;
    let mut out = Vec::new();

    for (location, group) in model_groups(payload, modality, "language", |m| m.language)? {
        for (i, p) in group.predictions.into_iter().enumerate() {
            let at = format!("{location}.predictions[{i}]");
            let text = p.text.ok_or_else(|| missing(modality, "text", &at))?;
            out.push(TextSegment {
                text,
                emotions: emotion_vector(p.emotions),
            });
        }
    }

    tracing::debug!(target: LOG_TARGET, segments = out.len(), "adapted language predictions");
    Ok(out)
}

/// Per-frame samples from a face result, flattened across detected faces.
pub fn video_frames(payload: &serde_json::Value) -> Result<Vec<VideoFrame>, AdaptError> {
    let modality = Modality::Video;
    let mut out = Vec::new();

    for (location, group) in model_groups(payload, modality, "face", |m| m.face)? {
        for (i, p) in group.predictions.into_iter().enumerate() {
            let at = format!("{location}.predictions[{i}]");
            let time = p.time.ok_or_else(|| missing(modality, "time", &at))?;
            out.push(VideoFrame {
                time,
                emotions: emotion_vector(p.emotions),
            });
        }
    }

    tracing::debug!(target: LOG_TARGET, frames = out.len(), "adapted face predictions");
    Ok(out)
}

fn model_groups<P>(
    payload: &serde_json::Value,
    modality: Modality,
    model: &'static str,
    pick: impl Fn(RawModels) -> Option<RawModel<P>>,
) -> Result<Vec<(String, RawGroup<P>)>, AdaptError> {
    let sources = Vec::<RawSourcePrediction>::deserialize(payload)
        .map_err(|source| AdaptError::Decode { modality, source })?;

    let mut groups = Vec::new();
    for (s, source) in sources.into_iter().enumerate() {
        let at = format!("[{s}]");
        let results = source
            .results
            .ok_or_else(|| missing(modality, "results", &at))?;

        for err in &results.errors {
            tracing::warn!(
                target: LOG_TARGET,
                %modality,
                file = err.file.as_deref().unwrap_or("<unknown>"),
                message = err.message.as_deref().unwrap_or(""),
                "inference service reported a file error"
            );
        }

        for (f, file) in results.predictions.into_iter().enumerate() {
            let at = format!("{at}.results.predictions[{f}]");
            let models = file
                .models
                .ok_or_else(|| missing(modality, "models", &at))?;
            let output = pick(models).ok_or_else(|| AdaptError::MissingModel {
                modality,
                model,
                location: format!("{at}.models"),
            })?;
            tracing::trace!(
                target: LOG_TARGET,
                file = file.file.as_deref().unwrap_or("<unnamed>"),
                groups = output.grouped_predictions.len(),
                "reading model output"
            );
            for (g, group) in output.grouped_predictions.into_iter().enumerate() {
                groups.push((
                    format!("{at}.models.{model}.grouped_predictions[{g}]"),
                    group,
                ));
            }
        }
    }
    Ok(groups)
}

fn emotion_vector(raw: Option<Vec<RawEmotion>>) -> EmotionVector {
    raw.unwrap_or_default()
        .into_iter()
        .map(|e| EmotionScore::new(e.name, e.score))
        .collect()
}

fn missing(modality: Modality, field: &'static str, location: &str) -> AdaptError {
    AdaptError::MissingField {
        modality,
        field,
        location: location.to_owned(),
    }
}
