//! Cross-modal synchronization.
//!
//! Speech segments (prosody) define the timeline. Each one is paired with the
//! transcript utterance at the same position in the flattened speaker-group
//! traversal, and joined with every video frame whose time falls inside the
//! segment's half-open `[begin, end)` interval. The resulting records are
//! sorted by `begin`.
//!
//! The frame join is `O(S * V)` when frames are unordered. Time-ordered frame
//! sequences take the binary-search path in [`FrameTimeline`].

pub mod summary;
pub mod timeline;

use crate::emotion::{EmotionScore, TopK, DEFAULT_TOP_K};
use crate::segment::{flatten_groups, SpeakerGroup, SpeechSegment, TextSegment, VideoFrame};
use serde::{Deserialize, Serialize};

pub use timeline::FrameTimeline;

const LOG_TARGET: &str = "sync";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(
        "audio/text misalignment: {speech} speech segments but {text} transcript segments"
    )]
    Alignment { speech: usize, text: usize },
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncOptions {
    pub top_k: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Top emotions of one video frame that fell inside a record's interval.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FrameEmotions {
    pub time: f64,
    pub top_emotions: Vec<EmotionScore>,
}

/// One speech segment joined with its transcript utterance and video frames.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SynchronizedRecord {
    pub speaker_id: String,
    pub hume_text: String,
    pub reference_text: String,
    pub begin: f64,
    pub end: f64,
    pub audio_top_emotions: Vec<EmotionScore>,
    pub text_top_emotions: Vec<EmotionScore>,
    pub video_emotions: Vec<FrameEmotions>,
}

/// Speech segments paired positionally with transcript segments.
///
/// Construction is the only place the pairing is checked: either the
/// transcript is absent (empty) or both flattened sequences have the same
/// length.
#[derive(Clone, Debug, PartialEq)]
pub struct AlignedSegments {
    pairs: Vec<(SpeechSegment, Option<TextSegment>)>,
}

impl AlignedSegments {
    pub fn new(groups: &[SpeakerGroup], text: &[TextSegment]) -> Result<Self, SyncError> {
        let speech: Vec<SpeechSegment> = flatten_groups(groups).cloned().collect();

        if text.is_empty() {
            tracing::debug!(
                target: LOG_TARGET,
                speech = speech.len(),
                "no transcript segments, records will carry empty reference text"
            );
            return Ok(Self {
                pairs: speech.into_iter().map(|s| (s, None)).collect(),
            });
        }

        if speech.len() != text.len() {
            return Err(SyncError::Alignment {
                speech: speech.len(),
                text: text.len(),
            });
        }

        Ok(Self {
            pairs: speech
                .into_iter()
                .zip(text.iter().cloned().map(Some))
                .collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn has_transcript(&self) -> bool {
        self.pairs.iter().any(|(_, t)| t.is_some())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SpeechSegment, Option<&TextSegment>)> {
        self.pairs.iter().map(|(s, t)| (s, t.as_ref()))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Synchronizer {
    selector: TopK,
}

impl Synchronizer {
    pub fn new(options: SyncOptions) -> Self {
        Self {
            selector: TopK::new(options.top_k),
        }
    }

    pub fn synchronize(
        &self,
        segments: &AlignedSegments,
        frames: &[VideoFrame],
    ) -> Vec<SynchronizedRecord> {
        if segments.is_empty() {
            tracing::debug!(target: LOG_TARGET, "no speech segments to synchronize");
            return Vec::new();
        }
        let timeline = FrameTimeline::new(frames);

        let mut records: Vec<SynchronizedRecord> = segments
            .iter()
            .map(|(speech, text)| self.record(speech, text, &timeline))
            .collect();

        // stable sort, records sharing a `begin` stay in traversal order
        records.sort_by(|a, b| a.begin.total_cmp(&b.begin));

        tracing::debug!(
            target: LOG_TARGET,
            segments = segments.len(),
            transcript = segments.has_transcript(),
            frames = timeline.len(),
            ordered_frames = timeline.is_sorted(),
            joined_frames = records.iter().map(|r| r.video_emotions.len()).sum::<usize>(),
            "synchronized modalities"
        );
        records
    }

    fn record(
        &self,
        speech: &SpeechSegment,
        text: Option<&TextSegment>,
        timeline: &FrameTimeline<'_>,
    ) -> SynchronizedRecord {
        let video_emotions = timeline
            .within(speech.begin, speech.end)
            .into_iter()
            .map(|frame| FrameEmotions {
                time: frame.time,
                top_emotions: self.selector.select(&frame.emotions),
            })
            .collect();

        SynchronizedRecord {
            speaker_id: speech.speaker_id.clone(),
            hume_text: speech.text.clone(),
            reference_text: text.map(|t| t.text.clone()).unwrap_or_default(),
            begin: speech.begin,
            end: speech.end,
            audio_top_emotions: self.selector.select(&speech.emotions),
            text_top_emotions: text
                .map(|t| self.selector.select(&t.emotions))
                .unwrap_or_default(),
            video_emotions,
        }
    }
}

/// Pairs, joins and orders the three modalities in one pass.
pub fn synchronize(
    groups: &[SpeakerGroup],
    text: &[TextSegment],
    frames: &[VideoFrame],
    options: SyncOptions,
) -> Result<Vec<SynchronizedRecord>, SyncError> {
    let aligned = AlignedSegments::new(groups, text)?;
    Ok(Synchronizer::new(options).synchronize(&aligned, frames))
}
