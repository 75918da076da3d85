//! Text and JSON renderings of synchronized records, plus the write-once
//! artifact dumps.

use crate::emotion::EmotionScore;
use crate::sync::summary::UtteranceEmotions;
use crate::sync::{FrameEmotions, SynchronizedRecord};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const RECORD_DELIMITER: &str = "--------------------------------------------------";
pub const JSON_SCORE_PLACES: u32 = 3;
pub const SUMMARY_SCORE_PLACES: u32 = 3;

pub const AUDIO_PREDICTIONS_FILE: &str = "audio_predictions.json";
pub const TEXT_PREDICTIONS_FILE: &str = "text_predictions.json";
pub const VIDEO_PREDICTIONS_FILE: &str = "video_predictions.json";
pub const SYNCHRONIZED_TEXT_FILE: &str = "synchronized_emotions.txt";
pub const SYNCHRONIZED_JSON_FILE: &str = "synchronized_emotions.json";
pub const SUMMARY_TEXT_FILE: &str = "top_emotions.txt";
pub const FEEDBACK_FILE: &str = "feedback.txt";

#[derive(thiserror::Error, Debug)]
pub enum ReportError {
    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Human-readable report, one block per record.
pub fn render_text(records: &[SynchronizedRecord]) -> String {
    let mut out = String::new();
    for r in records {
        // writing to a String cannot fail
        let _ = write_record(&mut out, r);
    }
    out
}

fn write_record(out: &mut String, r: &SynchronizedRecord) -> std::fmt::Result {
    writeln!(out, "Speaker ID: {}", r.speaker_id)?;
    writeln!(out, "Hume Transcribed Text: {}", r.hume_text)?;
    writeln!(out, "Reference Transcript Text: {}", r.reference_text)?;
    writeln!(out, "Time: {:.2}s - {:.2}s", r.begin, r.end)?;
    writeln!(out)?;

    write_emotion_group(out, "Text", &r.text_top_emotions)?;
    write_emotion_group(out, "Audio", &r.audio_top_emotions)?;
    write_video_group(out, &r.video_emotions)?;

    writeln!(out, "{RECORD_DELIMITER}")?;
    writeln!(out)
}

fn write_emotion_group(out: &mut String, label: &str, emotions: &[EmotionScore]) -> std::fmt::Result {
    writeln!(out, "{label} Top Emotions:")?;
    if emotions.is_empty() {
        writeln!(out, "  No {} emotions data available", label.to_lowercase())?;
    }
    for e in emotions {
        writeln!(out, "  - {}: {:.4}", e.name, e.score)?;
    }
    writeln!(out)
}

fn write_video_group(out: &mut String, frames: &[FrameEmotions]) -> std::fmt::Result {
    writeln!(out, "Video Emotions:")?;
    if frames.is_empty() {
        writeln!(out, "  No video emotions data available")?;
    }
    for f in frames {
        writeln!(out, "  Frame at {:.2}s:", f.time)?;
        for e in &f.top_emotions {
            writeln!(out, "    - {}: {:.4}", e.name, e.score)?;
        }
    }
    writeln!(out)
}

/// Pretty JSON of the records with scores rounded for presentation. This is
/// the transcript payload handed to the feedback service.
pub fn render_json(records: &[SynchronizedRecord]) -> Result<String, ReportError> {
    let rounded: Vec<SynchronizedRecord> = records.iter().map(round_record).collect();
    Ok(serde_json::to_string_pretty(&rounded)?)
}

fn round_record(r: &SynchronizedRecord) -> SynchronizedRecord {
    SynchronizedRecord {
        audio_top_emotions: round_all(&r.audio_top_emotions),
        text_top_emotions: round_all(&r.text_top_emotions),
        video_emotions: r
            .video_emotions
            .iter()
            .map(|f| FrameEmotions {
                time: f.time,
                top_emotions: round_all(&f.top_emotions),
            })
            .collect(),
        ..r.clone()
    }
}

fn round_all(emotions: &[EmotionScore]) -> Vec<EmotionScore> {
    emotions.iter().map(|e| e.rounded(JSON_SCORE_PLACES)).collect()
}

/// Audio-only report: each utterance followed by its top emotions.
pub fn render_summary(summary: &[UtteranceEmotions]) -> String {
    let mut out = String::new();
    for u in summary {
        let _ = writeln!(out, "Text: {}", u.text);
        for e in &u.top_emotions {
            let rounded = e.rounded(SUMMARY_SCORE_PLACES);
            let _ = writeln!(out, "  {}: {}", rounded.name, rounded.score);
        }
        out.push('\n');
    }
    out
}

pub fn render_summary_json(summary: &[UtteranceEmotions]) -> Result<String, ReportError> {
    let rounded: Vec<UtteranceEmotions> = summary
        .iter()
        .map(|u| UtteranceEmotions {
            text: u.text.clone(),
            top_emotions: round_all(&u.top_emotions),
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rounded)?)
}

pub async fn write_artifact(
    dir: &Path,
    name: &str,
    contents: &str,
) -> Result<PathBuf, ReportError> {
    let path = dir.join(name);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ReportError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, contents)
        .await
        .map_err(|source| ReportError::Write {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), bytes = contents.len(), "wrote artifact");
    Ok(path)
}

pub async fn write_json_artifact<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> Result<PathBuf, ReportError> {
    let json = serde_json::to_string_pretty(value)?;
    write_artifact(dir, name, &json).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SynchronizedRecord {
        SynchronizedRecord {
            speaker_id: "A".into(),
            hume_text: "hi".into(),
            reference_text: "hi there".into(),
            begin: 0.0,
            end: 2.0,
            audio_top_emotions: vec![
                EmotionScore::new("joy", 0.9),
                EmotionScore::new("calm", 0.4),
            ],
            text_top_emotions: vec![EmotionScore::new("joy", 0.81234)],
            video_emotions: vec![FrameEmotions {
                time: 1.0,
                top_emotions: vec![EmotionScore::new("joy", 0.95)],
            }],
        }
    }

    #[test]
    fn renders_full_block() {
        let text = render_text(&[record()]);
        let expected = "\
Speaker ID: A
Hume Transcribed Text: hi
Reference Transcript Text: hi there
Time: 0.00s - 2.00s

Text Top Emotions:
  - joy: 0.8123

Audio Top Emotions:
  - joy: 0.9000
  - calm: 0.4000

Video Emotions:
  Frame at 1.00s:
    - joy: 0.9500

--------------------------------------------------

";
        assert_eq!(text, expected);
    }

    #[test]
    fn empty_groups_render_sentinel() {
        let r = SynchronizedRecord {
            text_top_emotions: vec![],
            audio_top_emotions: vec![],
            video_emotions: vec![],
            ..record()
        };
        let text = render_text(&[r]);
        assert!(text.contains("  No text emotions data available\n"));
        assert!(text.contains("  No audio emotions data available\n"));
        assert!(text.contains("  No video emotions data available\n"));
    }

    #[test]
    fn blocks_are_delimited() {
        let text = render_text(&[record(), record()]);
        assert_eq!(text.matches(RECORD_DELIMITER).count(), 2);
        assert!(render_text(&[]).is_empty());
    }

    #[test]
    fn json_rounds_scores_to_three_places() {
        let json = render_json(&[record()]).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value[0]["text_top_emotions"][0]["score"], serde_json::json!(0.812));
        assert_eq!(value[0]["video_emotions"][0]["time"], serde_json::json!(1.0));
        assert_eq!(value[0]["reference_text"], "hi there");
    }

    #[test]
    fn summary_lists_rounded_scores() {
        let summary = vec![UtteranceEmotions {
            text: "hello".into(),
            top_emotions: vec![EmotionScore::new("awe", 0.71249)],
        }];
        assert_eq!(render_summary(&summary), "Text: hello\n  awe: 0.712\n\n");
    }

    #[tokio::test]
    async fn artifacts_land_in_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("out");
        let path = write_artifact(&nested, SYNCHRONIZED_TEXT_FILE, "body")
            .await
            .expect("write");
        assert_eq!(std::fs::read_to_string(path).expect("read"), "body");

        let path = write_json_artifact(&nested, AUDIO_PREDICTIONS_FILE, &serde_json::json!([1, 2]))
            .await
            .expect("write");
        let back: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("parse");
        assert_eq!(back, serde_json::json!([1, 2]));
    }

    #[tokio::test]
    async fn unwritable_directory_is_a_write_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("taken");
        std::fs::write(&blocker, "not a directory").expect("write");

        let err = write_artifact(&blocker, FEEDBACK_FILE, "text")
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::Write { ref path, .. } if path == &blocker));
    }

    #[test]
    fn summary_and_json_round_to_the_same_places() {
        let summary = vec![UtteranceEmotions {
            text: "x".into(),
            top_emotions: vec![EmotionScore::new("awe", 0.12345)],
        }];
        let json: serde_json::Value =
            serde_json::from_str(&render_summary_json(&summary).expect("json")).expect("parse");
        assert_eq!(json[0]["top_emotions"][0]["score"], serde_json::json!(0.123));
        assert_eq!(render_summary(&summary), "Text: x\n  awe: 0.123\n\n");
    }
}
