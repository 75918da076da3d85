use crate::emotion::EmotionVector;
use serde::{Deserialize, Serialize};

/// A span of speech attributed to one speaker, in seconds from the start of
/// the recording. `begin <= end` holds for every segment built by the adapter.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeechSegment {
    pub speaker_id: String,
    pub text: String,
    pub begin: f64,
    pub end: f64,
    pub emotions: EmotionVector,
}

/// All segments the inference service attributed to one speaker, in source order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpeakerGroup {
    pub speaker_id: String,
    pub segments: Vec<SpeechSegment>,
}

/// An utterance from the reference transcript. It carries no timestamp of its
/// own; it borrows the span of the speech segment at the same position.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TextSegment {
    pub text: String,
    pub emotions: EmotionVector,
}

/// A single face-model sample at an instant of the video.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct VideoFrame {
    pub time: f64,
    pub emotions: EmotionVector,
}

/// Speech segments across every group, groups in order, segments in order
/// within each group.
pub fn flatten_groups(groups: &[SpeakerGroup]) -> impl Iterator<Item = &SpeechSegment> {
    groups.iter().flat_map(|g| g.segments.iter())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(speaker: &str, begin: f64, end: f64) -> SpeechSegment {
        SpeechSegment {
            speaker_id: speaker.to_owned(),
            text: String::new(),
            begin,
            end,
            emotions: EmotionVector::default(),
        }
    }

    #[test]
    fn flatten_walks_groups_then_segments() {
        let groups = vec![
            SpeakerGroup {
                speaker_id: "A".into(),
                segments: vec![seg("A", 5.0, 6.0), seg("A", 9.0, 10.0)],
            },
            SpeakerGroup {
                speaker_id: "B".into(),
                segments: vec![seg("B", 0.0, 1.0)],
            },
        ];
        let begins: Vec<f64> = flatten_groups(&groups).map(|s| s.begin).collect();
        assert_eq!(begins, vec![5.0, 9.0, 0.0]);
    }
}
