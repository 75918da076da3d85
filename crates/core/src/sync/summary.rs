use crate::emotion::{EmotionScore, TopK};
use crate::segment::{flatten_groups, SpeakerGroup};
use serde::{Deserialize, Serialize};

/// Top emotions of one prosody utterance, for the audio-only report.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UtteranceEmotions {
    pub text: String,
    pub top_emotions: Vec<EmotionScore>,
}

/// Per-utterance top emotions in speaker-group traversal order.
pub fn summarize_speech(groups: &[SpeakerGroup], selector: TopK) -> Vec<UtteranceEmotions> {
    flatten_groups(groups)
        .map(|s| UtteranceEmotions {
            text: s.text.clone(),
            top_emotions: selector.select(&s.emotions),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::EmotionVector;
    use crate::segment::SpeechSegment;

    #[test]
    fn one_entry_per_segment_in_traversal_order() {
        let seg = |speaker: &str, text: &str, scores: &[(&str, f64)]| SpeechSegment {
            speaker_id: speaker.into(),
            text: text.into(),
            begin: 0.0,
            end: 1.0,
            emotions: scores
                .iter()
                .map(|(n, s)| EmotionScore::new(*n, *s))
                .collect::<EmotionVector>(),
        };
        let groups = vec![
            SpeakerGroup {
                speaker_id: "A".into(),
                segments: vec![seg("A", "first", &[("joy", 0.2), ("awe", 0.7)])],
            },
            SpeakerGroup {
                speaker_id: "B".into(),
                segments: vec![seg("B", "second", &[])],
            },
        ];

        let summary = summarize_speech(&groups, TopK::new(1));
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[0].text, "first");
        assert_eq!(summary[0].top_emotions, vec![EmotionScore::new("awe", 0.7)]);
        assert!(summary[1].top_emotions.is_empty());
    }
}
