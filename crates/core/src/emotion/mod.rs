mod top_k;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use top_k::{TopK, DEFAULT_TOP_K};

/// One labelled score from an emotion-inference model.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct EmotionScore {
    pub name: String,
    pub score: f64,
}

impl EmotionScore {
    pub fn new<S: Into<String>>(name: S, score: f64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }

    /// Copy of this score rounded to `places` decimal places, for rendering only.
    pub fn rounded(&self, places: u32) -> Self {
        let factor = 10f64.powi(places as i32);
        Self {
            name: self.name.clone(),
            score: (self.score * factor).round() / factor,
        }
    }
}

/// Scores for a single sample, in the order the model reported them.
///
/// Label names are unique within one vector; construction keeps the first
/// occurrence of a repeated label.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct EmotionVector(Vec<EmotionScore>);

impl EmotionVector {
    pub fn from_scores(scores: impl IntoIterator<Item = EmotionScore>) -> Self {
        let mut out: Vec<EmotionScore> = Vec::new();
        for score in scores {
            if out.iter().any(|s| s.name == score.name) {
                tracing::debug!(label = %score.name, "dropping repeated emotion label");
                continue;
            }
            out.push(score);
        }
        Self(out)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EmotionScore> {
        self.0.iter()
    }

}

impl<'a> IntoIterator for &'a EmotionVector {
    type Item = &'a EmotionScore;
    type IntoIter = std::slice::Iter<'a, EmotionScore>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<EmotionScore> for EmotionVector {
    fn from_iter<T: IntoIterator<Item = EmotionScore>>(iter: T) -> Self {
        Self::from_scores(iter)
    }
}

/// Input channel an emotion prediction came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Audio,
    Text,
    Video,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Audio => "audio",
            Modality::Text => "text",
            Modality::Video => "video",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
