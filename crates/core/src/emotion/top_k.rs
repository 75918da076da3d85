use crate::emotion::{EmotionScore, EmotionVector};

pub const DEFAULT_TOP_K: usize = 3;

/// Picks the highest-scoring entries of an [`EmotionVector`].
///
/// Output is ordered by descending score. Equal scores keep the order they
/// had in the input vector. Scores are compared unrounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TopK {
    k: usize,
}

impl TopK {
    pub fn new(k: usize) -> Self {
        Self { k }
    }

    pub fn select(&self, emotions: &EmotionVector) -> Vec<EmotionScore> {
        if self.k == 0 || emotions.is_empty() {
            return Vec::new();
        }
        let mut ranked = Vec::with_capacity(emotions.len());
        ranked.extend(emotions.iter().cloned());
        // stable: ties stay in source order
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(self.k);
        ranked
    }
}

impl Default for TopK {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}
