use crate::segment::VideoFrame;

/// Answers "which frames fall in `[begin, end)`" over a frame sequence.
///
/// Face results normally arrive in time order, in which case lookups use a
/// binary search. Otherwise each lookup scans every frame. Either way the
/// frames come back in their original sequence order.
#[derive(Clone, Copy, Debug)]
pub struct FrameTimeline<'a> {
    frames: &'a [VideoFrame],
    sorted: bool,
}

impl<'a> FrameTimeline<'a> {
    pub fn new(frames: &'a [VideoFrame]) -> Self {
        let sorted = frames.windows(2).all(|w| w[0].time <= w[1].time);
        if !sorted {
            tracing::debug!(
                frames = frames.len(),
                "video frames are not time-ordered, falling back to linear scan"
            );
        }
        Self { frames, sorted }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_sorted(&self) -> bool {
        self.sorted
    }

    pub fn within(&self, begin: f64, end: f64) -> Vec<&'a VideoFrame> {
        if self.is_empty() || begin >= end {
            return Vec::new();
        }
        if self.sorted {
            let lo = self.frames.partition_point(|f| f.time < begin);
            let hi = self.frames.partition_point(|f| f.time < end).max(lo);
            self.frames[lo..hi].iter().collect()
        } else {
            self.frames
                .iter()
                .filter(|f| begin <= f.time && f.time < end)
                .collect()
        }
    }
}
