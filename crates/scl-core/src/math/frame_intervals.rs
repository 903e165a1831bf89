//! Frame-interval primitives.
//!
//! Scene declarations attach validity ranges to elements as inclusive frame
//! intervals; overlapping or touching intervals fuse into one.

use serde::{Deserialize, Serialize};

use super::FrameNum;

/// Inclusive frame interval `[frame_start, frame_end]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameInterval {
    pub frame_start: FrameNum,
    pub frame_end: FrameNum,
}

impl FrameInterval {
    pub fn new(frame_start: FrameNum, frame_end: FrameNum) -> Self {
        Self {
            frame_start,
            frame_end,
        }
    }

    /// Single-frame interval.
    pub fn single(frame: FrameNum) -> Self {
        Self::new(frame, frame)
    }

    pub fn contains(&self, frame: FrameNum) -> bool {
        self.frame_start <= frame && frame <= self.frame_end
    }

    pub fn intersects(&self, other: &FrameInterval) -> bool {
        self.frame_start.max(other.frame_start) <= self.frame_end.min(other.frame_end)
    }

    /// Whether the two intervals touch end to start with no gap.
    pub fn is_consecutive(&self, other: &FrameInterval) -> bool {
        self.frame_end + 1 == other.frame_start || other.frame_end + 1 == self.frame_start
    }

    /// Smallest interval covering both.
    pub fn outer(&self, other: &FrameInterval) -> FrameInterval {
        FrameInterval::new(
            self.frame_start.min(other.frame_start),
            self.frame_end.max(other.frame_end),
        )
    }
}

/// Fuse a list of intervals into non-overlapping, non-touching ones.
///
/// E.g. `[(0,5), (3,6), (8,10)]` fuses into `[(0,6), (8,10)]`.
pub fn fuse_frame_intervals(intervals: &[FrameInterval]) -> Vec<FrameInterval> {
    let mut fused: Vec<FrameInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        let mut merged = *interval;
        // Pull out everything the new interval touches, widening as we go.
        let mut kept = Vec::with_capacity(fused.len());
        for fi in fused {
            if fi.intersects(&merged) || fi.is_consecutive(&merged) {
                merged = merged.outer(&fi);
            } else {
                kept.push(fi);
            }
        }
        kept.push(merged);
        fused = kept;
    }
    fused.sort_by_key(|fi| fi.frame_start);
    fused
}
