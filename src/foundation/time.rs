use crate::foundation::core::{Fps, FrameIndex};

/// Encoder time units per second (100 ns ticks).
pub const TIME_UNITS_PER_SECOND: u64 = 10_000_000;

/// Presentation interval `[start, end)` of one frame, in time units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct FrameSpan {
    /// Inclusive start time.
    pub start: u64,
    /// Exclusive end time.
    pub end: u64,
}

impl FrameSpan {
    /// Frame duration in time units.
    pub fn duration(self) -> u64 {
        self.end.saturating_sub(self.start)
    }
}

/// End time of frame `idx`: `floor(TIME_UNITS_PER_SECOND * (idx + 1) * den / num)`.
///
/// Computed from the absolute index so rounding never accumulates across frames.
pub fn frame_end_time(fps: Fps, idx: FrameIndex) -> u64 {
    let ticks = u128::from(TIME_UNITS_PER_SECOND) * (u128::from(idx.0) + 1) * u128::from(fps.den);
    u64::try_from(ticks / u128::from(fps.num)).unwrap_or(u64::MAX)
}

/// Running frame cursor: how many frames were written and where the next one starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameClock {
    next: FrameIndex,
    start: u64,
}

impl FrameClock {
    /// Index the next written frame will get.
    pub fn next_index(&self) -> FrameIndex {
        self.next
    }

    /// Number of frames written so far.
    pub fn frames_written(&self) -> u64 {
        self.next.0
    }

    /// End time of the last written frame (0 before the first frame).
    pub fn elapsed(&self) -> u64 {
        self.start
    }

    /// Span of the next frame at `fps`.
    pub fn next_span(&self, fps: Fps) -> FrameSpan {
        FrameSpan {
            start: self.start,
            end: frame_end_time(fps, self.next),
        }
    }

    /// Record that the frame covering `span` was written.
    pub fn advance(&mut self, span: FrameSpan) {
        self.next = FrameIndex(self.next.0 + 1);
        self.start = span.end;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/time.rs"]
mod tests;
