use std::path::PathBuf;

use crate::foundation::core::{Fps, FrameIndex, Resolution};
use crate::foundation::error::{FeedError, FeedResult};
use crate::foundation::time::FrameSpan;
use crate::source::pixels::{PixelBuffer, PixelFormat};

/// Video codec, picked from the output file name.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 (default for every extension but `.wmv`).
    #[default]
    H264,
    /// Windows Media Video.
    Wmv,
}

impl VideoCodec {
    /// `.wmv` outputs (case-sensitive suffix after a non-empty stem) get [`VideoCodec::Wmv`].
    pub fn for_output(path: &str) -> Self {
        if path.len() > 4 && path.ends_with(".wmv") {
            Self::Wmv
        } else {
            Self::H264
        }
    }
}

/// Configuration provided to a [`FrameSink`] when the output is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkConfig {
    /// Output video file.
    pub out_path: PathBuf,
    /// Frame size.
    pub resolution: Resolution,
    /// Constant input frame rate.
    pub fps: Fps,
    /// Target average bits per second.
    pub bitrate: u32,
    /// Layout of the pixels passed to `push_frame`.
    pub pixel_format: PixelFormat,
    /// Output codec.
    pub codec: VideoCodec,
}

/// Encoder contract for consuming assembled frames.
///
/// Ordering contract: `begin` is called once, then `push_frame` in strictly increasing
/// `FrameIndex` order with contiguous spans, then exactly one of `end` (commit the file) or
/// `discard` (drop it).
pub trait FrameSink {
    /// Open the output. Called once before any frames are pushed.
    fn begin(&mut self, cfg: &SinkConfig) -> FeedResult<()>;
    /// Push one frame covering `span` (time units).
    fn push_frame(&mut self, idx: FrameIndex, span: FrameSpan, frame: &PixelBuffer)
    -> FeedResult<()>;
    /// Finalize and commit the output after the last frame.
    fn end(&mut self) -> FeedResult<()>;
    /// Best-effort abandon of the output, removing whatever was written.
    fn discard(&mut self);
}

/// One frame captured by [`InMemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedFrame {
    /// Frame index.
    pub idx: FrameIndex,
    /// Presentation span, in time units.
    pub span: FrameSpan,
    /// Copy of the packed pixels.
    pub pixels: Vec<u32>,
}

/// In-memory sink for tests and debugging.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<CapturedFrame>,
    begins: u32,
    ends: u32,
    discards: u32,
    fail_begin: bool,
    fail_at: Option<FrameIndex>,
}

impl InMemorySink {
    /// Create a new in-memory sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose `begin` fails.
    pub fn failing_begin() -> Self {
        Self {
            fail_begin: true,
            ..Self::default()
        }
    }

    /// A sink whose `push_frame` fails at frame `idx`.
    pub fn failing_at(idx: FrameIndex) -> Self {
        Self {
            fail_at: Some(idx),
            ..Self::default()
        }
    }

    /// Return the sink configuration captured in `begin`, if any.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// Borrow the captured frames.
    pub fn frames(&self) -> &[CapturedFrame] {
        &self.frames
    }

    /// Number of `begin` calls.
    pub fn begins(&self) -> u32 {
        self.begins
    }

    /// Number of `end` calls.
    pub fn ends(&self) -> u32 {
        self.ends
    }

    /// Number of `discard` calls.
    pub fn discards(&self) -> u32 {
        self.discards
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: &SinkConfig) -> FeedResult<()> {
        self.begins += 1;
        if self.fail_begin {
            return Err(FeedError::encode("in-memory sink refused to open"));
        }
        self.cfg = Some(cfg.clone());
        self.frames.clear();
        Ok(())
    }

    fn push_frame(
        &mut self,
        idx: FrameIndex,
        span: FrameSpan,
        frame: &PixelBuffer,
    ) -> FeedResult<()> {
        if self.fail_at == Some(idx) {
            return Err(FeedError::encode(format!(
                "in-memory sink refused frame {}",
                idx.0
            )));
        }
        self.frames.push(CapturedFrame {
            idx,
            span,
            pixels: frame.pixels().to_vec(),
        });
        Ok(())
    }

    fn end(&mut self) -> FeedResult<()> {
        self.ends += 1;
        Ok(())
    }

    fn discard(&mut self) {
        self.discards += 1;
    }
}
