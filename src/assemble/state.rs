use std::path::PathBuf;

use crate::encode::sink::{SinkConfig, VideoCodec};
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{FeedError, FeedResult};
use crate::foundation::time::FrameClock;
use crate::source::pixels::PixelFormat;

/// Average bitrate used when none is given.
pub const DEFAULT_BITRATE: u32 = 4_500_000;

/// Initial encoding parameters, equivalent to leading `resolution`, `fps`, `bitrate` and
/// `output` commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedOpts {
    /// Frame size. When unset, the first bitmap decides it.
    pub resolution: Option<Resolution>,
    /// Frame rate.
    pub fps: Fps,
    /// Target average bits per second. Must be non-zero.
    pub bitrate: u32,
    /// Output video path.
    pub output: Option<String>,
}

impl Default for FeedOpts {
    fn default() -> Self {
        Self {
            resolution: None,
            fps: Fps::DEFAULT,
            bitrate: DEFAULT_BITRATE,
            output: None,
        }
    }
}

/// Encoding parameters accumulated from commands, plus the frame clock.
///
/// Structural fields (`resolution`, `fps`, `bitrate`) may only change while no frame has been
/// written. The assembler enforces this through [`EncodingState::is_locked`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodingState {
    /// Frame size, once known.
    pub resolution: Option<Resolution>,
    /// Frame rate.
    pub fps: Fps,
    /// Target average bits per second.
    pub bitrate: u32,
    /// Layout of the pixels handed to the encoder.
    pub pixel_format: PixelFormat,
    /// Codec picked from the output path.
    pub codec: VideoCodec,
    /// Output video path.
    pub output: Option<String>,
    /// Index and start time of the next frame.
    pub clock: FrameClock,
}

impl EncodingState {
    /// Build the initial state from `opts`.
    ///
    /// `Fps` and `Resolution` have public fields, so both are validated again here.
    pub fn new(opts: &FeedOpts) -> FeedResult<Self> {
        if opts.bitrate == 0 {
            return Err(FeedError::validation("bitrate must be > 0"));
        }
        let fps = Fps::new(opts.fps.num, opts.fps.den)?;
        let resolution = opts
            .resolution
            .map(|r| Resolution::new(r.width, r.height))
            .transpose()?;
        let mut state = Self {
            resolution,
            fps,
            bitrate: opts.bitrate,
            pixel_format: PixelFormat::Bgrx32,
            codec: VideoCodec::default(),
            output: None,
            clock: FrameClock::default(),
        };
        if let Some(output) = &opts.output {
            state.set_output(output);
        }
        Ok(state)
    }

    /// Return `true` once the first frame has been written.
    pub fn is_locked(&self) -> bool {
        self.clock.frames_written() > 0
    }

    /// Set the output path and pick the codec from its extension.
    pub fn set_output(&mut self, path: &str) {
        self.codec = VideoCodec::for_output(path);
        self.output = Some(path.to_owned());
    }

    /// Encoder configuration for the current state.
    pub fn sink_config(&self) -> FeedResult<SinkConfig> {
        let output = self
            .output
            .as_deref()
            .ok_or_else(|| FeedError::validation("no output filename specified"))?;
        let resolution = self
            .resolution
            .ok_or_else(|| FeedError::validation("no resolution specified"))?;
        Ok(SinkConfig {
            out_path: PathBuf::from(output),
            resolution,
            fps: self.fps,
            bitrate: self.bitrate,
            pixel_format: self.pixel_format,
            codec: self.codec,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/state.rs"]
mod tests;
