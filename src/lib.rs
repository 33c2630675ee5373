//! framefeed turns a line-oriented command stream into timestamped raw frames for a video
//! encoder.
//!
//! Commands set the encoding parameters (`resolution`, `fps`, `bitrate`, `output`), name pixel
//! sources (bitmap files, raw pixel files, inherited pipes) and control the run (`repeat`,
//! `delete`, `cancel`). The public API is built around one [`Assembler`] per run:
//!
//! - Build it from [`FeedOpts`], a [`FrameSink`] and the file and bitmap collaborators
//! - Drive it with a [`CommandLexer`] via [`Assembler::run`], or line by line via
//!   [`Assembler::step`]
//! - Inspect the returned [`RunSummary`]
//!
//! [`feed`] wires the local file system and the `image` bitmap decoder for the common case.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

/// Frame assembly.
pub mod assemble;
/// Command protocol.
pub mod command;
/// Encoding sinks.
pub mod encode;
/// Pixel sources.
pub mod source;

#[cfg(test)]
#[path = "../tests/unit/support.rs"]
mod test_support;

use std::io::BufRead;

pub use crate::foundation::core::{Fps, FrameIndex, Resolution};
pub use crate::foundation::error::{FeedError, FeedResult};
pub use crate::foundation::time::{FrameClock, FrameSpan, TIME_UNITS_PER_SECOND, frame_end_time};

pub use crate::assemble::assembler::{Assembler, CommandWarning, Flow, RunOutcome, RunSummary};
pub use crate::assemble::state::{DEFAULT_BITRATE, EncodingState, FeedOpts};
pub use crate::command::lexer::{CommandLexer, SENTINELS};
pub use crate::command::parse::{Command, FrameSource, parse_command};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ffmpeg_args, is_ffmpeg_available};
pub use crate::encode::session::{EncoderSession, SessionState};
pub use crate::encode::sink::{CapturedFrame, FrameSink, InMemorySink, SinkConfig, VideoCodec};
pub use crate::source::bitmap::{BitmapDecoder, DecodedBitmap, ImageBitmapDecoder};
pub use crate::source::files::{FileStore, LocalFiles, ReadSource};
pub use crate::source::pixels::{PixelBuffer, PixelFormat};
pub use crate::source::resolver::{PreviousSource, SourceLoad, SourceResolver};

/// Run the command stream `input` against `sink`, reading sources from the local file system.
pub fn feed<R: BufRead, S: FrameSink>(input: R, opts: &FeedOpts, sink: S) -> FeedResult<RunSummary> {
    let mut assembler = Assembler::new(opts, sink, LocalFiles, ImageBitmapDecoder)?;
    let mut lexer = CommandLexer::new(input);
    assembler.run(&mut lexer)
}
