//! Command interpreter and frame assembly.
//!
//! [`Assembler::step`] applies one command line to the encoding state, loads pixel sources and
//! writes timestamped frames. [`Assembler::run`] drives a whole command stream and owns the
//! encoder's end of life: finalize on normal end, discard on `cancel` or any fatal error.

use std::io::BufRead;

use tracing::{debug, info, warn};

use crate::assemble::state::{EncodingState, FeedOpts};
use crate::command::lexer::CommandLexer;
use crate::command::parse::{Command, FrameSource, Keyword, parse_command};
use crate::encode::session::{EncoderSession, SessionState};
use crate::encode::sink::FrameSink;
use crate::foundation::core::{Fps, Resolution};
use crate::foundation::error::{FeedError, FeedResult};
use crate::source::bitmap::BitmapDecoder;
use crate::source::files::FileStore;
use crate::source::resolver::{SourceLoad, SourceResolver};

/// A command that was ignored. Processing continues after each of these.
#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum CommandWarning {
    /// The argument did not parse.
    #[error("invalid \"{usage}\" command: \"{line}\"")]
    Malformed {
        /// Expected form of the command.
        usage: &'static str,
        /// The command as read.
        line: String,
    },

    /// A structural command after the first frame.
    #[error("\"{line}\" ignored: video already started")]
    Locked {
        /// The command as read.
        line: String,
    },

    /// `bitrate 0`.
    #[error("invalid \"bitrate <number>\" command: bitrate must be non-zero")]
    ZeroBitrate,

    /// A resolution with a zero dimension.
    #[error(
        "invalid \"resolution <number>x<number>\" command: either width or height is zero in {width}x{height}"
    )]
    ZeroResolution {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },

    /// `delete` with no previous file.
    #[error("invalid \"delete\" command: no previous file to delete")]
    NothingToDelete,

    /// The file system refused to delete the previous file.
    #[error("unable to delete \"{path}\": {reason}")]
    DeleteFailed {
        /// File that was to be deleted.
        path: String,
        /// Error reported by the file system.
        reason: String,
    },

    /// `repeat` with no loaded frame.
    #[error("invalid \"repeat <number>\" command: no previous frame to repeat")]
    NothingToRepeat,

    /// `output` after the encoder opened.
    #[error("\"output {path}\" ignored: already writing \"{current}\"")]
    OutputAfterStart {
        /// Requested path.
        path: String,
        /// Path being written.
        current: String,
    },
}

/// Whether to keep reading commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Read the next command.
    Continue,
    /// `cancel` was read.
    Cancel,
}

/// How a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Input ended and the video was finalized.
    Completed,
    /// `cancel` was read; any partial output was discarded.
    Cancelled,
    /// Input ended before any frame; nothing was created.
    NoFrames,
}

/// What a run produced.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Output path in effect at the end of the run.
    pub output: Option<String>,
    /// Frame size, if one was ever set.
    pub resolution: Option<Resolution>,
    /// Frame rate used.
    pub fps: Fps,
    /// Average bitrate used.
    pub bitrate: u32,
    /// Frames handed to the encoder.
    pub frames_written: u64,
    /// File or pipe reads that produced a new frame.
    pub sources_loaded: u64,
    /// File sources served from the already loaded frame.
    pub sources_reused: u64,
    /// End time of the last frame, in 100 ns units.
    pub duration_time_units: u64,
    /// Final encoder state.
    pub encoder: SessionState,
    /// Every warning, in order.
    pub warnings: Vec<String>,
}

/// The frame-assembly state machine.
pub struct Assembler<S: FrameSink, F, D> {
    state: EncodingState,
    sources: SourceResolver<F, D>,
    session: EncoderSession<S>,
    warnings: Vec<CommandWarning>,
    sources_loaded: u64,
    sources_reused: u64,
}

impl<S: FrameSink, F: FileStore, D: BitmapDecoder> Assembler<S, F, D> {
    /// Create an assembler with the initial parameters in `opts`.
    ///
    /// Fails when `opts` holds an invalid frame rate, resolution or bitrate.
    pub fn new(opts: &FeedOpts, sink: S, files: F, decoder: D) -> FeedResult<Self> {
        let state = EncodingState::new(opts)?;
        let mut sources = SourceResolver::new(files, decoder);
        if let Some(resolution) = state.resolution {
            sources.reserve(resolution);
        }
        Ok(Self {
            state,
            sources,
            session: EncoderSession::new(sink),
            warnings: Vec::new(),
            sources_loaded: 0,
            sources_reused: 0,
        })
    }

    /// Current encoding parameters.
    pub fn state(&self) -> &EncodingState {
        &self.state
    }

    /// The encoder session.
    pub fn session(&self) -> &EncoderSession<S> {
        &self.session
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        self.session.sink()
    }

    /// Borrow the source resolver.
    pub fn sources(&self) -> &SourceResolver<F, D> {
        &self.sources
    }

    /// Warnings raised so far, in order.
    pub fn warnings(&self) -> &[CommandWarning] {
        &self.warnings
    }

    /// Read commands until end of input, a sentinel, `cancel` or a fatal error.
    ///
    /// On normal end an open encoder is finalized. On `cancel` or error it is discarded.
    pub fn run<R: BufRead>(&mut self, lexer: &mut CommandLexer<R>) -> FeedResult<RunSummary> {
        let flow = match self.drive(lexer) {
            Ok(flow) => flow,
            Err(e) => {
                self.session.discard();
                return Err(e);
            }
        };

        let outcome = match flow {
            Flow::Cancel => {
                info!("cancelling video encoding");
                self.session.discard();
                RunOutcome::Cancelled
            }
            Flow::Continue if self.state.is_locked() => {
                self.session.finalize()?;
                info!(
                    frames = self.state.clock.frames_written(),
                    output = self.state.output.as_deref().unwrap_or_default(),
                    "video finalized"
                );
                RunOutcome::Completed
            }
            Flow::Continue => {
                self.session.finalize()?;
                RunOutcome::NoFrames
            }
        };
        Ok(self.summary(outcome))
    }

    fn drive<R: BufRead>(&mut self, lexer: &mut CommandLexer<R>) -> FeedResult<Flow> {
        while let Some(line) = lexer.next_line()? {
            if self.step(&line)? == Flow::Cancel {
                return Ok(Flow::Cancel);
            }
        }
        Ok(Flow::Continue)
    }

    /// Apply one command line.
    ///
    /// Returns an error only for fatal conditions. Ignored commands are logged and recorded in
    /// [`Assembler::warnings`].
    pub fn step(&mut self, line: &str) -> FeedResult<Flow> {
        match parse_command(line) {
            Command::Cancel => return Ok(Flow::Cancel),
            Command::Delete => self.delete_previous(),
            Command::Repeat(count) => self.repeat(count)?,
            Command::Fps(fps) => {
                if self.state.is_locked() {
                    self.warn(CommandWarning::Locked { line: line.to_owned() });
                } else {
                    self.state.fps = fps;
                }
            }
            Command::Bitrate(bitrate) => {
                if self.state.is_locked() {
                    self.warn(CommandWarning::Locked { line: line.to_owned() });
                } else if bitrate == 0 {
                    self.warn(CommandWarning::ZeroBitrate);
                } else {
                    self.state.bitrate = bitrate;
                }
            }
            Command::Resolution { width, height } => self.set_resolution(line, width, height)?,
            Command::Output(path) => {
                if self.session.is_open() {
                    self.warn(CommandWarning::OutputAfterStart {
                        path: path.to_owned(),
                        current: self.state.output.clone().unwrap_or_default(),
                    });
                } else {
                    self.state.set_output(path);
                }
            }
            Command::Frame(source) => {
                self.load(source)?;
                self.write_loaded_frame()?;
            }
            Command::Malformed {
                keyword: Keyword::Pipe,
                arg,
            } => {
                return Err(FeedError::validation(format!(
                    "invalid pipe \"{arg}\" specified"
                )));
            }
            Command::Malformed { keyword, .. } => self.warn(CommandWarning::Malformed {
                usage: keyword.usage(),
                line: line.to_owned(),
            }),
        }
        Ok(Flow::Continue)
    }

    fn set_resolution(&mut self, line: &str, width: u32, height: u32) -> FeedResult<()> {
        // Odd sizes are fatal even once the video has started.
        let resolution = match Resolution::new(width, height) {
            Ok(resolution) => Some(resolution),
            Err(_) if width.is_multiple_of(2) && height.is_multiple_of(2) => None,
            Err(e) => return Err(e),
        };

        if self.state.is_locked() {
            self.warn(CommandWarning::Locked { line: line.to_owned() });
            return Ok(());
        }
        match resolution {
            Some(resolution) => {
                self.state.resolution = Some(resolution);
                self.sources.reserve(resolution);
            }
            None => self.warn(CommandWarning::ZeroResolution { width, height }),
        }
        Ok(())
    }

    fn delete_previous(&mut self) {
        match self.sources.delete_previous() {
            None => self.warn(CommandWarning::NothingToDelete),
            Some((path, Ok(()))) => debug!(path, "deleted previous source"),
            Some((path, Err(e))) => self.warn(CommandWarning::DeleteFailed {
                path,
                reason: e.to_string(),
            }),
        }
    }

    fn repeat(&mut self, count: u64) -> FeedResult<()> {
        if !self.sources.has_frame() {
            self.warn(CommandWarning::NothingToRepeat);
            return Ok(());
        }
        // The frame was already written once.
        for _ in 1..count {
            self.write_loaded_frame()?;
        }
        Ok(())
    }

    fn load(&mut self, source: FrameSource<'_>) -> FeedResult<()> {
        match source {
            FrameSource::File(path) => {
                let (resolution, load) = self.sources.load_file(path, self.state.resolution)?;
                self.state.resolution = Some(resolution);
                match load {
                    SourceLoad::Loaded => self.sources_loaded += 1,
                    SourceLoad::Reused => self.sources_reused += 1,
                }
            }
            FrameSource::Pipe(handle) => {
                let resolution = self.state.resolution.ok_or_else(|| {
                    FeedError::validation(format!(
                        "no resolution specified and pipe \"{handle:x}\" is not a bitmap file, so the resolution cannot be deduced"
                    ))
                })?;
                self.sources.load_pipe(handle, resolution)?;
                self.sources_loaded += 1;
            }
        }
        Ok(())
    }

    fn write_loaded_frame(&mut self) -> FeedResult<()> {
        if !self.session.is_open() {
            let cfg = self.state.sink_config()?;
            info!(
                output = %cfg.out_path.display(),
                resolution = %cfg.resolution,
                fps = %cfg.fps,
                bitrate = cfg.bitrate,
                codec = ?cfg.codec,
                "opening encoder"
            );
            self.session.open(cfg)?;
        }

        let idx = self.state.clock.next_index();
        let span = self.state.clock.next_span(self.state.fps);
        self.session
            .write_frame(idx, span, self.sources.buffer())?;
        self.state.clock.advance(span);
        Ok(())
    }

    fn warn(&mut self, warning: CommandWarning) {
        warn!("{warning}");
        self.warnings.push(warning);
    }

    fn summary(&self, outcome: RunOutcome) -> RunSummary {
        RunSummary {
            outcome,
            output: self.state.output.clone(),
            resolution: self.state.resolution,
            fps: self.state.fps,
            bitrate: self.state.bitrate,
            frames_written: self.state.clock.frames_written(),
            sources_loaded: self.sources_loaded,
            sources_reused: self.sources_reused,
            duration_time_units: self.state.clock.elapsed(),
            encoder: self.session.state(),
            warnings: self.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/assembler.rs"]
mod tests;
