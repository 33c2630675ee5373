use std::path::PathBuf;

use tracing::warn;

use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FeedError, FeedResult};
use crate::foundation::time::FrameSpan;
use crate::source::pixels::PixelBuffer;

/// Lifecycle of the encoder output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No frame written yet; nothing exists on disk.
    Unopened,
    /// Accepting frames.
    Open,
    /// Output committed.
    Finalized,
    /// Output abandoned.
    Discarded,
}

/// Owns a [`FrameSink`] and enforces `Unopened -> Open -> Finalized | Discarded`.
///
/// Dropping a session that is still open discards the output.
pub struct EncoderSession<S: FrameSink> {
    sink: S,
    state: SessionState,
    out_path: PathBuf,
    last_end: u64,
}

impl<S: FrameSink> EncoderSession<S> {
    /// Wrap `sink` in an unopened session.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: SessionState::Unopened,
            out_path: PathBuf::new(),
            last_end: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Return `true` while frames can be written.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Borrow the sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Open the output. Only valid once, from `Unopened`.
    pub fn open(&mut self, cfg: SinkConfig) -> FeedResult<()> {
        if self.state != SessionState::Unopened {
            return Err(FeedError::encode(format!(
                "encoder cannot be opened twice (state: {:?})",
                self.state
            )));
        }
        self.sink.begin(&cfg).map_err(|e| {
            FeedError::encode(format!(
                "unable to create video writer for \"{}\" with {} resolution: {e}",
                cfg.out_path.display(),
                cfg.resolution
            ))
        })?;
        self.out_path = cfg.out_path;
        self.state = SessionState::Open;
        Ok(())
    }

    /// Write one frame. Spans must continue exactly where the previous frame ended.
    #[tracing::instrument(level = "trace", skip(self, frame))]
    pub fn write_frame(
        &mut self,
        idx: FrameIndex,
        span: FrameSpan,
        frame: &PixelBuffer,
    ) -> FeedResult<()> {
        if self.state != SessionState::Open {
            return Err(FeedError::encode(format!(
                "cannot write frame {} while the encoder is {:?}",
                idx.0, self.state
            )));
        }
        if span.start != self.last_end || span.end <= span.start {
            return Err(FeedError::encode(format!(
                "frame {} span {}..{} does not continue from {}",
                idx.0, span.start, span.end, self.last_end
            )));
        }
        self.sink.push_frame(idx, span, frame).map_err(|e| {
            FeedError::encode(format!(
                "failed to write frame {} of \"{}\": {e}",
                idx.0,
                self.out_path.display()
            ))
        })?;
        self.last_end = span.end;
        Ok(())
    }

    /// Commit the output. A session that never opened has nothing to finalize.
    pub fn finalize(&mut self) -> FeedResult<()> {
        match self.state {
            SessionState::Unopened => Ok(()),
            SessionState::Open => {
                self.state = SessionState::Finalized;
                self.sink.end().map_err(|e| {
                    FeedError::encode(format!(
                        "failed to finalize \"{}\": {e}",
                        self.out_path.display()
                    ))
                })
            }
            SessionState::Finalized | SessionState::Discarded => Err(FeedError::encode(
                format!("encoder already {:?}", self.state),
            )),
        }
    }

    /// Abandon the output if it is open. No-op otherwise.
    pub fn discard(&mut self) {
        if self.state == SessionState::Open {
            self.state = SessionState::Discarded;
            self.sink.discard();
        }
    }
}

impl<S: FrameSink> Drop for EncoderSession<S> {
    fn drop(&mut self) {
        if self.state == SessionState::Open {
            warn!(
                output = %self.out_path.display(),
                "encoder dropped while open, discarding output"
            );
            self.discard();
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/encode/session.rs"]
mod tests;
