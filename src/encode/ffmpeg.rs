use std::ffi::{OsStr, OsString};
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use tracing::{debug, warn};

use crate::encode::sink::{FrameSink, SinkConfig, VideoCodec};
use crate::foundation::core::FrameIndex;
use crate::foundation::error::{FeedError, FeedResult};
use crate::foundation::time::{FrameSpan, frame_end_time};
use crate::source::pixels::PixelBuffer;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// `ffmpeg` executable, looked up on `PATH` when not a path.
    pub program: PathBuf,
    /// Overwrite output file if it already exists.
    pub overwrite: bool,
}

impl FfmpegSinkOpts {
    /// Create options that run `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            overwrite: true,
        }
    }
}

impl Default for FfmpegSinkOpts {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

/// Sink that spawns `ffmpeg` and streams raw frames to its stdin.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<FrameIndex>,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    fn collect_stderr(&mut self) -> FeedResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => Ok(handle
                .join()
                .map_err(|_| FeedError::encode("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| FeedError::encode(format!("ffmpeg stderr read failed: {e}")))?),
            None => Ok(Vec::new()),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: &SinkConfig) -> FeedResult<()> {
        if self.child.is_some() {
            return Err(FeedError::encode("ffmpeg sink already started"));
        }

        ensure_parent_dir(&cfg.out_path)?;
        if !self.opts.overwrite && cfg.out_path.exists() {
            return Err(FeedError::validation(format!(
                "output file '{}' already exists",
                cfg.out_path.display()
            )));
        }

        if !is_ffmpeg_available(&self.opts.program) {
            return Err(FeedError::encode(format!(
                "'{}' is required for encoding, but could not be run",
                self.opts.program.display()
            )));
        }

        let args = ffmpeg_args(cfg, self.opts.overwrite);
        debug!(program = %self.opts.program.display(), ?args, "spawning encoder");
        let mut child = Command::new(&self.opts.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FeedError::encode(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| FeedError::encode("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| FeedError::encode("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        let frame_bytes = usize::try_from(cfg.resolution.frame_bytes())
            .map_err(|_| FeedError::validation(format!("{} frames are too large", cfg.resolution)))?;
        self.scratch = Vec::with_capacity(frame_bytes);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg.clone());
        self.last_idx = None;
        Ok(())
    }

    // Raw input carries no timestamps: ffmpeg derives them from the constant `-r` rate, so
    // every span must be the one that rate implies for `idx`.
    fn push_frame(
        &mut self,
        idx: FrameIndex,
        span: FrameSpan,
        frame: &PixelBuffer,
    ) -> FeedResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| FeedError::encode("ffmpeg sink not started"))?;
        let expected = FrameSpan {
            start: idx
                .0
                .checked_sub(1)
                .map_or(0, |prev| frame_end_time(cfg.fps, FrameIndex(prev))),
            end: frame_end_time(cfg.fps, idx),
        };
        if span != expected {
            return Err(FeedError::encode(format!(
                "frame {} spans {}..{}, but {} fps implies {}..{}",
                idx.0, span.start, span.end, cfg.fps, expected.start, expected.end
            )));
        }
        if let Some(last) = self.last_idx
            && idx.0 <= last.0
        {
            return Err(FeedError::encode(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        if frame.len() != cfg.resolution.pixel_count() {
            return Err(FeedError::validation(format!(
                "frame has {} pixels, expected {} for {}",
                frame.len(),
                cfg.resolution.pixel_count(),
                cfg.resolution
            )));
        }
        self.last_idx = Some(idx);

        self.scratch.clear();
        frame.write_le_bytes(&mut self.scratch);

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(FeedError::encode("ffmpeg sink is already finalized"));
        };
        stdin.write_all(&self.scratch).map_err(|e| {
            FeedError::encode(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        Ok(())
    }

    fn end(&mut self) -> FeedResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| FeedError::encode("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| FeedError::encode(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = self.collect_stderr()?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr_bytes);
            return Err(FeedError::encode(format!(
                "ffmpeg exited with status {}: {}",
                status,
                stderr.trim()
            )));
        }

        self.cfg = None;
        Ok(())
    }

    fn discard(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                debug!(error = %e, "ffmpeg already exited");
            }
            if let Err(e) = child.wait() {
                warn!(error = %e, "failed to reap ffmpeg");
            }
        }
        if let Err(e) = self.collect_stderr() {
            debug!(error = %e, "ignoring ffmpeg stderr after discard");
        }
        if let Some(cfg) = self.cfg.take()
            && cfg.out_path.exists()
            && let Err(e) = std::fs::remove_file(&cfg.out_path)
        {
            warn!(
                output = %cfg.out_path.display(),
                error = %e,
                "failed to remove discarded output"
            );
        }
    }
}

/// Build the `ffmpeg` argument list for `cfg`, output path last.
pub fn ffmpeg_args(cfg: &SinkConfig, overwrite: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |s: &str| args.push(s.into());

    push(if overwrite { "-y" } else { "-n" });
    push("-loglevel");
    push("error");

    // Input: packed 32-bit frames on stdin. `-r` before `-i` sets the input rate.
    push("-f");
    push("rawvideo");
    push("-pix_fmt");
    push(cfg.pixel_format.ffmpeg_name());
    push("-s");
    push(&cfg.resolution.to_string());
    push("-r");
    push(&cfg.fps.to_string());
    push("-i");
    push("pipe:0");

    push("-an");
    match cfg.codec {
        VideoCodec::H264 => {
            push("-c:v");
            push("libx264");
            push("-pix_fmt");
            push("yuv420p");
        }
        VideoCodec::Wmv => {
            push("-c:v");
            push("wmv2");
        }
    }
    push("-b:v");
    push(&cfg.bitrate.to_string());

    if wants_faststart(&cfg.out_path) {
        push("-movflags");
        push("+faststart");
    }

    args.push(cfg.out_path.clone().into_os_string());
    args
}

fn wants_faststart(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| matches!(ext, "mp4" | "mov" | "m4v"))
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> FeedResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `program -version` runs successfully.
pub fn is_ffmpeg_available(program: &Path) -> bool {
    Command::new(program)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
