//! Encoding sinks.
//!
//! Sinks consume assembled frames in order; [`session::EncoderSession`] enforces their lifecycle.

/// `ffmpeg`-based sink (system `ffmpeg` reading raw frames on stdin).
pub mod ffmpeg;
/// Open/write/finalize/discard lifecycle around a sink.
pub mod session;
/// Generic frame sink trait and the in-memory sink.
pub mod sink;
