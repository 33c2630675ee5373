use std::cell::Cell;
use std::rc::Rc;

use super::*;
use crate::encode::sink::{InMemorySink, VideoCodec};
use crate::foundation::core::{Fps, Resolution};
use crate::source::pixels::PixelFormat;

fn cfg() -> SinkConfig {
    SinkConfig {
        out_path: PathBuf::from("out.mp4"),
        resolution: Resolution::new(4, 2).unwrap(),
        fps: Fps::DEFAULT,
        bitrate: 4_500_000,
        pixel_format: PixelFormat::Bgrx32,
        codec: VideoCodec::H264,
    }
}

fn frame() -> PixelBuffer {
    let mut buf = PixelBuffer::new();
    buf.replace(vec![0; 8]);
    buf
}

fn span(start: u64, end: u64) -> FrameSpan {
    FrameSpan { start, end }
}

#[test]
fn open_write_finalize() {
    let mut session = EncoderSession::new(InMemorySink::new());
    assert_eq!(session.state(), SessionState::Unopened);

    session.open(cfg()).unwrap();
    assert!(session.is_open());
    session
        .write_frame(FrameIndex(0), span(0, 333_333), &frame())
        .unwrap();
    session
        .write_frame(FrameIndex(1), span(333_333, 666_666), &frame())
        .unwrap();
    session.finalize().unwrap();

    assert_eq!(session.state(), SessionState::Finalized);
    assert_eq!(session.sink().frames().len(), 2);
    assert_eq!(session.sink().ends(), 1);
    assert_eq!(session.sink().discards(), 0);

    // Terminal states stay terminal.
    session.discard();
    assert_eq!(session.sink().discards(), 0);
    assert!(session.finalize().is_err());
}

#[test]
fn open_only_once() {
    let mut session = EncoderSession::new(InMemorySink::new());
    session.open(cfg()).unwrap();
    assert!(session.open(cfg()).is_err());
    assert_eq!(session.sink().begins(), 1);
}

#[test]
fn open_failure_names_output_and_resolution() {
    let mut session = EncoderSession::new(InMemorySink::failing_begin());
    let err = session.open(cfg()).unwrap_err();
    assert!(err.to_string().contains("out.mp4"));
    assert!(err.to_string().contains("4x2"));
    assert_eq!(session.state(), SessionState::Unopened);
}

#[test]
fn writes_require_open_and_contiguous_spans() {
    let mut session = EncoderSession::new(InMemorySink::new());
    assert!(
        session
            .write_frame(FrameIndex(0), span(0, 10), &frame())
            .is_err()
    );

    session.open(cfg()).unwrap();
    assert!(
        session
            .write_frame(FrameIndex(0), span(5, 10), &frame())
            .is_err()
    );
    assert!(
        session
            .write_frame(FrameIndex(0), span(0, 0), &frame())
            .is_err()
    );
    session
        .write_frame(FrameIndex(0), span(0, 10), &frame())
        .unwrap();
    assert!(
        session
            .write_frame(FrameIndex(1), span(11, 20), &frame())
            .is_err()
    );
    assert_eq!(session.sink().frames().len(), 1);
}

#[test]
fn sink_write_error_names_frame_and_output() {
    let mut session = EncoderSession::new(InMemorySink::failing_at(FrameIndex(0)));
    session.open(cfg()).unwrap();
    let err = session
        .write_frame(FrameIndex(0), span(0, 10), &frame())
        .unwrap_err();
    assert!(err.to_string().contains("frame 0"));
    assert!(err.to_string().contains("out.mp4"));
}

#[test]
fn unopened_session_finalize_and_discard_are_noops() {
    let mut session = EncoderSession::new(InMemorySink::new());
    session.finalize().unwrap();
    session.discard();
    assert_eq!(session.state(), SessionState::Unopened);
    assert_eq!(session.sink().ends(), 0);
    assert_eq!(session.sink().discards(), 0);
}

#[derive(Default)]
struct CountingSink {
    ends: Rc<Cell<u32>>,
    discards: Rc<Cell<u32>>,
}

impl FrameSink for CountingSink {
    fn begin(&mut self, _cfg: &SinkConfig) -> FeedResult<()> {
        Ok(())
    }

    fn push_frame(&mut self, _: FrameIndex, _: FrameSpan, _: &PixelBuffer) -> FeedResult<()> {
        Ok(())
    }

    fn end(&mut self) -> FeedResult<()> {
        self.ends.set(self.ends.get() + 1);
        Ok(())
    }

    fn discard(&mut self) {
        self.discards.set(self.discards.get() + 1);
    }
}

#[test]
fn dropping_an_open_session_discards() {
    let sink = CountingSink::default();
    let (ends, discards) = (sink.ends.clone(), sink.discards.clone());
    {
        let mut session = EncoderSession::new(sink);
        session.open(cfg()).unwrap();
    }
    assert_eq!(ends.get(), 0);
    assert_eq!(discards.get(), 1);
}

#[test]
fn dropping_a_finalized_session_does_not_discard() {
    let sink = CountingSink::default();
    let (ends, discards) = (sink.ends.clone(), sink.discards.clone());
    {
        let mut session = EncoderSession::new(sink);
        session.open(cfg()).unwrap();
        session.finalize().unwrap();
    }
    assert_eq!(ends.get(), 1);
    assert_eq!(discards.get(), 0);
}
