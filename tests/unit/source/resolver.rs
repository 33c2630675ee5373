use super::*;
use crate::test_support::{CountingDecoder, MemoryFiles, raw_frame};

fn res(width: u32, height: u32) -> Resolution {
    Resolution::new(width, height).unwrap()
}

#[test]
fn bitmap_path_detection() {
    assert!(is_bitmap_path("a.bmp"));
    assert!(is_bitmap_path("dir/frame 01.bmp"));
    assert!(!is_bitmap_path(".bmp"));
    assert!(!is_bitmap_path("a.BMP"));
    assert!(!is_bitmap_path("a.bmp.raw"));
}

#[test]
fn first_bitmap_establishes_resolution() {
    let decoder = CountingDecoder::default().with_bitmap("a.bmp", 4, 2, 7);
    let mut resolver = SourceResolver::new(MemoryFiles::default(), decoder);

    let (resolution, load) = resolver.load_file("a.bmp", None).unwrap();
    assert_eq!(resolution, res(4, 2));
    assert_eq!(load, SourceLoad::Loaded);
    assert_eq!(resolver.buffer().pixels(), &[7; 8]);
    assert_eq!(resolver.previous(), &PreviousSource::File("a.bmp".to_owned()));
}

#[test]
fn repeated_path_is_not_decoded_twice() {
    let decoder = CountingDecoder::default()
        .with_bitmap("a.bmp", 4, 2, 1)
        .with_bitmap("b.bmp", 4, 2, 2);
    let mut resolver = SourceResolver::new(MemoryFiles::default(), decoder);

    let (r, _) = resolver.load_file("a.bmp", None).unwrap();
    assert_eq!(
        resolver.load_file("a.bmp", Some(r)).unwrap().1,
        SourceLoad::Reused
    );
    assert_eq!(resolver.decoder().calls_for("a.bmp"), 1);

    // A different path in between makes the next `a.bmp` a fresh decode.
    resolver.load_file("b.bmp", Some(r)).unwrap();
    resolver.load_file("a.bmp", Some(r)).unwrap();
    assert_eq!(resolver.decoder().calls_for("a.bmp"), 2);
    assert_eq!(resolver.buffer().pixels()[0], 1);
}

#[test]
fn repeated_raw_path_is_not_read_twice() {
    let files = MemoryFiles::default().with_file("f.raw", raw_frame(8, 9));
    let mut resolver = SourceResolver::new(files, CountingDecoder::default());

    resolver.load_file("f.raw", Some(res(4, 2))).unwrap();
    let (_, load) = resolver.load_file("f.raw", Some(res(4, 2))).unwrap();
    assert_eq!(load, SourceLoad::Reused);
    assert_eq!(resolver.files().opened.len(), 1);
}

#[test]
fn bitmap_must_match_known_resolution() {
    let decoder = CountingDecoder::default().with_bitmap("big.bmp", 8, 8, 0);
    let mut resolver = SourceResolver::new(MemoryFiles::default(), decoder);
    let err = resolver.load_file("big.bmp", Some(res(4, 2))).unwrap_err();
    assert!(matches!(err, FeedError::Validation(_)));
    assert!(err.to_string().contains("8x8"));
    assert!(err.to_string().contains("4x2"));
}

#[test]
fn odd_or_empty_bitmap_cannot_establish_resolution() {
    let decoder = CountingDecoder::default()
        .with_bitmap("odd.bmp", 3, 2, 0)
        .with_bitmap("empty.bmp", 0, 0, 0);
    let mut resolver = SourceResolver::new(MemoryFiles::default(), decoder);

    let err = resolver.load_file("odd.bmp", None).unwrap_err();
    assert!(err.to_string().contains("odd"));
    assert!(err.to_string().contains("odd.bmp"));

    let err = resolver.load_file("empty.bmp", None).unwrap_err();
    assert!(err.to_string().contains("zero"));
}

#[test]
fn raw_file_needs_resolution_and_exact_size() {
    let files = MemoryFiles::default()
        .with_file("ok.raw", raw_frame(8, 1))
        .with_file("short.raw", raw_frame(4, 1));
    let mut resolver = SourceResolver::new(files, CountingDecoder::default());

    let err = resolver.load_file("ok.raw", None).unwrap_err();
    assert!(matches!(err, FeedError::Validation(_)));
    assert!(err.to_string().contains("ok.raw"));

    let err = resolver.load_file("short.raw", Some(res(4, 2))).unwrap_err();
    assert!(matches!(err, FeedError::Source(_)));
    assert!(err.to_string().contains("must have size 32"));

    let err = resolver.load_file("missing.raw", Some(res(4, 2))).unwrap_err();
    assert!(err.to_string().contains("unable to open"));

    resolver.load_file("ok.raw", Some(res(4, 2))).unwrap();
    assert_eq!(resolver.buffer().pixels(), &[1; 8]);
}

#[test]
fn pipe_reads_fresh_frames_and_clears_previous() {
    let mut stream = raw_frame(8, 5);
    stream.extend(raw_frame(8, 6));
    let files = MemoryFiles::default()
        .with_file("f.raw", raw_frame(8, 1))
        .with_pipe(0x1f4, stream);
    let mut resolver = SourceResolver::new(files, CountingDecoder::default());
    let r = res(4, 2);

    resolver.load_file("f.raw", Some(r)).unwrap();
    resolver.load_pipe(0x1f4, r).unwrap();
    assert_eq!(resolver.previous(), &PreviousSource::None);
    assert_eq!(resolver.buffer().pixels(), &[5; 8]);

    // Same handle again continues the stream and keeps the handle open.
    resolver.load_pipe(0x1f4, r).unwrap();
    assert_eq!(resolver.buffer().pixels(), &[6; 8]);
    assert_eq!(resolver.files().pipes_opened, vec![0x1f4]);

    // The pipe frame can still be repeated but `f.raw` is no longer the previous source.
    assert!(resolver.has_frame());
    assert!(resolver.delete_previous().is_none());
}

#[test]
fn short_pipe_read_is_fatal() {
    let files = MemoryFiles::default().with_pipe(3, raw_frame(7, 0));
    let mut resolver = SourceResolver::new(files, CountingDecoder::default());
    let err = resolver.load_pipe(3, res(4, 2)).unwrap_err();
    assert!(matches!(err, FeedError::Source(_)));
    assert!(err.to_string().contains("32 bytes"));

    let err = resolver.load_pipe(4, res(4, 2)).unwrap_err();
    assert!(err.to_string().contains("unable to open pipe"));
}

#[test]
fn delete_removes_previous_file_once() {
    let files = MemoryFiles::default().with_file("f.raw", raw_frame(8, 1));
    let mut resolver = SourceResolver::new(files, CountingDecoder::default());

    assert!(resolver.delete_previous().is_none());
    assert!(resolver.files().deleted.is_empty());

    resolver.load_file("f.raw", Some(res(4, 2))).unwrap();
    let (path, result) = resolver.delete_previous().unwrap();
    assert_eq!(path, "f.raw");
    result.unwrap();
    assert!(!resolver.has_frame());
    assert_eq!(resolver.previous(), &PreviousSource::None);

    assert!(resolver.delete_previous().is_none());
    assert_eq!(resolver.files().deleted, vec![std::path::PathBuf::from("f.raw")]);
}
