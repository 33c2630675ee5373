use std::path::PathBuf;

use super::*;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = PathBuf::from("target").join("unit_files").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn local_files_open_size_and_delete() {
    let dir = scratch_dir("open_size_delete");
    let path = dir.join("frame.raw");
    std::fs::write(&path, [7u8; 24]).unwrap();

    let mut files = LocalFiles;
    let mut src = files.open_read(&path).unwrap();
    assert_eq!(src.size().unwrap(), 24);
    let mut bytes = Vec::new();
    src.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, vec![7u8; 24]);
    drop(src);

    files.delete_file(&path).unwrap();
    assert!(!path.exists());
    assert_eq!(
        files.delete_file(&path).unwrap_err().kind(),
        io::ErrorKind::NotFound
    );
}

#[test]
fn missing_file_is_not_found() {
    let dir = scratch_dir("missing");
    let err = LocalFiles
        .open_read(&dir.join("nope.raw"))
        .err()
        .unwrap();
    assert_eq!(err.kind(), io::ErrorKind::NotFound);
}

#[cfg(unix)]
#[test]
fn pipe_handle_opens_inherited_descriptor() {
    use std::os::fd::AsRawFd as _;

    let dir = scratch_dir("pipe_fd");
    let path = dir.join("stream.bin");
    std::fs::write(&path, b"pixels").unwrap();
    let held = File::open(&path).unwrap();

    let mut pipe = LocalFiles.open_pipe(held.as_raw_fd() as u64).unwrap();
    let mut bytes = Vec::new();
    pipe.read_to_end(&mut bytes).unwrap();
    assert_eq!(bytes, b"pixels");

    assert!(LocalFiles.open_pipe(0xfff_ffff).is_err());
}
