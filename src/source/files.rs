use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// A readable source that knows its total size.
pub trait ReadSource: Read {
    /// Total size in bytes.
    fn size(&self) -> io::Result<u64>;
}

impl ReadSource for File {
    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// File primitives used to resolve pixel sources.
pub trait FileStore {
    /// Open a file for reading.
    fn open_read(&mut self, path: &Path) -> io::Result<Box<dyn ReadSource>>;

    /// Open the inherited readable stream identified by `handle`.
    fn open_pipe(&mut self, handle: u64) -> io::Result<Box<dyn Read>>;

    /// Remove a file.
    fn delete_file(&mut self, path: &Path) -> io::Result<()>;
}

/// [`FileStore`] backed by the local file system.
///
/// Pipe handles are file descriptors inherited from the parent process. They are opened through
/// `/dev/fd/<n>`, which is only available on Unix-like systems.
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalFiles;

impl FileStore for LocalFiles {
    fn open_read(&mut self, path: &Path) -> io::Result<Box<dyn ReadSource>> {
        Ok(Box::new(File::open(path)?))
    }

    #[cfg(unix)]
    fn open_pipe(&mut self, handle: u64) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(File::open(format!("/dev/fd/{handle}"))?))
    }

    #[cfg(not(unix))]
    fn open_pipe(&mut self, handle: u64) -> io::Result<Box<dyn Read>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("inherited pipe handle {handle:#x} cannot be opened on this platform"),
        ))
    }

    fn delete_file(&mut self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/files.rs"]
mod tests;
