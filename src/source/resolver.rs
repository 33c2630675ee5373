use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::io::{self, Read};
use std::path::Path;

use tracing::debug;

use crate::foundation::core::Resolution;
use crate::foundation::error::{FeedError, FeedResult};
use crate::source::bitmap::BitmapDecoder;
use crate::source::files::FileStore;
use crate::source::pixels::PixelBuffer;

/// The most recently loaded file-backed source.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum PreviousSource {
    /// Nothing loaded, or the last frame came from a pipe.
    #[default]
    None,
    /// Path exactly as it appeared in the command.
    File(String),
}

/// Whether a file-backed source was read or served from the loaded buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceLoad {
    /// The source was decoded or read.
    Loaded,
    /// The source repeated the previous path; the loaded frame was kept.
    Reused,
}

/// Return `true` when `path` names a bitmap file (case-sensitive `.bmp` suffix after a
/// non-empty stem).
pub fn is_bitmap_path(path: &str) -> bool {
    path.len() > 4 && path.ends_with(".bmp")
}

/// Turns source commands into the loaded [`PixelBuffer`].
///
/// Owns the single loaded frame and the identity of the file it came from, which is what makes
/// repeated paths free and lets `delete` find its target.
pub struct SourceResolver<F, D> {
    files: F,
    decoder: D,
    buffer: PixelBuffer,
    previous: PreviousSource,
    pipes: HashMap<u64, Box<dyn Read>>,
}

impl<F: FileStore, D: BitmapDecoder> SourceResolver<F, D> {
    /// Create a resolver with nothing loaded.
    pub fn new(files: F, decoder: D) -> Self {
        Self {
            files,
            decoder,
            buffer: PixelBuffer::new(),
            previous: PreviousSource::None,
            pipes: HashMap::new(),
        }
    }

    /// The loaded frame (empty when nothing is loaded).
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Return `true` when a frame is loaded and can be repeated.
    pub fn has_frame(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// The file the loaded frame came from, if any.
    pub fn previous(&self) -> &PreviousSource {
        &self.previous
    }

    /// Borrow the file store.
    pub fn files(&self) -> &F {
        &self.files
    }

    /// Borrow the bitmap decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Size the buffer for frames of `resolution`.
    pub fn reserve(&mut self, resolution: Resolution) {
        self.buffer.reserve_frame(resolution);
    }

    /// Load the frame named by `path` and return its resolution.
    ///
    /// `known` is the resolution fixed so far, if any. Bitmaps must match it exactly, or
    /// establish it when there is none. Other files need it to know their exact byte size.
    pub fn load_file(
        &mut self,
        path: &str,
        known: Option<Resolution>,
    ) -> FeedResult<(Resolution, SourceLoad)> {
        if let Some(resolution) = known
            && self.has_frame()
            && matches!(&self.previous, PreviousSource::File(prev) if prev == path)
        {
            debug!(path, "reusing loaded frame");
            return Ok((resolution, SourceLoad::Reused));
        }

        let resolution = if is_bitmap_path(path) {
            self.load_bitmap(path, known)?
        } else {
            let resolution = known.ok_or_else(|| {
                FeedError::validation(format!(
                    "no resolution specified and \"{path}\" is not a bitmap file, so the resolution cannot be deduced"
                ))
            })?;
            self.load_raw(path, resolution)?;
            resolution
        };

        self.previous = PreviousSource::File(path.to_owned());
        Ok((resolution, SourceLoad::Loaded))
    }

    /// Read one frame of `resolution` from the inherited stream `handle`.
    ///
    /// Streams stay open between commands, so consecutive frames on one handle continue where
    /// the previous read stopped. Pipe frames are never reused by path and cannot be deleted.
    pub fn load_pipe(&mut self, handle: u64, resolution: Resolution) -> FeedResult<()> {
        let pipe = match self.pipes.entry(handle) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let pipe = self.files.open_pipe(handle).map_err(|e| {
                    FeedError::source(format!("unable to open pipe \"{handle:x}\": {e}"))
                })?;
                entry.insert(pipe)
            }
        };

        self.previous = PreviousSource::None;
        self.buffer.read_frame(pipe, resolution).map_err(|e| {
            FeedError::source(format!(
                "unable to read {} bytes from pipe \"{handle:x}\": {e}",
                resolution.frame_bytes()
            ))
        })?;
        debug!(handle, %resolution, "read frame from pipe");
        Ok(())
    }

    /// Delete the previous file-backed source and forget the loaded frame.
    ///
    /// Returns `None` when there is no previous file; otherwise the path and the outcome of
    /// the deletion.
    pub fn delete_previous(&mut self) -> Option<(String, io::Result<()>)> {
        let PreviousSource::File(path) = std::mem::take(&mut self.previous) else {
            return None;
        };
        let result = self.files.delete_file(Path::new(&path));
        self.buffer.clear();
        Some((path, result))
    }

    fn load_bitmap(&mut self, path: &str, known: Option<Resolution>) -> FeedResult<Resolution> {
        let bitmap = self.decoder.read_bitmap(Path::new(path))?;

        let resolution = match known {
            Some(resolution) => {
                if bitmap.width != resolution.width || bitmap.height != resolution.height {
                    return Err(FeedError::validation(format!(
                        "bitmap \"{path}\" is {}x{}, but the video is {resolution}",
                        bitmap.width, bitmap.height
                    )));
                }
                resolution
            }
            None => Resolution::new(bitmap.width, bitmap.height).map_err(|e| match e {
                FeedError::Validation(msg) => {
                    FeedError::validation(format!("{msg} (from bitmap \"{path}\")"))
                }
                other => other,
            })?,
        };

        if bitmap.pixels.len() != resolution.pixel_count() {
            return Err(FeedError::source(format!(
                "bitmap \"{path}\" decoded to {} pixels, expected {}",
                bitmap.pixels.len(),
                resolution.pixel_count()
            )));
        }

        debug!(path, %resolution, has_alpha = bitmap.has_alpha, "decoded bitmap");
        self.buffer.replace(bitmap.pixels);
        Ok(resolution)
    }

    fn load_raw(&mut self, path: &str, resolution: Resolution) -> FeedResult<()> {
        let mut file = self.files.open_read(Path::new(path)).map_err(|e| {
            FeedError::source(format!("unable to open non-bitmap file \"{path}\": {e}"))
        })?;

        let expected = resolution.frame_bytes();
        let size = file.size().map_err(|e| {
            FeedError::source(format!("unable to get size of non-bitmap file \"{path}\": {e}"))
        })?;
        if size != expected {
            return Err(FeedError::source(format!(
                "non-bitmap file \"{path}\" must have size {expected} for {resolution}, but has size {size}"
            )));
        }

        self.buffer.read_frame(&mut file, resolution).map_err(|e| {
            FeedError::source(format!(
                "unable to read {expected} bytes from non-bitmap file \"{path}\": {e}"
            ))
        })?;
        debug!(path, %resolution, "read raw frame");
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/resolver.rs"]
mod tests;
