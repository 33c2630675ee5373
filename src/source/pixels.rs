use std::io::{self, Read};

use crate::foundation::core::Resolution;

/// Input pixel layout handed to the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum PixelFormat {
    /// Packed 32-bit pixels, bytes `B, G, R, X` in memory (little-endian `0xXXRRGGBB`).
    /// The fourth byte is ignored by the encoder.
    #[default]
    Bgrx32,
}

impl PixelFormat {
    /// Bytes per packed pixel.
    pub fn bytes_per_pixel(self) -> usize {
        4
    }

    /// Pixel format name understood by `ffmpeg -pix_fmt`.
    pub fn ffmpeg_name(self) -> &'static str {
        match self {
            Self::Bgrx32 => "bgr0",
        }
    }
}

/// Pack 8-bit channels into one [`PixelFormat::Bgrx32`] pixel.
pub fn pack_bgra(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_le_bytes([b, g, r, a])
}

/// The frame currently loaded for encoding: `width * height` packed 32-bit pixels, rows
/// top to bottom.
///
/// An empty buffer means no frame is loaded.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    pixels: Vec<u32>,
    scratch: Vec<u8>,
}

impl PixelBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pixels held.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Return `true` when no frame is loaded.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Borrow the packed pixels.
    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    /// Forget the loaded frame.
    pub fn clear(&mut self) {
        self.pixels.clear();
    }

    /// Make room for frames of `resolution` without reallocating on the first load.
    pub fn reserve_frame(&mut self, resolution: Resolution) {
        let count = resolution.pixel_count();
        self.pixels.reserve(count.saturating_sub(self.pixels.len()));
    }

    /// Take ownership of already packed pixels.
    pub fn replace(&mut self, pixels: Vec<u32>) {
        self.pixels = pixels;
    }

    /// Read exactly one frame of `resolution` from `reader`.
    ///
    /// On error the previously loaded frame is gone.
    pub fn read_frame<R: Read + ?Sized>(
        &mut self,
        reader: &mut R,
        resolution: Resolution,
    ) -> io::Result<()> {
        self.pixels.clear();
        self.scratch.resize(resolution.pixel_count() * 4, 0);
        reader.read_exact(&mut self.scratch)?;
        self.pixels.extend(
            self.scratch
                .chunks_exact(4)
                .map(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]])),
        );
        Ok(())
    }

    /// Append the frame to `out` as packed little-endian bytes.
    pub fn write_le_bytes(&self, out: &mut Vec<u8>) {
        out.reserve(self.pixels.len() * 4);
        for px in &self.pixels {
            out.extend_from_slice(&px.to_le_bytes());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/source/pixels.rs"]
mod tests;
