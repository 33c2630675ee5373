use std::path::Path;

use crate::foundation::error::{FeedError, FeedResult};
use crate::source::pixels::pack_bgra;

/// A decoded bitmap in [`PixelFormat::Bgrx32`](crate::PixelFormat::Bgrx32) layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedBitmap {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Whether the file carried an alpha channel.
    pub has_alpha: bool,
    /// `width * height` packed pixels, rows top to bottom.
    pub pixels: Vec<u32>,
}

/// Bitmap-file decoding collaborator.
pub trait BitmapDecoder {
    /// Decode the bitmap file at `path`.
    fn read_bitmap(&mut self, path: &Path) -> FeedResult<DecodedBitmap>;
}

/// [`BitmapDecoder`] built on the `image` crate's BMP codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageBitmapDecoder;

impl BitmapDecoder for ImageBitmapDecoder {
    fn read_bitmap(&mut self, path: &Path) -> FeedResult<DecodedBitmap> {
        let mut reader = image::ImageReader::open(path).map_err(|e| unreadable(path, e))?;
        reader.set_format(image::ImageFormat::Bmp);
        let img = reader.decode().map_err(|e| unreadable(path, e))?;

        let has_alpha = img.color().has_alpha();
        let rgba = img.into_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = rgba
            .pixels()
            .map(|px| {
                let [r, g, b, a] = px.0;
                pack_bgra(r, g, b, a)
            })
            .collect();

        Ok(DecodedBitmap {
            width,
            height,
            has_alpha,
            pixels,
        })
    }
}

fn unreadable(path: &Path, e: impl std::fmt::Display) -> FeedError {
    FeedError::source(format!(
        "unable to read bitmap file \"{}\": {e}",
        path.display()
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/source/bitmap.rs"]
mod tests;
