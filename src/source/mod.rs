//! Pixel sources: bitmap files, raw pixel files and inherited pipes.

/// Bitmap decoding.
pub mod bitmap;
/// File primitives.
pub mod files;
/// Packed pixel buffers.
pub mod pixels;
/// Resolution of source commands into the loaded frame.
pub mod resolver;
