use std::fmt;
use std::str::FromStr;

use crate::foundation::error::{FeedError, FeedResult};
use crate::foundation::time::TIME_UNITS_PER_SECOND;

/// Absolute 0-based frame index in output timeline space.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize,
)]
pub struct FrameIndex(pub u64);

/// Frames-per-second represented as a rational `num/den`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Fps {
    /// Numerator (frames).
    pub num: u32,
    /// Denominator (seconds), must be non-zero.
    pub den: u32,
}

impl Fps {
    /// 30 frames per second.
    pub const DEFAULT: Self = Self { num: 30, den: 1 };

    /// Create a validated FPS value.
    ///
    /// The rate must stay below one frame per time unit so every frame lasts at least one
    /// whole time unit.
    pub fn new(num: u32, den: u32) -> FeedResult<Self> {
        if den == 0 {
            return Err(FeedError::validation("fps denominator must be > 0"));
        }
        if num == 0 {
            return Err(FeedError::validation("fps numerator must be > 0"));
        }
        if u64::from(num) >= TIME_UNITS_PER_SECOND * u64::from(den) {
            return Err(FeedError::validation(format!(
                "fps {num}/{den} must be below {TIME_UNITS_PER_SECOND} frames per second"
            )));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating-point FPS.
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }
}

impl Default for Fps {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Fps {
    type Err = FeedError;

    /// Parse `<n>` or `<n>/<d>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (num, den) = match s.split_once('/') {
            Some((num, den)) => (parse_decimal::<u32>(num), parse_decimal::<u32>(den)),
            None => (parse_decimal::<u32>(s), Some(1)),
        };
        match (num, den) {
            (Some(num), Some(den)) => Self::new(num, den),
            _ => Err(FeedError::validation(format!(
                "invalid fps '{s}', expected <number> or <number>/<number>"
            ))),
        }
    }
}

/// Output frame dimensions in pixels.
///
/// Both dimensions are non-zero and even: the supported codecs subsample chroma 2x2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Resolution {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Resolution {
    /// Create a validated resolution.
    pub fn new(width: u32, height: u32) -> FeedResult<Self> {
        if !width.is_multiple_of(2) || !height.is_multiple_of(2) {
            return Err(FeedError::validation(format!(
                "video codecs do not support odd width or height ({width}x{height})"
            )));
        }
        if width == 0 || height == 0 {
            return Err(FeedError::validation(format!(
                "either width or height is zero in {width}x{height} resolution"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels in one frame.
    pub fn pixel_count(self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size in bytes of one packed 32-bit frame.
    pub fn frame_bytes(self) -> u64 {
        u64::from(self.width) * u64::from(self.height) * 4
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = FeedError;

    /// Parse `<w>x<h>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = parse_dimensions(s).ok_or_else(|| {
            FeedError::validation(format!(
                "invalid resolution '{s}', expected <number>x<number>"
            ))
        })?;
        Self::new(width, height)
    }
}

/// Parse `<w>x<h>` without validating the values.
pub(crate) fn parse_dimensions(s: &str) -> Option<(u32, u32)> {
    let (width, height) = s.split_once('x')?;
    Some((parse_decimal(width)?, parse_decimal(height)?))
}

/// Parse an unsigned decimal number made only of ASCII digits (no sign, no whitespace).
pub(crate) fn parse_decimal<T: FromStr>(s: &str) -> Option<T> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Parse an unsigned hexadecimal number, with an optional `0x`/`0X` prefix.
pub(crate) fn parse_hex(s: &str) -> Option<u64> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
