use std::fmt;

use crate::foundation::core::{Fps, parse_decimal, parse_dimensions, parse_hex};

/// Where the pixels of a frame come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameSource<'a> {
    /// A file path: `.bmp` files are decoded, anything else is read as raw packed pixels.
    File(&'a str),
    /// An inherited readable stream, identified by its numeric handle.
    Pipe(u64),
}

/// Keywords whose argument can fail to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    /// `repeat`
    Repeat,
    /// `fps`
    Fps,
    /// `bitrate`
    Bitrate,
    /// `resolution`
    Resolution,
    /// `pipe`
    Pipe,
}

impl Keyword {
    /// Usage string shown in diagnostics.
    pub fn usage(self) -> &'static str {
        match self {
            Self::Repeat => "repeat <number>",
            Self::Fps => "fps <number>[/<number>]",
            Self::Bitrate => "bitrate <number>",
            Self::Resolution => "resolution <number>x<number>",
            Self::Pipe => "pipe <hex handle>",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.usage())
    }
}

/// One classified command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command<'a> {
    /// Stop reading commands and throw away the output.
    Cancel,
    /// Delete the previous file-backed source.
    Delete,
    /// Encode the current frame `n - 1` more times.
    Repeat(u64),
    /// Set the frame rate.
    Fps(Fps),
    /// Set the average bitrate in bits per second.
    Bitrate(u32),
    /// Set the frame size; validated by the caller (odd sizes are fatal there).
    Resolution {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Set the output path.
    Output(&'a str),
    /// Load and encode one frame.
    Frame(FrameSource<'a>),
    /// A known keyword whose argument did not parse.
    Malformed {
        /// The keyword that was recognized.
        keyword: Keyword,
        /// The argument as read.
        arg: &'a str,
    },
}

/// Classify a command line.
///
/// Keywords are matched case-sensitively in priority order and only when an argument follows
/// the separating space, so `repeat ` on its own is an image path. Anything that is not a
/// command is an image path.
pub fn parse_command(line: &str) -> Command<'_> {
    match line {
        "cancel" => return Command::Cancel,
        "delete" => return Command::Delete,
        _ => {}
    }

    if let Some(arg) = keyword_arg(line, "repeat") {
        return parse_decimal(arg).map_or(malformed(Keyword::Repeat, arg), Command::Repeat);
    }
    if let Some(arg) = keyword_arg(line, "fps") {
        return arg
            .parse::<Fps>()
            .map_or(malformed(Keyword::Fps, arg), Command::Fps);
    }
    if let Some(arg) = keyword_arg(line, "bitrate") {
        return parse_decimal(arg).map_or(malformed(Keyword::Bitrate, arg), Command::Bitrate);
    }
    if let Some(arg) = keyword_arg(line, "resolution") {
        return match parse_dimensions(arg) {
            Some((width, height)) => Command::Resolution { width, height },
            None => odd_prefix(arg).map_or(malformed(Keyword::Resolution, arg), |(width, height)| {
                Command::Resolution { width, height }
            }),
        };
    }
    if let Some(path) = keyword_arg(line, "output") {
        return Command::Output(path);
    }
    if let Some(path) = keyword_arg(line, "image") {
        return Command::Frame(FrameSource::File(path));
    }
    if let Some(arg) = keyword_arg(line, "pipe") {
        return parse_hex(arg).map_or(malformed(Keyword::Pipe, arg), |handle| {
            Command::Frame(FrameSource::Pipe(handle))
        });
    }

    Command::Frame(FrameSource::File(line))
}

fn keyword_arg<'a>(line: &'a str, keyword: &str) -> Option<&'a str> {
    line.strip_prefix(keyword)?
        .strip_prefix(' ')
        .filter(|arg| !arg.is_empty())
}

/// Leading numbers of a partial `<w>x<h>`, when either one is odd.
///
/// A missing number counts as zero. `101x` and `101x50abc` give `(101, 0)` and `(101, 50)`.
fn odd_prefix(arg: &str) -> Option<(u32, u32)> {
    let (width, rest) = leading_number(arg)?;
    let height = match rest.strip_prefix('x') {
        Some(rest) => leading_number(rest)?.0,
        None => 0,
    };
    (!width.is_multiple_of(2) || !height.is_multiple_of(2)).then_some((width, height))
}

fn leading_number(s: &str) -> Option<(u32, &str)> {
    let end = s.bytes().position(|b| !b.is_ascii_digit()).unwrap_or(s.len());
    let value = if end == 0 { 0 } else { s[..end].parse().ok()? };
    Some((value, &s[end..]))
}

fn malformed(keyword: Keyword, arg: &str) -> Command<'_> {
    Command::Malformed { keyword, arg }
}

#[cfg(test)]
#[path = "../../tests/unit/command/parse.rs"]
mod tests;
