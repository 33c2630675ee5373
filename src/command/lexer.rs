//! Line lexer for the command protocol.
//!
//! Produces one command line per call. Line terminators (`\n`, `\r`, or both) are stripped,
//! blank lines and lines starting with `#` are skipped, and a sentinel line ends the stream
//! exactly like physical end of input does.

use std::collections::VecDeque;
use std::io::BufRead;

use anyhow::Context as _;
use tracing::debug;

use crate::foundation::error::{FeedError, FeedResult};

/// Lines that end the command stream as if input had run out.
pub const SENTINELS: [&str; 5] = ["stop", "quit", "exit", "done", "end"];

/// Pulls command lines out of a buffered byte stream.
///
/// Once the end signal (`Ok(None)`) or an error has been returned, every later call returns
/// `Ok(None)` without touching the reader again.
pub struct CommandLexer<R> {
    reader: R,
    chunk: Vec<u8>,
    pending: VecDeque<Vec<u8>>,
    finished: bool,
}

impl<R: BufRead> CommandLexer<R> {
    /// Create a lexer reading from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            chunk: Vec::new(),
            pending: VecDeque::new(),
            finished: false,
        }
    }

    /// Return the next command line, or `None` at end of input or on a sentinel line.
    pub fn next_line(&mut self) -> FeedResult<Option<String>> {
        if self.finished {
            return Ok(None);
        }
        let next = self.scan();
        if !matches!(next, Ok(Some(_))) {
            self.finished = true;
        }
        next
    }

    fn scan(&mut self) -> FeedResult<Option<String>> {
        while let Some(raw) = self.next_raw()? {
            if raw.first() == Some(&b'#') {
                continue;
            }
            let line = String::from_utf8(raw).map_err(|e| {
                FeedError::validation(format!(
                    "command line is not valid UTF-8: {:?}",
                    String::from_utf8_lossy(e.as_bytes())
                ))
            })?;
            if SENTINELS.contains(&line.as_str()) {
                debug!(sentinel = %line, "command stream ended by sentinel");
                return Ok(None);
            }
            return Ok(Some(line));
        }
        Ok(None)
    }

    fn next_raw(&mut self) -> FeedResult<Option<Vec<u8>>> {
        loop {
            if let Some(raw) = self.pending.pop_front() {
                return Ok(Some(raw));
            }
            self.chunk.clear();
            let read = self
                .reader
                .read_until(b'\n', &mut self.chunk)
                .context("read command input")?;
            if read == 0 {
                return Ok(None);
            }
            // A lone `\r` also terminates a line; empty pieces are blank lines.
            self.pending.extend(
                self.chunk
                    .split(|b| *b == b'\n' || *b == b'\r')
                    .filter(|piece| !piece.is_empty())
                    .map(<[u8]>::to_vec),
            );
        }
    }
}

impl<R: BufRead> Iterator for CommandLexer<R> {
    type Item = FeedResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/command/lexer.rs"]
mod tests;
