//! Line-oriented command protocol read from stdin.

/// Splits input into command lines.
pub mod lexer;
/// Classifies one command line.
pub mod parse;
