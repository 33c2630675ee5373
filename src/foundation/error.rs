/// Convenience result type used across framefeed.
pub type FeedResult<T> = Result<T, FeedError>;

/// Fatal error taxonomy. Any of these ends the run with a nonzero status.
#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    /// Input or state that cannot be encoded (odd sizes, missing output path, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Failure to read or decode a pixel source.
    #[error("source error: {0}")]
    Source(String),

    /// Failure reported by the encoder while opening, writing or finalizing.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FeedError {
    /// Build a [`FeedError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FeedError::Source`] value.
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Build a [`FeedError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
