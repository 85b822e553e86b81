/// Result alias used across the crate.
pub type ReelResult<T> = Result<T, ReelError>;

/// Crate error type.
///
/// Messages are surfaced verbatim to callers through `RenderResult::error` and
/// `ProgressEvent::error`, so the `Display` form is the user-facing text.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Invalid input scenes, configuration, or API usage.
    #[error("validation error: {0}")]
    Validation(String),

    /// An asset could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Raster surface or compositing failure.
    #[error("render error: {0}")]
    Render(String),

    /// Encoder construction, write, or finalize failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// Manifest/config (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
