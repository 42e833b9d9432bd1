use thiserror::Error;

/// Errors surfaced by the word-cloud pipeline and its resource loading.
#[derive(Debug, Error)]
pub enum WcloudError {
    #[error("invalid request: {0}")]
    Validation(String),

    /// Tokenization left nothing to render. Distinguishable from a system
    /// fault so callers can treat it as "no content".
    #[error("no words left after filtering")]
    EmptyResult,

    /// Missing or corrupt font, mask or dictionary. Indicates deployment
    /// misconfiguration rather than bad input.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, WcloudError>;

impl WcloudError {
    pub fn config(message: impl Into<String>) -> Self {
        WcloudError::Config(message.into())
    }
}
