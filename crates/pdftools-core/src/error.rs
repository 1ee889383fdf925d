use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransformError {
    /// Malformed, missing or out-of-range input. Safe to show to the caller.
    #[error("{0}")]
    Validation(String),

    #[error("Image codec failed: {0}")]
    Codec(String),

    #[error("PDF assembly failed: {0}")]
    Assembly(String),
}

impl TransformError {
    pub fn is_validation(&self) -> bool {
        matches!(self, TransformError::Validation(_))
    }
}

pub type Result<T> = std::result::Result<T, TransformError>;
