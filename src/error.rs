use thiserror::Error;

/// Failure of a lookup call. Every error fails the whole call; no partial output is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbagError {
    /// Input has the wrong rank or its buffer does not match the declared shape.
    #[error("shape error: {0}")]
    Shape(String),

    /// A row id (raw or resolved) is outside its valid range, or a required input is unset.
    #[error("domain error: {0}")]
    Domain(String),

    /// Offsets, lengths and element counts disagree with each other.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// The execution backend failed or does not support the requested configuration.
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<rayon::ThreadPoolBuildError> for EmbagError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        EmbagError::Backend(format!("worker pool: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, EmbagError>;
