use crate::libs::linking::LinkType;

/// Errors raised by the linking and scoring engine.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Wrong or mixed object kinds
    #[error("Invalid type: {0}")]
    InvalidType(String),

    /// Empty input, unknown names or conflicting identifiers
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Strain, position or graph node absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Presence matrices built against another strain universe
    #[error("Stale matrices: built for strain fingerprint {built:016x}, current is {current:016x}")]
    Stale { built: u64, current: u64 },

    #[error("Shape mismatch: {0}")]
    Shape(String),

    #[error("Scores for {0} have not been computed")]
    MissingScores(LinkType),

    #[error("Statistics error: {0}")]
    Stats(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl LinkError {
    pub fn invalid_type(msg: impl Into<String>) -> Self {
        LinkError::InvalidType(msg.into())
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        LinkError::InvalidValue(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        LinkError::NotFound(msg.into())
    }
}
