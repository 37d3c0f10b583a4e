use thiserror::Error;

#[derive(Debug, Error)]
pub enum XirrError {
    #[error("Usage error: {reason}")]
    Usage { reason: String },

    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Cancelled: XIRR refinement interrupted at iteration {iteration}")]
    Cancelled { iteration: u32 },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl XirrError {
    pub(crate) fn usage(reason: impl Into<String>) -> Self {
        XirrError::Usage {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        XirrError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for XirrError {
    fn from(e: serde_json::Error) -> Self {
        XirrError::SerializationError(e.to_string())
    }
}
