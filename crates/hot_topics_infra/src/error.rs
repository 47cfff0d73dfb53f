use thiserror::Error;

/// Errors raised while composing resource definitions into a stack.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthError {
    /// Two constructs resolved to the same logical id.
    #[error("duplicate logical id '{logical_id}' for construct path '{path}'")]
    DuplicateLogicalId { logical_id: String, path: String },

    /// A table mapping names an analysis type with no known column schema.
    #[error("unknown table mapping '{0}'")]
    UnknownTableMapping(String),

    #[error("invalid schedule expression '{0}'")]
    InvalidSchedule(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SynthError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}
