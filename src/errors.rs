use thiserror::Error;

/// Errors that abort a render. Everything else degrades to literal text.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Display formatter failed for field '{field}': {source}")]
    Format {
        field: String,
        #[source]
        source: FormatError,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("Invalid value '{value}' for attribute '{name}'")]
    InvalidAttribute { name: String, value: String },
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, Error, PartialEq)]
pub enum ShortcodeError {
    #[error("Missing required attribute '{0}'")]
    MissingAttribute(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid engine configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid engine configuration: {0}")]
    Invalid(String),
}
