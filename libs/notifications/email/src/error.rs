//! Error types for templated email delivery.

use thiserror::Error;

/// Result type for email operations.
pub type EmailResult<T> = Result<T, EmailError>;

/// Errors that can occur while rendering or delivering an email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// A required body rendered to nothing (no template found, no inline content).
    #[error("Template not found or rendered empty: {0}")]
    TemplateNotFound(String),

    /// Template compilation or rendering failed.
    #[error("Template error: {0}")]
    Template(String),

    /// CSS inlining of the HTML body failed.
    #[error("CSS inlining error: {0}")]
    Inlining(String),

    /// The delivery backend rejected the message or could not be reached.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Template file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<handlebars::TemplateError> for EmailError {
    fn from(err: handlebars::TemplateError) -> Self {
        EmailError::Template(err.to_string())
    }
}

impl From<handlebars::RenderError> for EmailError {
    fn from(err: handlebars::RenderError) -> Self {
        EmailError::Template(err.to_string())
    }
}

impl From<css_inline::InlineError> for EmailError {
    fn from(err: css_inline::InlineError) -> Self {
        EmailError::Inlining(err.to_string())
    }
}

impl From<serde_json::Error> for EmailError {
    fn from(err: serde_json::Error) -> Self {
        EmailError::Template(format!("Failed to build render context: {}", err))
    }
}
