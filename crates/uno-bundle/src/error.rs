//! Error types for uno-bundle

use thiserror::Error;

/// Fatal build failures.
///
/// Anything recoverable is reported through [`crate::Diagnostics`] instead.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Rule generation failed: {0}")]
    Generate(String),

    #[error("Transformer '{transformer}' failed on {id}: {message}")]
    Transform {
        transformer: String,
        id: String,
        message: String,
    },

    #[error("Extraction failed for {id}: {message}")]
    Extract { id: String, message: String },

    #[error("CSS plugin '{plugin}' failed: {message}")]
    CssPlugin { plugin: String, message: String },

    #[error(transparent)]
    Layer(#[from] uno_layers::LayerError),

    #[error("{0}")]
    Other(String),
}

impl BuildError {
    /// Create an error from any message.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
