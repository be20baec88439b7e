//! Error types for the placeholder protocol.
//!
//! Copyright (c) 2025 Posit, PBC

use thiserror::Error;

/// Errors raised when encoding placeholder markers
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayerError {
    /// Layer names must be non-empty
    #[error("layer name must not be empty")]
    EmptyName,

    /// The name contains a character the marker grammar uses as a delimiter
    #[error("layer name {name:?} contains reserved character {found:?}")]
    ReservedCharacter { name: String, found: char },
}
