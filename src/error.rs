//! Error types for the picture frame service
//!
//! One variant per pipeline failure class. All stages treat errors
//! uniformly: the first failure aborts the remainder of the invocation.

use thiserror::Error;

/// Result type for picture-frame-service operations
pub type Result<T> = std::result::Result<T, FrameError>;

#[derive(Error, Debug)]
pub enum FrameError {
    /// A named configuration setting was not found in the store
    #[error("Configuration setting missing: {0}")]
    ConfigMissing(String),

    /// A configuration value was present but unusable
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The configuration store was unreachable or returned an error
    #[error("Configuration store error: {0}")]
    ConfigStore(String),

    /// A secret reference could not be resolved through the vault
    #[error("Secret resolution failed: {0}")]
    SecretResolution(String),

    /// The image-generation API call failed or returned no usable payload
    #[error("Image generation failed: {0}")]
    Generation(String),

    /// Object storage upload failed
    #[error("Storage upload failed: {0}")]
    Upload(String),

    /// PNG recompression failed
    #[error("Image compression failed: {0}")]
    Compression(String),

    /// Resize to the display resolution failed
    #[error("Image resize failed: {0}")]
    Resize(String),

    /// Email submission or send-operation polling failed
    #[error("Email dispatch failed: {0}")]
    Email(String),
}
