//! Picture frame worker service
//!
//! On a fixed interval: loads configuration from a remote configuration
//! store (resolving secret references through a vault), generates images via
//! an external image-generation API, uploads them to object storage,
//! recompresses and resizes them, and emails each one to the picture frame.

pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
