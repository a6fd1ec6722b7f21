//! Shared data types for the image pipeline

use bytes::Bytes;
use uuid::Uuid;

/// One generated image moving through the pipeline.
///
/// Created by the generator with the raw payload; the compression and
/// resize stages fill in their fields in turn. Discarded after the email
/// step, nothing is retained across invocations.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub id: Uuid,
    /// Blob and attachment name, always `{id}.png`
    pub filename: String,
    /// Raw decoded bytes as returned by the generation API
    pub raw: Bytes,
    /// Set by the compression stage
    pub compressed: Option<Bytes>,
    /// Set by the resize stage
    pub resized: Option<Bytes>,
}

impl GeneratedImage {
    pub fn new(id: Uuid, raw: Bytes) -> Self {
        Self {
            id,
            filename: format!("{id}.png"),
            raw,
            compressed: None,
            resized: None,
        }
    }
}
