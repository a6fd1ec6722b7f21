//! Lossless PNG recompression
//!
//! Re-encodes each image's PNG data at the encoder's best compression level
//! with adaptive filtering. Dimensions and format are unchanged. CPU work
//! runs on `spawn_blocking` to avoid stalling the async runtime.

use std::io::Cursor;

use bytes::Bytes;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::{GenericImageView, ImageEncoder};
use tracing::debug;

use crate::error::{FrameError, Result};

#[derive(Clone, Debug, Default)]
pub struct ImageCompressor;

impl ImageCompressor {
    pub fn new() -> Self {
        Self
    }

    /// Recompress PNG data (blocking version)
    ///
    /// **Note:** CPU-intensive; call `compress_async` from async code.
    pub fn compress(&self, data: &[u8]) -> Result<Bytes> {
        let img = image::load_from_memory(data)
            .map_err(|e| FrameError::Compression(format!("failed to decode image: {e}")))?;

        let (width, height) = img.dimensions();

        let mut buf = Vec::new();
        let encoder = PngEncoder::new_with_quality(
            Cursor::new(&mut buf),
            CompressionType::Best,
            PngFilterType::Adaptive,
        );
        encoder
            .write_image(img.as_bytes(), width, height, img.color())
            .map_err(|e| FrameError::Compression(format!("failed to encode PNG: {e}")))?;

        debug!(
            width,
            height,
            before = data.len(),
            after = buf.len(),
            "image recompressed"
        );

        Ok(Bytes::from(buf))
    }

    /// Recompress on a blocking thread
    pub async fn compress_async(&self, data: Bytes) -> Result<Bytes> {
        let compressor = self.clone();
        tokio::task::spawn_blocking(move || compressor.compress(&data))
            .await
            .map_err(|e| FrameError::Compression(format!("compression task panicked: {e}")))?
    }
}
