//! Fixed-resolution resize for the picture frame display
//!
//! Resizes the compressed image to the frame's native resolution and
//! re-encodes it as PNG. The output dimensions are exact regardless of the
//! input aspect ratio.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::{GenericImageView, ImageOutputFormat};
use tracing::debug;

use crate::error::{FrameError, Result};

/// Target resolution for the display
#[derive(Clone, Copy, Debug)]
pub struct ResizeConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ImageResizer {
    config: ResizeConfig,
}

impl ImageResizer {
    pub fn new(config: ResizeConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ResizeConfig::default())
    }

    /// Resize to the configured resolution (blocking version)
    ///
    /// **Note:** CPU-intensive; call `resize_async` from async code.
    pub fn resize(&self, data: &[u8]) -> Result<Bytes> {
        let img = image::load_from_memory(data)
            .map_err(|e| FrameError::Resize(format!("failed to decode image: {e}")))?;

        let (orig_w, orig_h) = img.dimensions();
        let resized = img.resize_exact(self.config.width, self.config.height, FilterType::Lanczos3);

        let mut buf = Vec::new();
        resized
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .map_err(|e| FrameError::Resize(format!("failed to encode PNG: {e}")))?;

        debug!(
            from_width = orig_w,
            from_height = orig_h,
            width = self.config.width,
            height = self.config.height,
            "image resized for display"
        );

        Ok(Bytes::from(buf))
    }

    /// Resize on a blocking thread
    pub async fn resize_async(&self, data: Bytes) -> Result<Bytes> {
        let resizer = self.clone();
        tokio::task::spawn_blocking(move || resizer.resize(&data))
            .await
            .map_err(|e| FrameError::Resize(format!("resize task panicked: {e}")))?
    }
}
