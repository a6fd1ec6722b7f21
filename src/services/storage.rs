//! Object storage uploader
//!
//! Uploads each raw generated image to the configured container under its
//! derived filename. Identifiers are unique per run, so no overwrite
//! protection is needed.

use aws_config::BehaviorVersion;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::debug;

use crate::config::Settings;
use crate::error::{FrameError, Result};
use crate::models::GeneratedImage;

#[derive(Clone)]
pub struct StorageUploader {
    client: Client,
}

impl StorageUploader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build an uploader from the ambient AWS credential chain, honoring a
    /// custom endpoint when configured.
    pub async fn from_env(settings: &Settings) -> Self {
        let shared = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &settings.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        Self::new(Client::from_conf(builder.build()))
    }

    /// Upload the raw image bytes under the record's filename, tagging the
    /// blob with the prompt that produced it.
    pub async fn upload(
        &self,
        container: &str,
        image: &GeneratedImage,
        prompt: &str,
    ) -> Result<()> {
        debug!(container, filename = %image.filename, "uploading image");

        self.client
            .put_object()
            .bucket(container)
            .key(&image.filename)
            .content_type("image/png")
            .metadata("prompt", prompt)
            .body(ByteStream::from(image.raw.to_vec()))
            .send()
            .await
            .map_err(|e| FrameError::Upload(format!("{}: {e}", image.filename)))?;

        Ok(())
    }
}
