//! Per-invocation orchestration
//!
//! One invocation: load the remote configuration record, generate the
//! requested images, then for each image in order upload, recompress,
//! resize, and email it. Strictly sequential; the first error at any stage
//! aborts the remainder of the invocation. Nothing is shared between
//! invocations apart from the external services themselves.

use tracing::info;

use crate::config::{BearerCredential, FrameConfig, Settings};
use crate::error::Result;
use crate::services::app_config::AppConfigClient;
use crate::services::compress::ImageCompressor;
use crate::services::email::{EmailConnection, EmailDispatcher, PollConfig};
use crate::services::image_gen::ImageGenerator;
use crate::services::key_vault::KeyVaultClient;
use crate::services::resize::ImageResizer;
use crate::services::storage::StorageUploader;

pub struct Pipeline {
    app_config: AppConfigClient,
    vault: KeyVaultClient,
    generator: ImageGenerator,
    uploader: StorageUploader,
    compressor: ImageCompressor,
    resizer: ImageResizer,
    email_poll: PollConfig,
}

impl Pipeline {
    pub fn new(settings: &Settings, uploader: StorageUploader) -> Self {
        let credential = BearerCredential::new(settings.config_store_token.clone());

        Self {
            app_config: AppConfigClient::new(&settings.config_store_endpoint, credential.clone()),
            vault: KeyVaultClient::new(credential),
            generator: ImageGenerator::new(&settings.image_api_endpoint),
            uploader,
            compressor: ImageCompressor::new(),
            resizer: ImageResizer::with_defaults(),
            email_poll: PollConfig {
                interval: std::time::Duration::from_millis(settings.email_poll_interval_ms),
                max_attempts: settings.email_poll_max_attempts,
            },
        }
    }

    /// Run one full invocation
    pub async fn run_invocation(&self) -> Result<()> {
        let config = FrameConfig::load(&self.app_config, &self.vault).await?;
        info!(
            images = config.image_count,
            container = %config.storage_container,
            "configuration loaded"
        );

        let images = self
            .generator
            .generate(&config.image_api_key, &config.prompt, config.image_count)
            .await?;

        let dispatcher = EmailDispatcher::new(
            EmailConnection::parse(&config.email_connection)?,
            self.email_poll,
        );

        for mut image in images {
            self.uploader
                .upload(&config.storage_container, &image, &config.prompt)
                .await?;

            let compressed = self.compressor.compress_async(image.raw.clone()).await?;
            image.compressed = Some(compressed.clone());

            let resized = self.resizer.resize_async(compressed).await?;
            image.resized = Some(resized);

            dispatcher
                .send_image(&config.sender_address, &config.recipient_address, &image)
                .await?;

            info!(filename = %image.filename, "image uploaded, optimized, and emailed");
        }

        Ok(())
    }
}
