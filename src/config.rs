//! Configuration for the picture frame service
//!
//! Two layers, loaded at different times:
//! - `Settings` — bootstrap values from environment variables, read once at
//!   startup (endpoints, credential token, scheduler tuning).
//! - `FrameConfig` — the run-time record fetched fresh from the remote
//!   configuration store on every invocation, with secret references
//!   resolved through the vault. Immutable for the duration of one run.

use std::fmt;

use crate::error::{FrameError, Result};
use crate::services::app_config::AppConfigClient;
use crate::services::key_vault::KeyVaultClient;

/// Bearer token used for the configuration store and vault.
///
/// Passed explicitly to every client that needs it rather than held as
/// ambient global state. Debug output never prints the token itself.
#[derive(Clone)]
pub struct BearerCredential(String);

impl BearerCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerCredential(***)")
    }
}

/// Bootstrap settings from environment variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub config_store_endpoint: String,
    pub config_store_token: String,
    pub image_api_endpoint: String,
    /// Custom object storage endpoint (MinIO, localstack); defaults to AWS
    pub s3_endpoint: Option<String>,
    pub tick_interval_secs: u64,
    pub email_poll_interval_ms: u64,
    pub email_poll_max_attempts: u32,
}

impl Settings {
    /// Load bootstrap settings from environment variables
    pub fn from_env() -> Result<Self> {
        let config_store_endpoint = std::env::var("CONFIG_STORE_ENDPOINT")
            .map_err(|_| FrameError::ConfigMissing("CONFIG_STORE_ENDPOINT not set".to_string()))?;
        let config_store_token = std::env::var("CONFIG_STORE_TOKEN")
            .map_err(|_| FrameError::ConfigMissing("CONFIG_STORE_TOKEN not set".to_string()))?;

        Ok(Self {
            config_store_endpoint,
            config_store_token,
            image_api_endpoint: std::env::var("IMAGE_API_ENDPOINT")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            s3_endpoint: std::env::var("S3_ENDPOINT").ok(),
            tick_interval_secs: std::env::var("TICK_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            email_poll_interval_ms: std::env::var("EMAIL_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1000),
            email_poll_max_attempts: std::env::var("EMAIL_POLL_MAX_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}

/// Run-time configuration record, fetched fresh on every invocation.
///
/// All fields are required and non-empty; a missing setting or a failed
/// secret resolution aborts the invocation. No defaulting.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    pub prompt: String,
    pub image_api_key: String,
    pub email_connection: String,
    pub storage_container: String,
    pub sender_address: String,
    pub recipient_address: String,
    pub image_count: u32,
}

impl FrameConfig {
    /// Fetch the named settings from the store and resolve secret
    /// references through the vault.
    pub async fn load(store: &AppConfigClient, vault: &KeyVaultClient) -> Result<Self> {
        let prompt = store.get_setting_value("OpenAIPrompt").await?;
        let image_api_key = resolve_secret(store, vault, "OpenAISecretKey").await?;
        let email_connection =
            resolve_secret(store, vault, "EmailServiceConnectionString").await?;
        let storage_container = store.get_setting_value("StorageContainerName").await?;
        let sender_address = store.get_setting_value("SenderEmailAddress").await?;
        let recipient_address = store.get_setting_value("PictureFrameEmailAddress").await?;
        let image_count_raw = store.get_setting_value("NumberOfImagesToGenerate").await?;

        let image_count: u32 = image_count_raw.trim().parse().map_err(|_| {
            FrameError::ConfigInvalid(format!(
                "NumberOfImagesToGenerate is not a number: {image_count_raw:?}"
            ))
        })?;

        let config = Self {
            prompt: require_non_empty("OpenAIPrompt", prompt)?,
            image_api_key: require_non_empty("OpenAISecretKey", image_api_key)?,
            email_connection: require_non_empty(
                "EmailServiceConnectionString",
                email_connection,
            )?,
            storage_container: require_non_empty("StorageContainerName", storage_container)?,
            sender_address: require_non_empty("SenderEmailAddress", sender_address)?,
            recipient_address: require_non_empty("PictureFrameEmailAddress", recipient_address)?,
            image_count,
        };

        Ok(config)
    }
}

/// Fetch a setting, require it to be a secret reference, and resolve it
async fn resolve_secret(
    store: &AppConfigClient,
    vault: &KeyVaultClient,
    key: &str,
) -> Result<String> {
    let setting = store.get_setting(key).await?;
    let reference = setting.secret_reference()?;
    vault.get_secret(&reference).await
}

fn require_non_empty(name: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(FrameError::ConfigInvalid(format!("{name} is empty")));
    }
    Ok(value)
}
