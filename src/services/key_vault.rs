//! Secret vault client
//!
//! Resolves a decoded secret reference (`GET {vault}/secrets/{name}`) into
//! the current secret value.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::config::BearerCredential;
use crate::error::{FrameError, Result};
use crate::services::app_config::SecretReference;

#[derive(Debug, Deserialize)]
struct SecretBundle {
    value: String,
}

pub struct KeyVaultClient {
    client: Client,
    credential: BearerCredential,
}

impl KeyVaultClient {
    pub fn new(credential: BearerCredential) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, credential }
    }

    /// Fetch the current value of the referenced secret
    pub async fn get_secret(&self, reference: &SecretReference) -> Result<String> {
        let url = format!(
            "{}/secrets/{}",
            reference.vault_url.trim_end_matches('/'),
            reference.secret_name
        );
        debug!(secret_name = %reference.secret_name, "resolving secret through vault");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.credential.token())
            .send()
            .await
            .map_err(|e| {
                FrameError::SecretResolution(format!(
                    "vault request for {} failed: {e}",
                    reference.secret_name
                ))
            })?;

        if !response.status().is_success() {
            return Err(FrameError::SecretResolution(format!(
                "vault returned {} for {}",
                response.status(),
                reference.secret_name
            )));
        }

        let bundle: SecretBundle = response.json().await.map_err(|e| {
            FrameError::SecretResolution(format!(
                "unparsable vault response for {}: {e}",
                reference.secret_name
            ))
        })?;

        Ok(bundle.value)
    }
}
