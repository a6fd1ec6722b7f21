//! Remote configuration store client
//!
//! Read-only key lookups against the configuration store's REST API
//! (`GET {endpoint}/kv/{key}`). Settings whose content type marks them as
//! secret references hold an indirection value pointing at a vault-held
//! secret instead of the secret itself; `ConfigurationSetting::secret_reference`
//! decodes it into a vault URL and secret name.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::config::BearerCredential;
use crate::error::{FrameError, Result};

/// Content type marking a setting as a vault secret reference
pub const SECRET_REFERENCE_CONTENT_TYPE: &str = "application/vnd.appconfig.secretref+json";

/// A single setting as returned by the configuration store
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationSetting {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Secret-reference value body: `{"uri": "<vault>/secrets/<name>"}`
#[derive(Debug, Deserialize)]
struct SecretReferenceValue {
    uri: String,
}

/// A decoded secret reference: where to find the actual value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReference {
    pub vault_url: String,
    pub secret_name: String,
}

impl ConfigurationSetting {
    pub fn is_secret_reference(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(SECRET_REFERENCE_CONTENT_TYPE))
    }

    /// Decode this setting's value into a vault URL and secret name
    pub fn secret_reference(&self) -> Result<SecretReference> {
        if !self.is_secret_reference() {
            return Err(FrameError::SecretResolution(format!(
                "setting {} is not a secret reference",
                self.key
            )));
        }

        let reference: SecretReferenceValue = serde_json::from_str(&self.value).map_err(|e| {
            FrameError::SecretResolution(format!(
                "setting {} has an unparsable secret reference: {e}",
                self.key
            ))
        })?;

        let (vault_url, rest) = reference.uri.split_once("/secrets/").ok_or_else(|| {
            FrameError::SecretResolution(format!(
                "secret reference for {} has no /secrets/ segment: {}",
                self.key, reference.uri
            ))
        })?;

        // Trailing path segment after the name is a version pin; the vault
        // returns the current version when it is omitted.
        let secret_name = rest.split('/').next().unwrap_or(rest);
        if vault_url.is_empty() || secret_name.is_empty() {
            return Err(FrameError::SecretResolution(format!(
                "secret reference for {} is incomplete: {}",
                self.key, reference.uri
            )));
        }

        Ok(SecretReference {
            vault_url: vault_url.to_string(),
            secret_name: secret_name.to_string(),
        })
    }
}

/// Typed client for the remote configuration store
pub struct AppConfigClient {
    client: Client,
    endpoint: String,
    credential: BearerCredential,
}

impl AppConfigClient {
    pub fn new(endpoint: &str, credential: BearerCredential) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            credential,
        }
    }

    /// Fetch one named setting. A 404 maps to `ConfigMissing`.
    pub async fn get_setting(&self, key: &str) -> Result<ConfigurationSetting> {
        let url = format!("{}/kv/{}", self.endpoint, key);
        debug!(key, "fetching configuration setting");

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.credential.token())
            .send()
            .await
            .map_err(|e| FrameError::ConfigStore(format!("request for {key} failed: {e}")))?;

        match response.status() {
            StatusCode::OK => response.json::<ConfigurationSetting>().await.map_err(|e| {
                FrameError::ConfigStore(format!("unparsable setting {key}: {e}"))
            }),
            StatusCode::NOT_FOUND => Err(FrameError::ConfigMissing(key.to_string())),
            status => Err(FrameError::ConfigStore(format!(
                "configuration store returned {status} for {key}"
            ))),
        }
    }

    /// Fetch one named setting and return its plaintext value
    pub async fn get_setting_value(&self, key: &str) -> Result<String> {
        Ok(self.get_setting(key).await?.value)
    }
}
