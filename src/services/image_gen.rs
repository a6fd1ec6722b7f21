//! Image-generation API client
//!
//! Calls the external generation endpoint once per invocation with the
//! configured prompt and count, and maps each base64 payload to a
//! `GeneratedImage` with a fresh identifier. No retry: an API error, a
//! count mismatch, or an undecodable payload fails the invocation.

use std::time::Duration;

use base64::Engine;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{FrameError, Result};
use crate::models::GeneratedImage;

const GENERATION_PATH: &str = "/v1/images/generations";
const RESPONSE_FORMAT: &str = "b64_json";
const GENERATION_SIZE: &str = "1024x1024";

#[derive(Debug, Serialize)]
struct GenerationRequest<'a> {
    prompt: &'a str,
    n: u32,
    response_format: &'a str,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerationResponse {
    data: Vec<GenerationPayload>,
}

#[derive(Debug, Deserialize)]
struct GenerationPayload {
    b64_json: Option<String>,
}

/// Typed client for the image-generation API
pub struct ImageGenerator {
    client: Client,
    endpoint: String,
}

impl ImageGenerator {
    pub fn new(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Generate `count` images for `prompt`; returns exactly `count` records
    pub async fn generate(
        &self,
        api_key: &str,
        prompt: &str,
        count: u32,
    ) -> Result<Vec<GeneratedImage>> {
        let url = format!("{}{}", self.endpoint, GENERATION_PATH);
        let request = GenerationRequest {
            prompt,
            n: count,
            response_format: RESPONSE_FORMAT,
            size: GENERATION_SIZE,
        };

        info!(count, "requesting generated images");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FrameError::Generation(format!("generation request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FrameError::Generation(format!(
                "generation API error: {status} - {error_text}"
            )));
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| FrameError::Generation(format!("unparsable generation response: {e}")))?;

        into_records(body.data, count)
    }
}

/// Validate the returned payloads and attach identifiers and filenames
fn into_records(payloads: Vec<GenerationPayload>, requested: u32) -> Result<Vec<GeneratedImage>> {
    if payloads.len() != requested as usize {
        return Err(FrameError::Generation(format!(
            "requested {requested} images, API returned {}",
            payloads.len()
        )));
    }

    let mut images = Vec::with_capacity(payloads.len());
    for payload in payloads {
        let encoded = payload
            .b64_json
            .filter(|p| !p.is_empty())
            .ok_or_else(|| FrameError::Generation("payload missing b64_json".to_string()))?;

        let raw = base64::engine::general_purpose::STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| FrameError::Generation(format!("undecodable image payload: {e}")))?;

        images.push(GeneratedImage::new(Uuid::new_v4(), Bytes::from(raw)));
    }

    Ok(images)
}
