//! Transactional email client
//!
//! Builds a message with the resized image as a base64 attachment, submits
//! it to the email API, and polls the returned send operation until it
//! reaches a terminal state. No retry of the send itself; a send that never
//! reaches a terminal state within the poll budget fails the invocation.

use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{FrameError, Result};
use crate::models::GeneratedImage;

const SUBJECT: &str = "Image for Picture Frame";
const BODY: &str = "Image is attached.";
const RECIPIENT_DISPLAY_NAME: &str = "Picture Frame";

/// Parsed email-service connection secret: `endpoint=...;accesskey=...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConnection {
    pub endpoint: String,
    pub access_key: String,
}

impl EmailConnection {
    pub fn parse(raw: &str) -> Result<Self> {
        let mut endpoint = None;
        let mut access_key = None;

        for part in raw.split(';').filter(|p| !p.trim().is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                FrameError::Email("malformed email connection string".to_string())
            })?;
            match key.trim().to_ascii_lowercase().as_str() {
                "endpoint" => endpoint = Some(value.trim().trim_end_matches('/').to_string()),
                "accesskey" => access_key = Some(value.trim().to_string()),
                _ => {}
            }
        }

        match (endpoint, access_key) {
            (Some(endpoint), Some(access_key)) if !endpoint.is_empty() && !access_key.is_empty() => {
                Ok(Self {
                    endpoint,
                    access_key,
                })
            }
            _ => Err(FrameError::Email(
                "email connection string missing endpoint or accesskey".to_string(),
            )),
        }
    }
}

/// Send-operation polling budget
#[derive(Clone, Copy, Debug)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub sender_address: String,
    pub content: EmailContent,
    pub recipients: EmailRecipients,
    pub attachments: Vec<EmailAttachment>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailContent {
    pub subject: String,
    pub plain_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecipients {
    pub to: Vec<EmailAddress>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAddress {
    pub address: String,
    pub display_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAttachment {
    pub name: String,
    pub content_type: String,
    pub content_in_base64: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendOperation {
    id: String,
    status: OperationStatus,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl OperationStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

pub struct EmailDispatcher {
    client: Client,
    connection: EmailConnection,
    poll: PollConfig,
}

impl EmailDispatcher {
    pub fn new(connection: EmailConnection, poll: PollConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            connection,
            poll,
        }
    }

    /// Email the image's final payload to the frame, polling the send
    /// operation to a terminal state.
    pub async fn send_image(
        &self,
        sender: &str,
        recipient: &str,
        image: &GeneratedImage,
    ) -> Result<()> {
        let payload = image
            .resized
            .as_ref()
            .ok_or_else(|| FrameError::Email(format!("{} has no resized payload", image.filename)))?;

        let message = build_message(sender, recipient, &image.filename, payload);
        let mut operation = self.submit(&message).await?;

        let mut attempts = 0;
        loop {
            match operation.status {
                OperationStatus::Succeeded => {
                    info!(filename = %image.filename, operation_id = %operation.id, "email sent");
                    return Ok(());
                }
                OperationStatus::Failed | OperationStatus::Canceled => {
                    return Err(FrameError::Email(format!(
                        "send operation {} ended as {:?}",
                        operation.id, operation.status
                    )));
                }
                OperationStatus::NotStarted | OperationStatus::Running => {
                    attempts += 1;
                    if attempts > self.poll.max_attempts {
                        return Err(FrameError::Email(format!(
                            "send operation {} not terminal after {} polls",
                            operation.id, self.poll.max_attempts
                        )));
                    }
                    tokio::time::sleep(self.poll.interval).await;
                    operation = self.poll_operation(&operation.id).await?;
                }
            }
        }
    }

    async fn submit(&self, message: &EmailMessage) -> Result<SendOperation> {
        let url = format!("{}/emails:send", self.connection.endpoint);
        debug!("submitting email send request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.connection.access_key)
            .json(message)
            .send()
            .await
            .map_err(|e| FrameError::Email(format!("send request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FrameError::Email(format!(
                "email API error: {status} - {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FrameError::Email(format!("unparsable send response: {e}")))
    }

    async fn poll_operation(&self, operation_id: &str) -> Result<SendOperation> {
        let url = format!(
            "{}/emails/operations/{}",
            self.connection.endpoint, operation_id
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.connection.access_key)
            .send()
            .await
            .map_err(|e| FrameError::Email(format!("status poll failed: {e}")))?;

        if !response.status().is_success() {
            return Err(FrameError::Email(format!(
                "status poll returned {} for operation {operation_id}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| FrameError::Email(format!("unparsable operation status: {e}")))
    }
}

/// Build the fixed-subject message with the image as its sole attachment
fn build_message(
    sender: &str,
    recipient: &str,
    filename: &str,
    payload: &[u8],
) -> EmailMessage {
    EmailMessage {
        sender_address: sender.to_string(),
        content: EmailContent {
            subject: SUBJECT.to_string(),
            plain_text: BODY.to_string(),
        },
        recipients: EmailRecipients {
            to: vec![EmailAddress {
                address: recipient.to_string(),
                display_name: RECIPIENT_DISPLAY_NAME.to_string(),
            }],
        },
        attachments: vec![EmailAttachment {
            name: filename.to_string(),
            content_type: "image/png".to_string(),
            content_in_base64: base64::engine::general_purpose::STANDARD.encode(payload),
        }],
    }
}
