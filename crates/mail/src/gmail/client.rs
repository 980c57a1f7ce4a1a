//! Gmail API HTTP client
//!
//! Sends messages and creates drafts through the Gmail REST API.
//! Uses synchronous HTTP (ureq).

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use log::debug;
use serde::Serialize;

use super::Mailer;
use super::api::{DraftResponse, SentMessage};
use crate::compose::OutboundMessage;

/// Error returned when the Gmail API rejects a request
#[derive(Debug, thiserror::Error)]
#[error("Gmail API returned {status}: {detail}")]
pub struct ApiError {
    pub status: u16,
    pub detail: String,
}

#[derive(Serialize)]
struct RawMessage {
    raw: String,
}

#[derive(Serialize)]
struct DraftRequest {
    message: RawMessage,
}

/// Gmail API client
#[derive(Debug, Default, Clone)]
pub struct GmailClient;

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Create a new Gmail client
    pub fn new() -> Self {
        Self
    }

    /// POST a JSON body to the API and decode the JSON response
    fn post<B: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = format!("{}{}", Self::BASE_URL, path);
        debug!("POST {}", url);

        let mut response = ureq::post(&url)
            .config()
            .http_status_as_error(false)
            .build()
            .header("Authorization", &format!("Bearer {}", access_token))
            .send_json(body)
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .body_mut()
                .read_to_string()
                .unwrap_or_else(|e| format!("<unreadable response body: {}>", e));
            return Err(ApiError {
                status: status.as_u16(),
                detail,
            }
            .into());
        }

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

/// Encode a formatted message the way the Gmail API expects it
pub fn encode_raw(message: &OutboundMessage) -> String {
    URL_SAFE.encode(message.formatted())
}

impl Mailer for GmailClient {
    fn send(&self, access_token: &str, message: &OutboundMessage) -> Result<String> {
        let body = RawMessage {
            raw: encode_raw(message),
        };
        let sent: SentMessage = self.post(access_token, "/users/me/messages/send", &body)?;
        Ok(sent.id)
    }

    fn create_draft(&self, access_token: &str, message: &OutboundMessage) -> Result<String> {
        let body = DraftRequest {
            message: RawMessage {
                raw: encode_raw(message),
            },
        };
        let draft: DraftResponse = self.post(access_token, "/users/me/drafts", &body)?;
        Ok(draft.id)
    }
}
