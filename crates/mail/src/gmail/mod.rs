//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 authentication flow with a file-backed token cache
//! - Gmail API client for sending messages and creating drafts
//! - The [`Authorizer`] and [`Mailer`] seams used by the pipeline

mod auth;
mod client;

use anyhow::Result;
use std::path::Path;

pub use auth::GmailAuth;
pub use client::{ApiError, GmailClient, encode_raw};

use crate::compose::OutboundMessage;
use crate::config::GmailCredentials;

/// Obtains a bearer token for the Gmail API
pub trait Authorizer {
    /// Return a valid access token, persisting any new or refreshed token
    /// at `token_path`
    fn authorize(&self, credentials_path: &Path, token_path: &Path) -> Result<String>;
}

/// Delivers a built message
pub trait Mailer {
    /// Send the message, returning the remote message id
    fn send(&self, access_token: &str, message: &OutboundMessage) -> Result<String>;

    /// Store the message as a draft, returning the remote draft id
    fn create_draft(&self, access_token: &str, message: &OutboundMessage) -> Result<String>;
}

/// [`Authorizer`] backed by Google's OAuth2 endpoints
#[derive(Debug, Default, Clone, Copy)]
pub struct GoogleAuthorizer;

impl Authorizer for GoogleAuthorizer {
    fn authorize(&self, credentials_path: &Path, token_path: &Path) -> Result<String> {
        let credentials = GmailCredentials::from_file(credentials_path)?;
        GmailAuth::new(credentials, token_path).get_access_token()
    }
}

/// Gmail API response types
pub mod api {
    use serde::Deserialize;

    /// Response from sending a message
    #[derive(Debug, Deserialize)]
    pub struct SentMessage {
        pub id: String,
    }

    /// Response from creating a draft
    #[derive(Debug, Deserialize)]
    pub struct DraftResponse {
        pub id: String,
    }
}
