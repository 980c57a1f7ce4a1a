//! OAuth client credentials
//!
//! Reads the client descriptor downloaded from the Google Cloud Console
//! (`credentials.json`). Both the "installed" (desktop) and "web" formats
//! are accepted.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Where to point users who have no credentials file yet
pub const CREDENTIALS_HINT: &str = "Create an OAuth client ID of type \"Desktop app\" in the Google Cloud Console \
(APIs & Services > Credentials), enable the Gmail API, and download the JSON file as credentials.json";

/// OAuth credentials for Gmail API access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<InstalledCredentials>,
    web: Option<InstalledCredentials>,
}

#[derive(Deserialize)]
struct InstalledCredentials {
    client_id: String,
    client_secret: String,
}

impl GmailCredentials {
    /// Load credentials from a specific JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)
            .with_context(|| format!("Unusable credentials file. {}", CREDENTIALS_HINT))?;
        Self::from_credential_file(creds)
            .with_context(|| format!("Invalid credentials file: {}", path.display()))
    }

    /// Parse credentials from a GoogleCredentialFile
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        let installed = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
        })
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }
}
