//! Gmail OAuth2 authentication
//!
//! Implements the OAuth2 authorization code flow for the Gmail API.
//! Uses a local HTTP server to receive the OAuth callback.
//! Uses synchronous HTTP (ureq).

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use url::Url;

use crate::config::GmailCredentials;

/// OAuth2 token management for Gmail, backed by a token cache file
pub struct GmailAuth {
    credentials: GmailCredentials,
    token_path: PathBuf,
    token_url: String,
}

/// Token cache contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoredToken {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_at: Option<i64>,
}

impl StoredToken {
    /// Whether the token is still usable at `now` (unix seconds)
    pub(crate) fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at > now + GmailAuth::EXPIRY_MARGIN_SECS)
    }
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/v2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Requested scopes: read access plus sending
    pub const SCOPES: [&'static str; 2] = [
        "https://www.googleapis.com/auth/gmail.readonly",
        "https://www.googleapis.com/auth/gmail.send",
    ];

    /// Tokens expiring within this many seconds are treated as expired
    const EXPIRY_MARGIN_SECS: i64 = 300;

    /// Port range to try for local OAuth callback server
    const PORT_RANGE_START: u16 = 8080;
    const PORT_RANGE_END: u16 = 8090;

    /// Create a new GmailAuth instance
    ///
    /// # Arguments
    /// * `credentials` - OAuth2 client from Google Cloud Console
    /// * `token_path` - Token cache file, created if absent
    pub fn new(credentials: GmailCredentials, token_path: impl Into<PathBuf>) -> Self {
        Self {
            credentials,
            token_path: token_path.into(),
            token_url: Self::TOKEN_URL.to_string(),
        }
    }

    #[cfg(test)]
    fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = token_url.into();
        self
    }

    /// Get a valid access token, refreshing or re-authenticating as needed
    pub fn get_access_token(&self) -> Result<String> {
        if let Some(token) = self.load_token()? {
            if token.is_valid_at(chrono::Utc::now().timestamp()) {
                debug!("Using cached token from {}", self.token_path.display());
                return Ok(token.access_token);
            }

            if let Some(refresh_token) = token.refresh_token {
                info!("Refreshing expired access token");
                let new_token = self.refresh_access_token(&refresh_token).with_context(|| {
                    format!(
                        "Could not refresh the access token. Delete {} or run with --setup to authorize again",
                        self.token_path.display()
                    )
                })?;
                self.save_token_response(&new_token)?;
                return Ok(new_token.access_token);
            }
        }

        // Need to authenticate from scratch
        let token = self.authorization_code_auth()?;
        self.save_token_response(&token)?;
        Ok(token.access_token)
    }

    /// Build the consent URL for the given redirect URI
    fn authorization_url(&self, redirect_uri: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.credentials.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&Self::SCOPES.join(" ")),
        )
    }

    /// Perform authorization code flow authentication
    fn authorization_code_auth(&self) -> Result<TokenResponse> {
        // Step 1: Start local server to receive callback
        let (listener, port) = self.start_local_server()?;
        let redirect_uri = format!("http://localhost:{}", port);

        // Step 2: Build authorization URL
        let auth_url = self.authorization_url(&redirect_uri);

        eprintln!("\n=== Gmail Authorization Required ===");
        eprintln!("Opening browser for authorization...");
        eprintln!("If the browser doesn't open, visit: {}", auth_url);

        if let Err(e) = open::that(&auth_url) {
            warn!(
                "Failed to open browser: {}. Please open the URL manually.",
                e
            );
        }

        // Step 3: Wait for callback with authorization code
        eprintln!("Waiting for authorization...");
        let code = self.wait_for_callback(listener)?;

        // Step 4: Exchange code for tokens
        debug!("Exchanging authorization code for tokens");
        let mut response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .context("Failed to exchange authorization code")?;

        let token: TokenResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse token response")?;

        eprintln!("Authorization successful!\n");
        Ok(token)
    }

    /// Start a local TCP server on an available port
    fn start_local_server(&self) -> Result<(TcpListener, u16)> {
        for port in Self::PORT_RANGE_START..=Self::PORT_RANGE_END {
            if let Ok(listener) = TcpListener::bind(format!("127.0.0.1:{}", port)) {
                return Ok((listener, port));
            }
        }
        anyhow::bail!(
            "Could not bind to any port in range {}-{}",
            Self::PORT_RANGE_START,
            Self::PORT_RANGE_END
        )
    }

    /// Wait for OAuth callback and extract authorization code
    fn wait_for_callback(&self, listener: TcpListener) -> Result<String> {
        let (mut stream, _) = listener.accept().context("Failed to accept connection")?;

        let mut reader = BufReader::new(&stream);
        let mut request_line = String::new();
        reader
            .read_line(&mut request_line)
            .context("Failed to read request")?;

        let callback = parse_callback(&request_line);

        // Send response to browser
        let (status, body) = match callback {
            Ok(_) => ("200 OK", "Authorization successful! You can close this window."),
            Err(_) => ("400 Bad Request", "Authorization failed. Please try again."),
        };

        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body><h1>{}</h1></body></html>",
            status, body
        );
        stream.write_all(response.as_bytes()).ok();

        callback
    }

    /// Refresh an access token using a refresh token
    fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        let response = ureq::post(&self.token_url)
            .send_form([
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .context("Failed to refresh access token")?;

        let mut token: TokenResponse = response
            .into_body()
            .read_json()
            .context("Failed to parse refresh token response")?;

        // Preserve the refresh token if not returned
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        Ok(token)
    }

    /// Load the token cache, if present
    ///
    /// A cache that exists but cannot be parsed is ignored so a fresh
    /// authorization can replace it.
    fn load_token(&self) -> Result<Option<StoredToken>> {
        if !self.token_path.exists() {
            debug!("No token cache at {}", self.token_path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&self.token_path)
            .with_context(|| format!("Failed to read token file: {}", self.token_path.display()))?;
        match serde_json::from_str(&content) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                warn!(
                    "Ignoring unreadable token file {}: {}",
                    self.token_path.display(),
                    e
                );
                Ok(None)
            }
        }
    }

    /// Save token response to disk
    fn save_token_response(&self, token: &TokenResponse) -> Result<()> {
        let stored = StoredToken {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token
                .expires_in
                .map(|d| chrono::Utc::now().timestamp() + d as i64),
        };

        config::save_json_file(&self.token_path, &stored)
            .with_context(|| format!("Failed to save token to {}", self.token_path.display()))?;
        debug!("Saved token to {}", self.token_path.display());
        Ok(())
    }
}

/// Extract the authorization code from the callback request line
///
/// Format: `GET /?code=AUTH_CODE&scope=... HTTP/1.1`
fn parse_callback(request_line: &str) -> Result<String> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .context("Malformed callback request")?;
    let url = Url::parse("http://localhost")
        .and_then(|base| base.join(target))
        .context("Malformed callback URL")?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => anyhow::bail!("OAuth error: {}", value),
            _ => {}
        }
    }
    code.context("No authorization code received")
}
