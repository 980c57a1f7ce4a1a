//! Errors reported by the send pipeline

use thiserror::Error;

/// Failure of one invocation
///
/// Every variant ends the run with exit status 1.
#[derive(Debug, Error)]
pub enum RunError {
    /// Missing or unresolvable option; shown together with the usage text
    #[error("{0}")]
    Usage(String),

    /// A file could not be read or written
    #[error("{0:#}")]
    Io(anyhow::Error),

    /// Credentials could not be loaded or a token obtained
    #[error("Authorization failed: {0:#}")]
    Authorization(anyhow::Error),

    /// The Gmail API call failed
    #[error("Sending failed: {0:#}")]
    Remote(anyhow::Error),
}

impl RunError {
    /// Process exit status for this error
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Whether the usage text should accompany the diagnostic
    pub fn shows_usage(&self) -> bool {
        matches!(self, RunError::Usage(_))
    }
}
