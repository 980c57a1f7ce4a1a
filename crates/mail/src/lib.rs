//! Mail crate - Business logic for sending mail through Gmail
//!
//! This crate provides:
//! - The resolved argument model shared by the CLI and config file
//! - Artifact location (config, credentials, token) with provenance
//! - Configuration file loading and merging
//! - Message assembly (plain text or with attachments)
//! - Gmail OAuth2 authentication and the send/draft API calls
//! - The [`Pipeline`] tying these together for one invocation

pub mod args;
pub mod compose;
pub mod config;
pub mod error;
pub mod gmail;
pub mod locate;
pub mod merge;
pub mod pipeline;
pub mod setup;

pub use crate::config::GmailCredentials;
pub use args::{OptionKey, ResolvedArguments, STDIN_SENTINEL};
pub use compose::{
    Draft, HeadedInput, OutboundMessage, PartKind, PartSummary, compose_body, guess_content_type,
};
pub use error::RunError;
pub use gmail::{ApiError, Authorizer, GmailAuth, GmailClient, GoogleAuthorizer, Mailer};
pub use locate::{Artifact, Candidate, Provenance, SearchRoots, candidates, locate};
pub use merge::{Attachments, ConfigFile, LoadedConfig, Precedence, merge};
pub use pipeline::{Delivery, Invocation, Outcome, Pipeline, Resolution, resolve, validate};
