//! Resolved invocation arguments
//!
//! A fixed schema of optional fields populated from the command line and
//! then (by [`crate::merge`]) from the configuration file.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Path value meaning "read the message body from standard input"
pub const STDIN_SENTINEL: &str = "-";

/// Every option that can be set on the command line or in a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OptionKey {
    To,
    Sender,
    Cc,
    Bcc,
    Subject,
    Message,
    MessageFile,
    SignatureFile,
    Attachments,
    CredentialsPath,
    TokenPath,
    ConfigPath,
}

impl OptionKey {
    /// All keys, in declaration order
    pub const ALL: [OptionKey; 12] = [
        OptionKey::To,
        OptionKey::Sender,
        OptionKey::Cc,
        OptionKey::Bcc,
        OptionKey::Subject,
        OptionKey::Message,
        OptionKey::MessageFile,
        OptionKey::SignatureFile,
        OptionKey::Attachments,
        OptionKey::CredentialsPath,
        OptionKey::TokenPath,
        OptionKey::ConfigPath,
    ];

    /// Name of the option as used on the command line and in config files
    pub fn as_str(self) -> &'static str {
        match self {
            OptionKey::To => "to",
            OptionKey::Sender => "sender",
            OptionKey::Cc => "cc",
            OptionKey::Bcc => "bcc",
            OptionKey::Subject => "subject",
            OptionKey::Message => "message",
            OptionKey::MessageFile => "mfile",
            OptionKey::SignatureFile => "sfile",
            OptionKey::Attachments => "attach",
            OptionKey::CredentialsPath => "credentials",
            OptionKey::TokenPath => "token",
            OptionKey::ConfigPath => "configuration",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Arguments for one invocation
///
/// Values are never mutated in place by the pipeline: merging produces a
/// new `ResolvedArguments`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedArguments {
    pub to: Option<String>,
    pub sender: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub message_file: Option<PathBuf>,
    pub signature_file: Option<PathBuf>,
    pub attachments: Vec<PathBuf>,
    pub credentials_path: Option<PathBuf>,
    pub token_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    /// Keys whose current value was taken from the configuration file
    pub(crate) from_config: BTreeSet<OptionKey>,
}

impl ResolvedArguments {
    /// Create empty arguments
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the value for `key` was supplied by the configuration file
    pub fn is_from_config(&self, key: OptionKey) -> bool {
        self.from_config.contains(&key)
    }

    /// Whether `key` holds a non-empty value
    pub fn is_set(&self, key: OptionKey) -> bool {
        match key {
            OptionKey::To => non_empty_str(&self.to).is_some(),
            OptionKey::Sender => non_empty_str(&self.sender).is_some(),
            OptionKey::Cc => non_empty_str(&self.cc).is_some(),
            OptionKey::Bcc => non_empty_str(&self.bcc).is_some(),
            OptionKey::Subject => non_empty_str(&self.subject).is_some(),
            OptionKey::Message => non_empty_str(&self.message).is_some(),
            OptionKey::MessageFile => non_empty_path(&self.message_file).is_some(),
            OptionKey::SignatureFile => non_empty_path(&self.signature_file).is_some(),
            OptionKey::Attachments => !self.attachments.is_empty(),
            OptionKey::CredentialsPath => non_empty_path(&self.credentials_path).is_some(),
            OptionKey::TokenPath => non_empty_path(&self.token_path).is_some(),
            OptionKey::ConfigPath => non_empty_path(&self.config_path).is_some(),
        }
    }

    /// Sender address, if set to a non-empty value
    pub fn sender(&self) -> Option<&str> {
        non_empty_str(&self.sender)
    }

    /// Path argument for `key`, if it is a path-valued key holding a non-empty value
    pub fn path(&self, key: OptionKey) -> Option<&Path> {
        match key {
            OptionKey::MessageFile => non_empty_path(&self.message_file),
            OptionKey::SignatureFile => non_empty_path(&self.signature_file),
            OptionKey::CredentialsPath => non_empty_path(&self.credentials_path),
            OptionKey::TokenPath => non_empty_path(&self.token_path),
            OptionKey::ConfigPath => non_empty_path(&self.config_path),
            _ => None,
        }
    }

    /// Whether the message file is the standard input sentinel
    pub fn message_from_stdin(&self) -> bool {
        non_empty_path(&self.message_file).is_some_and(|p| p == Path::new(STDIN_SENTINEL))
    }

    /// Builder-style setters, used by the CLI and tests
    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_message_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.message_file = Some(path.into());
        self
    }

    pub fn with_signature_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.signature_file = Some(path.into());
        self
    }

    pub fn with_attachment(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(path.into());
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = Some(path.into());
        self
    }

    pub fn with_token_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.token_path = Some(path.into());
        self
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }
}

fn non_empty_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn non_empty_path(value: &Option<PathBuf>) -> Option<&Path> {
    value.as_deref().filter(|p| !p.as_os_str().is_empty())
}
