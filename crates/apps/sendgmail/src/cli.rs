use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;
use mail::{Delivery, Invocation, Precedence, ResolvedArguments};

#[derive(Parser, Debug)]
#[command(
    name = "sendgmail",
    version,
    about = "Send an email through the Gmail API",
    long_about = "Send an email, with optional attachments and signature, through the Gmail API.\n\n\
                  Credentials, token and config.json are looked up in the current directory, \
                  then in <config dir>/sendgmail/<sender>/, then in <config dir>/sendgmail/. \
                  Values in the configuration file take priority over flags unless --prefer-cli is given."
)]
pub struct Cli {
    /// Recipient(s), comma separated
    #[arg(long)]
    pub to: Option<String>,

    /// Sender address
    #[arg(long)]
    pub sender: Option<String>,

    /// Carbon copy recipient(s), comma separated
    #[arg(long)]
    pub cc: Option<String>,

    /// Blind carbon copy recipient(s), comma separated
    #[arg(long)]
    pub bcc: Option<String>,

    /// Subject line
    #[arg(long)]
    pub subject: Option<String>,

    /// Message text
    #[arg(long)]
    pub message: Option<String>,

    /// File with the message body (`-` reads standard input)
    #[arg(long, value_name = "PATH")]
    pub mfile: Option<PathBuf>,

    /// Signature file appended after the message body
    #[arg(long, value_name = "PATH")]
    pub sfile: Option<PathBuf>,

    /// Files to attach
    #[arg(long, value_name = "PATH", num_args = 0..)]
    pub attach: Vec<PathBuf>,

    /// OAuth client credentials file (credentials.json)
    #[arg(long, value_name = "PATH")]
    pub credentials: Option<PathBuf>,

    /// Token cache file (created if missing)
    #[arg(long, value_name = "PATH")]
    pub token: Option<PathBuf>,

    /// Configuration file to read
    #[arg(long, value_name = "PATH")]
    pub configuration: Option<PathBuf>,

    /// Authorize and write a configuration file to PATH instead of sending
    #[arg(long, value_name = "PATH")]
    pub setup: Option<PathBuf>,

    /// Read recipients from the first line of standard input, the subject from
    /// the second and the body from the rest
    #[arg(long)]
    pub stdin_headers: bool,

    /// Create a draft instead of sending
    #[arg(long)]
    pub draft: bool,

    /// Let command line flags win over configuration file values
    #[arg(long)]
    pub prefer_cli: bool,

    /// Set logging level to use
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,
}

impl Cli {
    /// Translate the parsed flags into a pipeline invocation
    pub fn invocation(&self) -> Invocation {
        let mut args = ResolvedArguments::new();
        args.to = self.to.clone();
        args.sender = self.sender.clone();
        args.cc = self.cc.clone();
        args.bcc = self.bcc.clone();
        args.subject = self.subject.clone();
        args.message = self.message.clone();
        args.message_file = self.mfile.clone();
        args.signature_file = self.sfile.clone();
        args.attachments = self.attach.clone();
        args.credentials_path = self.credentials.clone();
        args.token_path = self.token.clone();
        args.config_path = self.configuration.clone();

        Invocation {
            args,
            setup: self.setup.clone(),
            precedence: if self.prefer_cli {
                Precedence::CommandLine
            } else {
                Precedence::Configuration
            },
            delivery: if self.draft {
                Delivery::Draft
            } else {
                Delivery::Send
            },
            stdin_headers: self.stdin_headers,
        }
    }
}

/// Exists to provide better help messages variants copied from LevelFilter as
/// that's the type that is actually needed
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Default)]
pub enum LogLevel {
    /// Nothing emitted in this mode
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}
