//! Orchestration of one invocation
//!
//! `locate config → merge → locate credentials & token → validate →
//! assemble → authorize → send`. Every stage takes its inputs by reference
//! and returns new values; nothing is threaded through shared mutable state.

use log::{debug, info};
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::args::{OptionKey, ResolvedArguments};
use crate::compose::{Draft, HeadedInput, compose_body};
use crate::config::CREDENTIALS_HINT;
use crate::error::RunError;
use crate::gmail::{Authorizer, Mailer};
use crate::locate::{Artifact, SearchRoots, locate};
use crate::merge::{LoadedConfig, Precedence, merge};
use crate::setup::{setup_config, write_setup_config};

/// What to do with the built message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    #[default]
    Send,
    Draft,
}

/// One parsed command line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub args: ResolvedArguments,
    /// Write a bootstrap configuration file here instead of sending
    pub setup: Option<PathBuf>,
    pub precedence: Precedence,
    pub delivery: Delivery,
    /// Standard input starts with a recipients line and a subject line
    pub stdin_headers: bool,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sent { id: String },
    Drafted { id: String },
    SetupComplete { config_path: PathBuf },
}

/// Arguments after configuration merging and artifact resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub args: ResolvedArguments,
    pub config_path: Option<PathBuf>,
    pub credentials: Option<PathBuf>,
    pub token: Option<PathBuf>,
}

/// Runs invocations against an authorizer and a mailer
pub struct Pipeline<'a, A: Authorizer, M: Mailer> {
    roots: SearchRoots,
    authorizer: &'a A,
    mailer: &'a M,
}

impl<'a, A: Authorizer, M: Mailer> Pipeline<'a, A, M> {
    pub fn new(roots: SearchRoots, authorizer: &'a A, mailer: &'a M) -> Self {
        Self {
            roots,
            authorizer,
            mailer,
        }
    }

    /// Run one invocation to completion
    ///
    /// The message is built before authorizing, so a bad body, signature or
    /// attachment file fails without touching the network.
    pub fn run(&self, invocation: &Invocation, stdin: &mut dyn Read) -> Result<Outcome, RunError> {
        let mut resolution = resolve(&invocation.args, &self.roots, invocation.precedence)?;

        if let Some(setup_path) = &invocation.setup {
            return self.run_setup(&resolution, setup_path);
        }

        let headed = if invocation.stdin_headers {
            let input = HeadedInput::read(stdin).map_err(RunError::Io)?;
            resolution.args = input.apply(&resolution.args);
            Some(input)
        } else {
            None
        };

        let (credentials, token) = validate(&resolution)?;

        let args = &resolution.args;
        let body = match &headed {
            Some(input) => compose_body(args, &mut input.body.as_bytes()),
            None => compose_body(args, stdin),
        }
        .map_err(RunError::Io)?;
        let draft = Draft {
            sender: args.sender.clone().unwrap_or_default(),
            to: args.to.clone().unwrap_or_default(),
            cc: args.cc.clone(),
            bcc: args.bcc.clone(),
            subject: args.subject.clone().unwrap_or_default(),
            body,
            attachments: args.attachments.clone(),
        };
        let message = draft.build().map_err(RunError::Io)?;
        debug!("Built message with {} part(s)", message.parts().len());

        let access_token = self
            .authorizer
            .authorize(&credentials, &token)
            .map_err(RunError::Authorization)?;

        match invocation.delivery {
            Delivery::Send => {
                let id = self
                    .mailer
                    .send(&access_token, &message)
                    .map_err(RunError::Remote)?;
                info!("Message sent with id {}", id);
                Ok(Outcome::Sent { id })
            }
            Delivery::Draft => {
                let id = self
                    .mailer
                    .create_draft(&access_token, &message)
                    .map_err(RunError::Remote)?;
                info!("Draft created with id {}", id);
                Ok(Outcome::Drafted { id })
            }
        }
    }

    /// Authorize only, then capture the defaults in a configuration file
    fn run_setup(&self, resolution: &Resolution, setup_path: &Path) -> Result<Outcome, RunError> {
        let credentials = resolution.credentials.as_deref().ok_or_else(|| {
            RunError::Usage(format!(
                "--setup needs a credentials file (use --credentials). {}",
                CREDENTIALS_HINT
            ))
        })?;
        let token = default_token(resolution, credentials);

        self.authorizer
            .authorize(credentials, &token)
            .map_err(RunError::Authorization)?;

        let config = setup_config(&resolution.args, credentials, &token).map_err(RunError::Io)?;
        write_setup_config(setup_path, &config).map_err(RunError::Io)?;
        Ok(Outcome::SetupComplete {
            config_path: setup_path.to_path_buf(),
        })
    }
}

/// Locate and merge the configuration file, then locate credentials and token
pub fn resolve(
    cli: &ResolvedArguments,
    roots: &SearchRoots,
    precedence: Precedence,
) -> Result<Resolution, RunError> {
    let config = match locate(Artifact::Config, cli, roots) {
        Some(candidate) => Some(LoadedConfig::load(&candidate.path).map_err(RunError::Io)?),
        None => None,
    };

    let (args, roots) = match &config {
        Some(loaded) => (
            merge(cli, &loaded.values, precedence),
            roots.clone().with_config_dir(loaded.dir()),
        ),
        None => (cli.clone(), roots.clone()),
    };

    let credentials = locate(Artifact::Credentials, &args, &roots).map(|c| c.path);
    let token = locate(Artifact::Token, &args, &roots).map(|c| c.path);

    Ok(Resolution {
        args,
        config_path: config.map(|c| c.path),
        credentials,
        token,
    })
}

/// Check that everything needed to send is present
///
/// Returns the credentials and token paths to authorize with.
pub fn validate(resolution: &Resolution) -> Result<(PathBuf, PathBuf), RunError> {
    let args = &resolution.args;
    let required = [
        (args.to.as_deref(), "recipient (--to)"),
        (args.sender.as_deref(), "sender (--sender)"),
        (args.subject.as_deref(), "subject (--subject)"),
    ];
    for (value, what) in required {
        if value.is_none_or(str::is_empty) {
            return Err(RunError::Usage(format!("Missing {}", what)));
        }
    }

    if !args.is_set(OptionKey::Message) && !args.is_set(OptionKey::MessageFile) {
        return Err(RunError::Usage(
            "Missing message body (--message or --mfile)".to_string(),
        ));
    }

    let credentials = resolution.credentials.clone().ok_or_else(|| {
        RunError::Usage(format!(
            "No credentials file found (use --credentials, or place credentials.json in the \
             current directory or the config directory). {}",
            CREDENTIALS_HINT
        ))
    })?;
    let token = default_token(resolution, &credentials);
    Ok((credentials, token))
}

/// The resolved token path, or `token.json` next to the credentials file
fn default_token(resolution: &Resolution, credentials: &Path) -> PathBuf {
    match &resolution.token {
        Some(token) => token.clone(),
        None => {
            let dir = credentials.parent().unwrap_or(Path::new(""));
            let token = dir.join(Artifact::Token.file_name());
            info!(
                "No token file found; will store token at {}",
                token.display()
            );
            token
        }
    }
}
