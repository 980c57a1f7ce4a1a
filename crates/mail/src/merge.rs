//! Configuration file loading and merging
//!
//! A configuration file is a flat JSON object keyed by option name, e.g.
//!
//! ```json
//! {
//!   "sender": "me@example.com",
//!   "cc": "team@example.com",
//!   "credentials": "credentials.json",
//!   "attach": ["report.pdf"]
//! }
//! ```
//!
//! By default values from the file take priority over the command line.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::args::{OptionKey, ResolvedArguments};

/// Which source wins when both the command line and the config file set a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precedence {
    /// Configuration file values replace command line values
    #[default]
    Configuration,
    /// Configuration file values only fill keys the command line left unset
    CommandLine,
}

/// One or more attachment paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attachments {
    One(PathBuf),
    Many(Vec<PathBuf>),
}

impl Attachments {
    pub fn into_vec(self) -> Vec<PathBuf> {
        match self {
            Attachments::One(path) => vec![path],
            Attachments::Many(paths) => paths,
        }
    }
}

/// Parsed configuration file contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bcc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(alias = "message-file", skip_serializing_if = "Option::is_none")]
    pub mfile: Option<PathBuf>,
    #[serde(alias = "signature-file", skip_serializing_if = "Option::is_none")]
    pub sfile: Option<PathBuf>,
    #[serde(alias = "attachments", skip_serializing_if = "Option::is_none")]
    pub attach: Option<Attachments>,
    #[serde(alias = "credentials-path", skip_serializing_if = "Option::is_none")]
    pub credentials: Option<PathBuf>,
    #[serde(alias = "token-path", skip_serializing_if = "Option::is_none")]
    pub token: Option<PathBuf>,
    /// Keys this program does not know about
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, serde_json::Value>,
}

impl ConfigFile {
    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A configuration file together with where it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub path: PathBuf,
    pub values: ConfigFile,
}

impl LoadedConfig {
    /// Read and parse the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let values: ConfigFile = config::load_json_file(path)?;
        for key in values.unknown.keys() {
            debug!("Ignoring unknown configuration key '{}'", key);
        }
        Ok(Self {
            path: path.to_path_buf(),
            values,
        })
    }

    /// Directory containing the configuration file
    pub fn dir(&self) -> Option<PathBuf> {
        self.path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

/// Merge configuration values into `args`, returning the merged arguments
pub fn merge(
    args: &ResolvedArguments,
    config: &ConfigFile,
    precedence: Precedence,
) -> ResolvedArguments {
    let mut merged = args.clone();

    merge_field(&mut merged, OptionKey::To, config.to.clone(), precedence, |a| &mut a.to);
    merge_field(&mut merged, OptionKey::Sender, config.sender.clone(), precedence, |a| {
        &mut a.sender
    });
    merge_field(&mut merged, OptionKey::Cc, config.cc.clone(), precedence, |a| &mut a.cc);
    merge_field(&mut merged, OptionKey::Bcc, config.bcc.clone(), precedence, |a| &mut a.bcc);
    merge_field(&mut merged, OptionKey::Subject, config.subject.clone(), precedence, |a| {
        &mut a.subject
    });
    merge_field(&mut merged, OptionKey::Message, config.message.clone(), precedence, |a| {
        &mut a.message
    });
    merge_field(&mut merged, OptionKey::MessageFile, config.mfile.clone(), precedence, |a| {
        &mut a.message_file
    });
    merge_field(&mut merged, OptionKey::SignatureFile, config.sfile.clone(), precedence, |a| {
        &mut a.signature_file
    });
    merge_field(
        &mut merged,
        OptionKey::CredentialsPath,
        config.credentials.clone(),
        precedence,
        |a| &mut a.credentials_path,
    );
    merge_field(&mut merged, OptionKey::TokenPath, config.token.clone(), precedence, |a| {
        &mut a.token_path
    });

    if let Some(attach) = config.attach.clone()
        && takes_config_value(&merged, OptionKey::Attachments, precedence)
    {
        debug!("Taking '{}' from configuration", OptionKey::Attachments);
        merged.attachments = attach.into_vec();
        merged.from_config.insert(OptionKey::Attachments);
    }

    merged
}

fn merge_field<T>(
    merged: &mut ResolvedArguments,
    key: OptionKey,
    value: Option<T>,
    precedence: Precedence,
    field: impl FnOnce(&mut ResolvedArguments) -> &mut Option<T>,
) {
    let Some(value) = value else {
        return;
    };
    if takes_config_value(merged, key, precedence) {
        debug!("Taking '{}' from configuration", key);
        *field(merged) = Some(value);
        merged.from_config.insert(key);
    } else {
        debug!("Keeping command line value for '{}'", key);
    }
}

fn takes_config_value(merged: &ResolvedArguments, key: OptionKey, precedence: Precedence) -> bool {
    match precedence {
        Precedence::Configuration => true,
        Precedence::CommandLine => !merged.is_set(key) || merged.is_from_config(key),
    }
}
