//! Bootstrap configuration writer for `--setup`

use anyhow::{Context, Result};
use log::info;
use std::path::{Path, PathBuf};

use crate::args::ResolvedArguments;
use crate::merge::{Attachments, ConfigFile};

/// Build the configuration captured by `--setup`
///
/// Message defaults are copied from `args`; credentials and token are
/// stored as absolute paths so the file works from any directory.
pub fn setup_config(
    args: &ResolvedArguments,
    credentials: &Path,
    token: &Path,
) -> Result<ConfigFile> {
    let attach = match args.attachments.as_slice() {
        [] => None,
        paths => Some(Attachments::Many(
            paths.iter().map(|p| absolute(p)).collect::<Result<_>>()?,
        )),
    };

    Ok(ConfigFile {
        sender: non_empty(&args.sender),
        cc: non_empty(&args.cc),
        bcc: non_empty(&args.bcc),
        subject: non_empty(&args.subject),
        message: non_empty(&args.message),
        attach,
        credentials: Some(absolute(credentials)?),
        token: Some(absolute(token)?),
        ..ConfigFile::default()
    })
}

/// Write the configuration file at `path`, creating parent directories
pub fn write_setup_config(path: &Path, config: &ConfigFile) -> Result<()> {
    config::save_json_file(path, config)?;
    info!("Wrote configuration to {}", path.display());
    Ok(())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.clone().filter(|s| !s.is_empty())
}
