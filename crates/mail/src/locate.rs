//! Artifact location
//!
//! Decides which file supplies each of the externally located artifacts
//! (configuration file, OAuth client credentials, token cache). Candidates
//! are checked in a fixed priority order and the first one that exists wins:
//!
//! 1. An explicit argument, taken as given, or a value declared inside the
//!    configuration file when that file exists
//! 2. `<name>` in the current working directory
//! 3. `<config-root>/<sender>/<name>` when a sender is known
//! 4. `<config-root>/<name>`

use anyhow::{Context, Result};
use log::{debug, info};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::args::{OptionKey, ResolvedArguments};

/// An externally located file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Config,
    Credentials,
    Token,
}

impl Artifact {
    /// Conventional file name of the artifact
    pub fn file_name(self) -> &'static str {
        match self {
            Artifact::Config => "config.json",
            Artifact::Credentials => "credentials.json",
            Artifact::Token => "token.json",
        }
    }

    /// The argument that names this artifact explicitly
    pub fn option_key(self) -> OptionKey {
        match self {
            Artifact::Config => OptionKey::ConfigPath,
            Artifact::Credentials => OptionKey::CredentialsPath,
            Artifact::Token => OptionKey::TokenPath,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Config => "configuration",
            Artifact::Credentials => "credentials",
            Artifact::Token => "token",
        };
        f.write_str(name)
    }
}

/// Which search rule produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    ExplicitArgument,
    CurrentDirectory,
    SenderScoped,
    Generic,
    ConfigurationFile,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Provenance::ExplicitArgument => "explicit argument",
            Provenance::CurrentDirectory => "present in current directory",
            Provenance::SenderScoped => "present in sender-scoped config directory",
            Provenance::Generic => "present in generic config directory",
            Provenance::ConfigurationFile => "declared inside configuration file",
        };
        f.write_str(tag)
    }
}

/// A possible location for an artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Lower ranks are preferred
    pub rank: u8,
    pub path: PathBuf,
    pub provenance: Provenance,
}

impl Candidate {
    /// Explicit arguments are taken at their word; everything else must exist
    fn is_usable(&self) -> bool {
        match self.provenance {
            Provenance::ExplicitArgument => true,
            _ => self.path.exists(),
        }
    }
}

/// Directories searched for artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    /// Current working directory
    pub cwd: PathBuf,
    /// Per-user config root (e.g. ~/.config/sendgmail)
    pub config_root: Option<PathBuf>,
    /// Directory of the loaded configuration file, once known
    pub config_dir: Option<PathBuf>,
}

impl SearchRoots {
    pub fn new(cwd: impl Into<PathBuf>, config_root: Option<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            config_root,
            config_dir: None,
        }
    }

    /// Roots for the running process: its working directory and the user config dir
    pub fn from_env() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to determine current directory")?;
        Ok(Self::new(cwd, config::config_dir()))
    }

    /// Record the directory of the configuration file that was loaded
    pub fn with_config_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.config_dir = dir;
        self
    }
}

/// All candidates for `artifact`, in priority order
pub fn candidates(
    artifact: Artifact,
    args: &ResolvedArguments,
    roots: &SearchRoots,
) -> Vec<Candidate> {
    let name = artifact.file_name();
    let key = artifact.option_key();
    let mut out = Vec::with_capacity(4);

    if let Some(value) = args.path(key) {
        out.push(explicit_candidate(value, args.is_from_config(key), roots));
    }

    out.push(Candidate {
        rank: 2,
        path: roots.cwd.join(name),
        provenance: Provenance::CurrentDirectory,
    });

    if let Some(root) = &roots.config_root {
        if let Some(sender) = args.sender().filter(|s| is_directory_name(s)) {
            out.push(Candidate {
                rank: 3,
                path: root.join(sender).join(name),
                provenance: Provenance::SenderScoped,
            });
        }
        out.push(Candidate {
            rank: 4,
            path: root.join(name),
            provenance: Provenance::Generic,
        });
    }

    out
}

/// Locate `artifact`, returning the first usable candidate
///
/// A token cache declared in the configuration file is still returned when
/// nothing else exists, since the session creates it.
pub fn locate(
    artifact: Artifact,
    args: &ResolvedArguments,
    roots: &SearchRoots,
) -> Option<Candidate> {
    let all = candidates(artifact, args, roots);
    let found = all
        .iter()
        .find(|c| {
            let usable = c.is_usable();
            debug!(
                "{} candidate {} ({}): {}",
                artifact,
                c.path.display(),
                c.provenance,
                if usable { "selected" } else { "absent" }
            );
            usable
        })
        .or_else(|| {
            all.iter().find(|c| {
                artifact == Artifact::Token && c.provenance == Provenance::ConfigurationFile
            })
        })
        .cloned();

    match &found {
        Some(c) => info!(
            "Using {} at {} ({})",
            artifact,
            c.path.display(),
            c.provenance
        ),
        None => info!("No {} file found", artifact),
    }
    found
}

/// Whether `sender` names exactly one directory below the config root
fn is_directory_name(sender: &str) -> bool {
    let mut components = Path::new(sender).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Candidate for a value named by an argument
///
/// Relative paths declared inside a configuration file are resolved against
/// that file's directory.
fn explicit_candidate(value: &Path, from_config: bool, roots: &SearchRoots) -> Candidate {
    if !from_config {
        return Candidate {
            rank: 1,
            path: value.to_path_buf(),
            provenance: Provenance::ExplicitArgument,
        };
    }

    let path = match &roots.config_dir {
        Some(dir) if !value.is_absolute() => dir.join(value),
        _ => value.to_path_buf(),
    };
    Candidate {
        rank: 1,
        path,
        provenance: Provenance::ConfigurationFile,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        cwd: PathBuf,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = tempfile::tempdir().unwrap();
            let cwd = tmp.path().join("work");
            let root = tmp.path().join("config");
            fs::create_dir_all(&cwd).unwrap();
            fs::create_dir_all(&root).unwrap();
            Self {
                _tmp: tmp,
                cwd,
                root,
            }
        }

        fn roots(&self) -> SearchRoots {
            SearchRoots::new(&self.cwd, Some(self.root.clone()))
        }

        fn touch(&self, path: &Path) {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, "{}").unwrap();
        }
    }

    #[test]
    fn test_explicit_argument_wins_regardless_of_disk() {
        let fx = Fixture::new();
        fx.touch(&fx.cwd.join("credentials.json"));
        fx.touch(&fx.root.join("credentials.json"));

        let args = ResolvedArguments::new().with_credentials_path("/nowhere/creds.json");
        let found = locate(Artifact::Credentials, &args, &fx.roots()).unwrap();

        assert_eq!(found.path, PathBuf::from("/nowhere/creds.json"));
        assert_eq!(found.provenance, Provenance::ExplicitArgument);
    }

    #[test]
    fn test_current_directory_beats_config_root() {
        let fx = Fixture::new();
        fx.touch(&fx.cwd.join("token.json"));
        fx.touch(&fx.root.join("me@example.com/token.json"));
        fx.touch(&fx.root.join("token.json"));

        let args = ResolvedArguments::new().with_sender("me@example.com");
        let found = locate(Artifact::Token, &args, &fx.roots()).unwrap();

        assert_eq!(found.path, fx.cwd.join("token.json"));
        assert_eq!(found.provenance, Provenance::CurrentDirectory);
    }

    #[test]
    fn test_sender_scoped_directory() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("me@example.com/credentials.json"));
        fx.touch(&fx.root.join("credentials.json"));

        let args = ResolvedArguments::new().with_sender("me@example.com");
        let found = locate(Artifact::Credentials, &args, &fx.roots()).unwrap();

        assert_eq!(found.path, fx.root.join("me@example.com/credentials.json"));
        assert_eq!(found.provenance, Provenance::SenderScoped);
    }

    #[test]
    fn test_generic_directory_when_sender_scoped_absent() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("config.json"));

        let args = ResolvedArguments::new().with_sender("other@example.com");
        let found = locate(Artifact::Config, &args, &fx.roots()).unwrap();

        assert_eq!(found.path, fx.root.join("config.json"));
        assert_eq!(found.provenance, Provenance::Generic);
    }

    #[test]
    fn test_sender_scoped_skipped_without_sender() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("me@example.com/credentials.json"));

        let args = ResolvedArguments::new();
        assert!(locate(Artifact::Credentials, &args, &fx.roots()).is_none());
    }

    #[test]
    fn test_sender_outside_config_root_is_not_probed() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("credentials.json"));

        for sender in ["..", "/etc", "a/b", "./me@example.com"] {
            let args = ResolvedArguments::new().with_sender(sender);
            let all = candidates(Artifact::Credentials, &args, &fx.roots());
            assert!(
                all.iter().all(|c| c.provenance != Provenance::SenderScoped),
                "{sender}"
            );
            let found = locate(Artifact::Credentials, &args, &fx.roots()).unwrap();
            assert_eq!(found.provenance, Provenance::Generic);
        }
    }

    #[test]
    fn test_unresolved_without_config_root() {
        let fx = Fixture::new();
        let roots = SearchRoots::new(&fx.cwd, None);
        let args = ResolvedArguments::new().with_sender("me@example.com");

        assert!(locate(Artifact::Token, &args, &roots).is_none());
        assert_eq!(candidates(Artifact::Token, &args, &roots).len(), 1);
    }

    #[test]
    fn test_config_declared_relative_path_joins_config_dir() {
        let fx = Fixture::new();
        fx.touch(&fx.root.join("accounts/creds.json"));
        let mut args = ResolvedArguments::new().with_credentials_path("accounts/creds.json");
        args.from_config.insert(OptionKey::CredentialsPath);
        let roots = fx.roots().with_config_dir(Some(fx.root.clone()));

        let found = locate(Artifact::Credentials, &args, &roots).unwrap();
        assert_eq!(found.path, fx.root.join("accounts/creds.json"));
        assert_eq!(found.provenance, Provenance::ConfigurationFile);
    }

    #[test]
    fn test_config_declared_absolute_path_kept() {
        let fx = Fixture::new();
        let absolute = fx.cwd.join("token.json");
        let mut args = ResolvedArguments::new().with_token_path(&absolute);
        args.from_config.insert(OptionKey::TokenPath);
        let roots = fx.roots().with_config_dir(Some(fx.root.clone()));

        let found = locate(Artifact::Token, &args, &roots).unwrap();
        assert_eq!(found.path, absolute);
        assert_eq!(found.provenance, Provenance::ConfigurationFile);
    }

    #[test]
    fn test_missing_config_declared_credentials_fall_through() {
        let fx = Fixture::new();
        fx.touch(&fx.cwd.join("credentials.json"));
        let mut args = ResolvedArguments::new().with_credentials_path("missing.json");
        args.from_config.insert(OptionKey::CredentialsPath);
        let roots = fx.roots().with_config_dir(Some(fx.root.clone()));

        let found = locate(Artifact::Credentials, &args, &roots).unwrap();
        assert_eq!(found.path, fx.cwd.join("credentials.json"));
        assert_eq!(found.provenance, Provenance::CurrentDirectory);
    }

    #[test]
    fn test_missing_config_declared_token_is_last_resort() {
        let fx = Fixture::new();
        let mut args = ResolvedArguments::new().with_token_path("tokens/me.json");
        args.from_config.insert(OptionKey::TokenPath);
        let roots = fx.roots().with_config_dir(Some(fx.root.clone()));

        let found = locate(Artifact::Token, &args, &roots).unwrap();
        assert_eq!(found.path, fx.root.join("tokens/me.json"));
        assert_eq!(found.provenance, Provenance::ConfigurationFile);

        fx.touch(&fx.root.join("token.json"));
        let found = locate(Artifact::Token, &args, &roots).unwrap();
        assert_eq!(found.provenance, Provenance::Generic);
    }

    #[test]
    fn test_empty_argument_falls_through() {
        let fx = Fixture::new();
        fx.touch(&fx.cwd.join("credentials.json"));

        let args = ResolvedArguments::new().with_credentials_path("");
        let found = locate(Artifact::Credentials, &args, &fx.roots()).unwrap();
        assert_eq!(found.provenance, Provenance::CurrentDirectory);
    }

    #[test]
    fn test_candidate_ranks_are_ordered() {
        let fx = Fixture::new();
        let args = ResolvedArguments::new()
            .with_sender("me@example.com")
            .with_config_path("custom.json");
        let ranks: Vec<u8> = candidates(Artifact::Config, &args, &fx.roots())
            .iter()
            .map(|c| c.rank)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }
}
