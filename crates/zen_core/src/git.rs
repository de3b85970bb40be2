use std::path::{Path, PathBuf};

use zen_errors::Result;

use crate::manifest::GitConfig;

/// Prefix of commit messages, unless configured otherwise.
pub const DEFAULT_COMMIT_PREFIX: &str = "(zen) ";

/// Builds the full commit message from the configured prefix, trimmed to the
/// configured maximum length.
pub fn commit_message(message: &str, config: &GitConfig) -> String {
    let prefix = config.prefix.as_deref().unwrap_or(DEFAULT_COMMIT_PREFIX);
    let full = format!("{prefix}{message}");

    match config.trim_commit_messages {
        Some(limit) if full.chars().count() > limit => {
            let mut trimmed = full.chars().take(limit.saturating_sub(3)).collect::<String>();
            trimmed.push_str("...");
            trimmed
        }
        _ => full,
    }
}

/// Records the changes zen makes to a project in version control.
pub trait Committer {
    /// Commits the given files of the project in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the files could not be committed.
    fn commit(&self, files: &[PathBuf], message: &str, config: Option<&GitConfig>, dir: &Path) -> Result<()>;
}

/// Commits by invoking the `git` binary, if the project enabled automatic
/// commits.
#[derive(Default, Debug, Clone, Copy)]
pub struct GitCommitter;

impl Committer for GitCommitter {
    fn commit(&self, files: &[PathBuf], message: &str, config: Option<&GitConfig>, dir: &Path) -> Result<()> {
        let Some(config) = config.filter(|config| config.auto == Some(true)) else {
            return Ok(());
        };

        let message = commit_message(message, config);
        let quiet = config.suppress_logs.unwrap_or_default();

        let paths = files
            .iter()
            .map(|file| file.strip_prefix(dir).unwrap_or(file).to_path_buf())
            .collect::<Vec<_>>();

        tracing::info!(
            "committing \"{message}\" to {}",
            paths.iter().map(|path| path.display().to_string()).collect::<Vec<_>>().join(",")
        );

        let mut add = vec![PathBuf::from("add")];
        add.extend(paths.iter().cloned());
        crate::cmd::execute_cwd("git", &add, dir, quiet)?;

        let mut commit = vec![PathBuf::from("commit")];
        commit.extend(paths);
        commit.push(PathBuf::from("-m"));
        commit.push(PathBuf::from(message));
        crate::cmd::execute_cwd("git", &commit, dir, quiet)
    }
}

/// Committer which never commits anything.
#[derive(Default, Debug, Clone, Copy)]
pub struct NoCommits;

impl Committer for NoCommits {
    fn commit(&self, _: &[PathBuf], _: &str, _: Option<&GitConfig>, _: &Path) -> Result<()> {
        Ok(())
    }
}
