use std::env::current_dir;
use std::path::{Path, PathBuf};

use error_snippet::IntoDiagnostic;
use zen_cli_tools::*;
use zen_core::Session;
use zen_core::install::PackageManager;
use zen_core::manifest::DependencyScope;
use zen_core::scripts::SkipScripts;
use zen_core::sync::SyncReport;
use zen_errors::Result;

use crate::error::CouldNotDetermineProjectPath;

/// Gets the absolute path of the given project directory, or the current
/// working directory if not specified.
pub(crate) fn project_or_cwd(path: Option<&PathBuf>) -> Result<PathBuf> {
    let cwd = current_dir().map_err(|err| CouldNotDetermineProjectPath {
        inner: vec![err.into_diagnostic()],
    })?;

    let Some(path) = path else {
        return Ok(cwd);
    };

    cwd.join(path).canonicalize().map_err(|err| {
        CouldNotDetermineProjectPath {
            inner: vec![err.into_diagnostic()],
        }
        .into()
    })
}

/// Opens a session over the global store of the current user.
pub(crate) fn open_session(ignore_scripts: bool) -> Result<Session> {
    let session = Session::open_default()?;

    if ignore_scripts {
        Ok(session.with_scripts(SkipScripts))
    } else {
        Ok(session)
    }
}

/// Selects the dependency scope which packages are declared in.
#[derive(clap::Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub(crate) struct ScopeArgs {
    /// Declare as development dependencies
    #[arg(long, short = 'D', help_heading = "Dependency scope")]
    pub dev: bool,

    /// Declare as peer dependencies
    #[arg(long, short = 'P', help_heading = "Dependency scope")]
    pub peer: bool,

    /// Declare as optional dependencies
    #[arg(long, short = 'O', help_heading = "Dependency scope")]
    pub optional: bool,
}

impl ScopeArgs {
    pub fn scope(self) -> DependencyScope {
        if self.dev {
            DependencyScope::DevDependencies
        } else if self.peer {
            DependencyScope::PeerDependencies
        } else if self.optional {
            DependencyScope::OptionalDependencies
        } else {
            DependencyScope::Dependencies
        }
    }
}

/// Prints the outcome of synchronizing the project in `cwd`.
pub(crate) fn report_sync(report: &SyncReport, cwd: &Path) {
    let reconciliation = &report.reconciliation;

    for change in &reconciliation.import_changes {
        info!("{change}");
    }

    for change in &reconciliation.lock_changes {
        detail!("{change}");
    }

    for name in &report.changed {
        success!("Linked {name}");
    }

    if reconciliation.is_noop() {
        if report.changed.is_empty() {
            success!("Up to date.");
        }

        return;
    }

    if !reconciliation.installs.is_empty() {
        let manager = PackageManager::detect(cwd).unwrap_or(PackageManager::Npm);

        info!(
            "Run `{manager} install` to install {}",
            reconciliation.installs.join(", ")
        );
    }
}
