use std::path::Path;
use std::str::FromStr;

use zen_errors::{Result, SimpleDiagnostic};

use crate::reconcile::DEPENDENCY_DIR;

/// Package managers which zen can delegate installation to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Lock files which identify each package manager, in detection order.
    const LOCK_FILES: &[(&str, PackageManager)] = &[
        ("bun.lockb", PackageManager::Bun),
        ("bun.lock", PackageManager::Bun),
        ("pnpm-lock.yaml", PackageManager::Pnpm),
        ("yarn.lock", PackageManager::Yarn),
        ("package-lock.json", PackageManager::Npm),
    ];

    pub fn binary(self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Detects the package manager of the project in `dir` from its lock
    /// file.
    pub fn detect(dir: &Path) -> Option<PackageManager> {
        Self::LOCK_FILES
            .iter()
            .find(|(lock_file, _)| dir.join(lock_file).is_file())
            .map(|(_, manager)| *manager)
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

impl FromStr for PackageManager {
    type Err = zen_errors::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            "bun" => Ok(PackageManager::Bun),
            _ => Err(SimpleDiagnostic::new(format!("unknown package manager `{s}`"))
                .with_help("expected one of npm, yarn, pnpm or bun")
                .into()),
        }
    }
}

/// Installs the regular dependencies of a project.
pub trait Installer {
    /// Installs the dependencies of the project in `dir`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the installation failed.
    fn install(&self, manager: PackageManager, dir: &Path) -> Result<()>;
}

/// Installs dependencies by invoking the package manager binary.
#[derive(Default, Debug, Clone, Copy)]
pub struct CommandInstaller;

impl Installer for CommandInstaller {
    #[tracing::instrument(level = "DEBUG", skip(self), err)]
    fn install(&self, manager: PackageManager, dir: &Path) -> Result<()> {
        // Yarn skips linking when its integrity file is unchanged, which hides
        // packages injected into the dependency directory.
        if manager == PackageManager::Yarn {
            crate::fs::remove(dir.join(DEPENDENCY_DIR).join(".yarn-integrity"))?;
        }

        crate::cmd::execute_cwd(manager.binary(), ["install"], dir, false)
    }
}
