use std::path::Path;

use zen_cli_tools::*;
use zen_core::install::{CommandInstaller, Installer, PackageManager};
use zen_errors::Result;

use crate::error::UnknownPackageManager;

#[derive(clap::Parser)]
#[command(
    name = "install",
    override_usage = "zen install [OPTIONS] [MANAGER]",
    about = "Runs the package manager of the project"
)]
pub struct InstallCommand {
    /// Package manager to use, instead of detecting it from its lock file
    #[arg(value_name = "MANAGER", value_parser = ["npm", "yarn", "pnpm", "bun"])]
    pub manager: Option<String>,
}

impl InstallCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let manager = match &self.manager {
            Some(manager) => manager.parse::<PackageManager>()?,
            None => PackageManager::detect(cwd).ok_or_else(|| UnknownPackageManager {
                path: cwd.display().to_string(),
            })?,
        };

        info!("Running {manager} install");
        CommandInstaller.install(manager, cwd)?;
        success!("Installed dependencies with {manager}");

        Ok(())
    }
}
