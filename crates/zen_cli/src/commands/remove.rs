use std::path::Path;

use zen_core::Manifest;
use zen_core::sync::remove_packages;
use zen_errors::Result;

use crate::commands::{open_session, report_sync};

#[derive(clap::Parser)]
#[command(
    name = "remove",
    override_usage = "zen remove [OPTIONS] <PACKAGE>...",
    about = "Removes packages from every dependency scope of the project"
)]
pub struct RemoveCommand {
    /// Packages to remove
    #[arg(value_name = "PACKAGE", required = true)]
    pub packages: Vec<String>,

    /// Skip lifecycle scripts of the project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl RemoveCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(self.ignore_scripts)?;
        let mut manifest = Manifest::read(cwd)?;

        let report = remove_packages(&mut session, &mut manifest, &self.packages)?;
        report_sync(&report, cwd);

        Ok(())
    }
}
