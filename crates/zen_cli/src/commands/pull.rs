use std::path::Path;

use zen_core::Manifest;
use zen_core::sync::sync_project;
use zen_errors::Result;

use crate::commands::{open_session, report_sync};

#[derive(clap::Parser)]
#[command(
    name = "pull",
    override_usage = "zen pull [OPTIONS]",
    about = "Synchronizes the project with the newest compatible published packages"
)]
pub struct PullCommand {
    /// Skip lifecycle scripts of the project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl PullCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(self.ignore_scripts)?;
        let mut manifest = Manifest::read(cwd)?;

        let report = sync_project(&mut session, &mut manifest)?;
        report_sync(&report, cwd);

        Ok(())
    }
}
