use std::path::Path;

use clap::ValueEnum;
use zen_cli_tools::*;
use zen_core::Manifest;
use zen_core::sync::{stage_production, sync_project};
use zen_errors::Result;

use crate::commands::{open_session, report_sync};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Declare registry versions, ready to be published elsewhere
    Production,

    /// Declare local paths into the global store again
    Development,
}

#[derive(clap::Parser)]
#[command(
    name = "stage",
    override_usage = "zen stage [OPTIONS] <STAGE>",
    about = "Switches the declared dependencies between local paths and versions"
)]
pub struct StageCommand {
    #[arg(value_enum, value_name = "STAGE")]
    pub stage: Stage,

    /// Declare the locked versions instead of the declared ranges
    #[arg(long, default_value_t)]
    pub exact: bool,

    /// Skip lifecycle scripts of the project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl StageCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(self.ignore_scripts)?;
        let mut manifest = Manifest::read(cwd)?;

        match self.stage {
            Stage::Production => {
                let converted = stage_production(&session, &mut manifest, self.exact)?;

                if converted.is_empty() {
                    success!("Already staged for production.");
                } else {
                    success!("Staged for production:");

                    for change in &converted {
                        detail!("{change}");
                    }
                }
            }
            Stage::Development => {
                let report = sync_project(&mut session, &mut manifest)?;
                report_sync(&report, cwd);
            }
        }

        Ok(())
    }
}
