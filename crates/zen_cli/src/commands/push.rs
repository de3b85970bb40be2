use std::path::Path;

use zen_cli_tools::*;
use zen_core::publish::{publish, push};
use zen_errors::{Result, SimpleDiagnostic};

use crate::commands::{open_session, report_sync};

#[derive(clap::Parser)]
#[command(
    name = "push",
    override_usage = "zen push [OPTIONS]",
    about = "Updates every project which installed the published package"
)]
pub struct PushCommand {
    /// Publish the package before pushing it
    #[arg(long, default_value_t)]
    pub publish: bool,

    /// Skip lifecycle scripts of the package and every updated project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl PushCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(self.ignore_scripts)?;

        if self.publish {
            let published = publish(&mut session, cwd)?;
            success!("Published {}", published.publish_name);
        }

        let outcomes = push(&mut session, cwd)?;
        if outcomes.is_empty() {
            info!("The package is not installed in any project.");
            return Ok(());
        }

        let mut failed = 0;

        for outcome in outcomes {
            info!("Pushing into {}", outcome.dir.display());

            match outcome.result {
                Ok(report) => report_sync(&report, &outcome.dir),
                Err(err) => {
                    error!("{}", err.message());
                    failed += 1;
                }
            }
        }

        if failed > 0 {
            return Err(SimpleDiagnostic::new(format!("could not push into {failed} project(s)"))
                .with_help("run `zen pull` within each failed project for details")
                .into());
        }

        Ok(())
    }
}
