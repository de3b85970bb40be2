use std::path::Path;

use zen_cli_tools::*;
use zen_core::publish::{PackageStatus, list};
use zen_errors::Result;

use crate::commands::open_session;

#[derive(clap::Parser)]
#[command(
    name = "list",
    override_usage = "zen list [OPTIONS]",
    about = "Lists the locked packages of the project"
)]
pub struct ListCommand {
    /// Print every published version of each package
    #[arg(long, default_value_t)]
    pub versions: bool,
}

impl ListCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(false)?;
        let statuses = list(&mut session, cwd)?;

        if statuses.is_empty() {
            info!("No packages are locked.");
            return Ok(());
        }

        for status in &statuses {
            #[allow(clippy::disallowed_macros, reason = "used in CLI")]
            {
                println!("{}", describe(status));
            }

            if self.versions {
                detail!("versions: {}", status.versions.join(", "));
            }
        }

        Ok(())
    }
}

fn describe(status: &PackageStatus) -> String {
    let mut line = format!("{}@{} ({})", status.name, status.version_resolve, status.version);

    if status.published_signature.is_none() {
        line.push_str(" [unpublished]");
    } else if !status.is_fresh() {
        line.push_str(" [outdated signature]");
    }

    if !status.is_latest()
        && let Some(latest) = &status.latest_compatible
    {
        line.push_str(&format!(" [{latest} available]"));
    }

    line
}
