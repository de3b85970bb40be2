use std::path::Path;

use zen_cli_tools::*;
use zen_core::publish::unpublish;
use zen_errors::Result;

use crate::commands::open_session;

#[derive(clap::Parser)]
#[command(
    name = "unpublish",
    override_usage = "zen unpublish [OPTIONS]",
    about = "Removes the package from the global store"
)]
pub struct UnpublishCommand {
    /// Unpublish even if projects still have the package installed
    #[arg(long, short = 'f', default_value_t)]
    pub force: bool,
}

impl UnpublishCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(false)?;
        let unpublished = unpublish(&mut session, cwd, self.force)?;

        success!("Unpublished {}", unpublished.publish_name);

        if !unpublished.installations.is_empty() {
            warn!("The package was still installed in:");

            for installation in &unpublished.installations {
                detail!("{installation}");
            }
        }

        Ok(())
    }
}
