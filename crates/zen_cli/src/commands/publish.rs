use std::path::Path;

use zen_cli_tools::*;
use zen_core::publish::publish;
use zen_errors::Result;

use crate::commands::open_session;

#[derive(clap::Parser)]
#[command(
    name = "publish",
    override_usage = "zen publish [OPTIONS]",
    about = "Publishes the package into the global store"
)]
pub struct PublishCommand {
    /// Skip the `prepack` and `postpack` scripts
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl PublishCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let mut session = open_session(self.ignore_scripts)?;
        let published = publish(&mut session, cwd)?;

        success!("Published {}", published.publish_name);
        detail!("signature: {}", published.signature);
        detail!(
            "{} files, {} bytes",
            published.pack.entry_files.len(),
            published.pack.size_bytes
        );
        detail!("{}", published.path.display());

        Ok(())
    }
}
