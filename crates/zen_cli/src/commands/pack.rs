use std::path::{Path, PathBuf};

use clap::ValueHint;
use zen_cli_tools::*;
use zen_core::publish::pack_package;
use zen_errors::Result;

use crate::commands::open_session;

#[derive(clap::Parser)]
#[command(
    name = "pack",
    override_usage = "zen pack [OPTIONS] <OUT>",
    about = "Packs the package into a directory, without publishing it"
)]
pub struct PackCommand {
    /// Directory to pack the package into
    #[arg(value_name = "OUT", value_hint = ValueHint::DirPath)]
    pub out: PathBuf,

    /// Skip the `prepack` and `postpack` scripts
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl PackCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let session = open_session(self.ignore_scripts)?;
        let out = cwd.join(&self.out);

        let output = pack_package(&session, cwd, &out)?;

        success!("Packed into {}", out.display());
        detail!("{} files, {} bytes", output.entry_files.len(), output.size_bytes);
        detail!("content hash: {}", output.content_hash);

        Ok(())
    }
}
