use std::path::Path;

use zen_cli_tools::*;
use zen_core::cmd::{execute_cwd, shell};
use zen_core::fs::subdirectory_names;
use zen_errors::Result;

#[derive(clap::Parser)]
#[command(
    name = "batch",
    override_usage = "zen batch [OPTIONS] <COMMAND>",
    about = "Runs a command within every subdirectory"
)]
pub struct BatchCommand {
    /// Command to run through the platform shell, such as `zen pull`
    #[arg(value_name = "COMMAND")]
    pub command: String,

    /// Report failing directories as warnings instead of stopping
    #[arg(long, default_value_t)]
    pub warn_errors: bool,
}

impl BatchCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let (binary, args) = shell(&self.command);

        for (index, name) in subdirectory_names(cwd)?.iter().enumerate() {
            info!("Executing {index} - \"{name}\"");

            match execute_cwd(binary, args, cwd.join(name), false) {
                Ok(()) => {}
                Err(err) if self.warn_errors => warn!("{name}: {}", err.message()),
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn batch(command: &str, warn_errors: bool) -> BatchCommand {
        BatchCommand {
            command: command.to_string(),
            warn_errors,
        }
    }

    fn workspace() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();

        std::fs::create_dir(dir.path().join("app")).unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("README.md"), "").unwrap();

        dir
    }

    #[test]
    fn runs_in_every_subdirectory() {
        let dir = workspace();

        batch("touch marker", false).run(dir.path()).unwrap();

        assert!(dir.path().join("app/marker").is_file());
        assert!(dir.path().join("lib/marker").is_file());
        assert!(!dir.path().join("marker").exists());
    }

    #[test]
    fn failure_stops_the_batch() {
        let dir = workspace();

        assert!(batch("touch marker && exit 1", false).run(dir.path()).is_err());

        assert!(dir.path().join("app/marker").is_file());
        assert!(!dir.path().join("lib/marker").exists());
    }

    #[test]
    fn failures_can_be_warned() {
        let dir = workspace();

        batch("touch marker && exit 1", true).run(dir.path()).unwrap();

        assert!(dir.path().join("lib/marker").is_file());
    }
}
