use std::path::Path;

use zen_core::Manifest;
use zen_core::sync::{AddOptions, add_packages};
use zen_errors::Result;

use crate::commands::{ScopeArgs, open_session, report_sync};

#[derive(clap::Parser)]
#[command(
    name = "add",
    override_usage = "zen add [OPTIONS] <PACKAGE>...",
    about = "Adds published packages as dependencies of the project"
)]
pub struct AddCommand {
    /// Packages to add, such as `name`, `name@^1.2.0` or `@org/name@latest`
    #[arg(value_name = "PACKAGE", required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Copy the packages into the import directory of the project
    #[arg(long, short = 'i', default_value_t)]
    pub import: bool,

    /// Import every dependency of the packages as well
    #[arg(long, short = 'T', default_value_t)]
    pub traverse_imports: bool,

    /// Skip lifecycle scripts of the project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl AddCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let options = AddOptions {
            scope: self.scope.scope(),
            import: self.import || self.traverse_imports,
            traverse_imports: self.traverse_imports,
        };

        add(cwd, &self.packages, options, self.ignore_scripts)
    }
}

#[derive(clap::Parser)]
#[command(
    name = "import",
    override_usage = "zen import [OPTIONS] <PACKAGE>...",
    about = "Adds published packages, copied into the import directory of the project"
)]
pub struct ImportCommand {
    /// Packages to import, such as `name`, `name@^1.2.0` or `@org/name@latest`
    #[arg(value_name = "PACKAGE", required = true)]
    pub packages: Vec<String>,

    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Import every dependency of the packages as well
    #[arg(long, short = 'T', default_value_t)]
    pub traverse_imports: bool,

    /// Skip lifecycle scripts of the project
    #[arg(long, default_value_t)]
    pub ignore_scripts: bool,
}

impl ImportCommand {
    pub(crate) fn run(&self, cwd: &Path) -> Result<()> {
        let options = AddOptions {
            scope: self.scope.scope(),
            import: true,
            traverse_imports: self.traverse_imports,
        };

        add(cwd, &self.packages, options, self.ignore_scripts)
    }
}

fn add(cwd: &Path, packages: &[String], options: AddOptions, ignore_scripts: bool) -> Result<()> {
    let mut session = open_session(ignore_scripts)?;
    let mut manifest = Manifest::read(cwd)?;

    let report = add_packages(&mut session, &mut manifest, packages, options)?;
    report_sync(&report, cwd);

    Ok(())
}
