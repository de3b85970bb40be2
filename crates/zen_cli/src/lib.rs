pub(crate) mod error;
mod tracing;

mod commands {
    pub mod add;
    pub mod batch;
    pub mod install;
    pub mod list;
    pub mod pack;
    pub mod publish;
    pub mod pull;
    pub mod push;
    pub mod remove;
    pub mod stage;
    pub mod unpublish;

    mod shared;
    pub(crate) use shared::*;
}

use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueHint};
use zen_errors::DiagCtx;

#[derive(Parser)]
#[clap(
    name = "zen",
    version = env!("CARGO_PKG_VERSION"),
    about = "Local-first package manager for sharing packages between projects"
)]
#[command(subcommand_required(true), arg_required_else_help(true))]
struct ZenCli {
    /// Directory of the project to act on
    #[clap(long, global = true, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub cwd: Option<PathBuf>,

    /// Print diagnostic logs to stderr
    #[clap(long, global = true, default_value_t)]
    pub trace: bool,

    /// Verbose output
    #[clap(long, short = 'v', global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors
    #[clap(long, short = 'q', global = true, default_value_t)]
    pub quiet: bool,

    #[clap(subcommand)]
    pub subcommand: Subcommands,
}

#[derive(Parser)]
enum Subcommands {
    Add(commands::add::AddCommand),
    Import(commands::add::ImportCommand),
    Remove(commands::remove::RemoveCommand),
    Pull(commands::pull::PullCommand),
    Publish(commands::publish::PublishCommand),
    Unpublish(commands::unpublish::UnpublishCommand),
    Push(commands::push::PushCommand),
    List(commands::list::ListCommand),
    Pack(commands::pack::PackCommand),
    Install(commands::install::InstallCommand),
    Stage(commands::stage::StageCommand),
    Batch(commands::batch::BatchCommand),
}

pub fn zen_cli_entry() {
    let matches = ZenCli::parse();
    let dcx = DiagCtx::new();

    zen_cli_tools::set_quiet(matches.quiet);

    if matches.trace || matches.verbose > 0 {
        crate::tracing::register_console_tracer(matches.verbose);
    }

    let _ = dcx.with_opt(|_handle| {
        let cwd = commands::project_or_cwd(matches.cwd.as_ref())?;

        match matches.subcommand {
            Subcommands::Add(cmd) => cmd.run(&cwd),
            Subcommands::Import(cmd) => cmd.run(&cwd),
            Subcommands::Remove(cmd) => cmd.run(&cwd),
            Subcommands::Pull(cmd) => cmd.run(&cwd),
            Subcommands::Publish(cmd) => cmd.run(&cwd),
            Subcommands::Unpublish(cmd) => cmd.run(&cwd),
            Subcommands::Push(cmd) => cmd.run(&cwd),
            Subcommands::List(cmd) => cmd.run(&cwd),
            Subcommands::Pack(cmd) => cmd.run(&cwd),
            Subcommands::Install(cmd) => cmd.run(&cwd),
            Subcommands::Stage(cmd) => cmd.run(&cwd),
            Subcommands::Batch(cmd) => cmd.run(&cwd),
        }
    });

    let tainted = dcx.is_tainted();

    let mut renderer = error_snippet::GraphicalRenderer::new();
    renderer.use_colors = true;
    renderer.highlight_source = true;

    dcx.render_stderr(&mut renderer);
    dcx.clear();

    if tainted {
        std::process::exit(133);
    }
}
