use std::ffi::OsStr;
use std::path::Path;
use std::process::{Command, Stdio};

use zen_errors::{MapDiagnostic, Result};

use crate::errors::CommandFailed;

/// Executes the given command inside the given working directory, with the
/// standard streams of the current process.
///
/// When `quiet` is set, the output of the command is discarded.
///
/// # Errors
///
/// Returns [`Err`] if the command failed to spawn or exited with a non-zero
/// status code.
#[tracing::instrument(level = "DEBUG", skip_all, fields(binary = ?binary.as_ref()), err)]
pub fn execute_cwd<B, A, S, C>(binary: B, args: A, cwd: C, quiet: bool) -> Result<()>
where
    B: AsRef<OsStr>,
    A: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    C: AsRef<Path>,
{
    let mut cmd = Command::new(&binary);
    cmd.args(args);
    cmd.current_dir(cwd);

    cmd.stdin(Stdio::inherit());

    if quiet {
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
    } else {
        cmd.stdout(Stdio::inherit());
        cmd.stderr(Stdio::inherit());
    }

    let command = render_command(&cmd);
    tracing::debug!("executing `{command}`");

    let status = cmd.status().map_cause(format!("could not execute `{command}`"))?;

    if !status.success() {
        return Err(CommandFailed {
            command,
            status: status.code().unwrap_or(-1),
        }
        .into());
    }

    Ok(())
}

/// Builds a command which runs `script` through the platform shell.
pub fn shell(script: &str) -> (&'static str, [&str; 2]) {
    if cfg!(windows) {
        ("cmd", ["/C", script])
    } else {
        ("sh", ["-c", script])
    }
}

fn render_command(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}
