use std::path::Path;

use zen_errors::Result;

use crate::errors::ScriptFailed;
use crate::manifest::{MANIFEST_FILE_NAME, Manifest};

/// Points in the package lifecycle where user scripts are invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    PostAdd,
    PostRemove,
    PostUpdate,
    PrePack,
    PostPack,
}

impl LifecycleEvent {
    /// Gets the name of the manifest script which handles the event.
    pub fn script_name(self) -> &'static str {
        match self {
            LifecycleEvent::PostAdd => "zen-postadd",
            LifecycleEvent::PostRemove => "zen-postremove",
            LifecycleEvent::PostUpdate => "zen-postupdate",
            LifecycleEvent::PrePack => "prepack",
            LifecycleEvent::PostPack => "postpack",
        }
    }
}

impl std::fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.script_name())
    }
}

/// Runs user-defined lifecycle scripts.
pub trait ScriptRunner {
    /// Runs the script for `event` of the package in `dir`, if it defines one.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the script exists but failed.
    fn run(&self, event: LifecycleEvent, dir: &Path) -> Result<()>;
}

/// Runs the scripts defined in the `scripts` block of a package manifest,
/// through the platform shell.
#[derive(Default, Debug, Clone, Copy)]
pub struct PackageScripts;

impl ScriptRunner for PackageScripts {
    #[tracing::instrument(level = "DEBUG", skip(self), err)]
    fn run(&self, event: LifecycleEvent, dir: &Path) -> Result<()> {
        if !dir.join(MANIFEST_FILE_NAME).is_file() {
            return Ok(());
        }

        let manifest = Manifest::read(dir)?;

        let Some(script) = manifest.script(event.script_name()) else {
            tracing::trace!("no {event} script in {}", dir.display());
            return Ok(());
        };

        let (binary, args) = crate::cmd::shell(script);

        crate::cmd::execute_cwd(binary, args, dir, false).map_err(|err| {
            ScriptFailed {
                script: event.script_name().to_string(),
                dir: dir.to_path_buf(),
                inner: vec![err],
            }
            .into()
        })
    }
}

/// Script runner which never runs anything.
#[derive(Default, Debug, Clone, Copy)]
pub struct SkipScripts;

impl ScriptRunner for SkipScripts {
    fn run(&self, event: LifecycleEvent, dir: &Path) -> Result<()> {
        tracing::trace!("skipping {event} script in {}", dir.display());

        Ok(())
    }
}
