use std::path::PathBuf;

use zen_errors::Result;

use crate::errors::HomeDirectoryMissing;

/// Defines the name of the environment variable, which overrides where zen
/// keeps its global store and published packages.
pub const ZEN_HOME_ENVKEY: &str = "ZEN_HOME";

/// Defines which subfolder of the user's home directory to place the zen home
/// directory inside, when [`ZEN_HOME_ENVKEY`] is not set.
pub const ZEN_HOME_FOLDER: &str = ".zen-cli";

/// Defines the subfolder of the zen home directory which holds every
/// published package.
pub const PACKAGES_FOLDER: &str = "packages";

/// Determines the zen home directory of the current user.
///
/// # Errors
///
/// Returns `Err` if [`ZEN_HOME_ENVKEY`] is unset and the user has no home
/// directory.
#[tracing::instrument(level = "TRACE", ret)]
pub fn zen_home() -> Result<PathBuf> {
    // Prioritize the user-defined location for the home directory.
    if let Some(dir) = std::env::var_os(ZEN_HOME_ENVKEY)
        && !dir.is_empty()
    {
        return Ok(PathBuf::from(dir));
    }

    if let Some(home) = dirs::home_dir() {
        return Ok(home.join(ZEN_HOME_FOLDER));
    }

    Err(HomeDirectoryMissing {
        envkey: ZEN_HOME_ENVKEY.to_string(),
    }
    .into())
}
