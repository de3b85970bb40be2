use std::path::Path;

use zen_errors::{MapDiagnostic, Result};

/// Creates a directory recursively.
///
/// If the directory already exists, it is ignored.
pub fn create_dir(path: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&path).map_cause(format!("could not create directory {}", path.as_ref().display()))
}

/// Removes a file, or a directory recursively.
///
/// If the path does not exist, it is ignored.
pub fn remove(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    let result = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => Err(err),
    };

    result.map_cause(format!("could not delete {}", path.display()))
}

/// Copies a file or directory to the destination, overwriting existing files.
///
/// If the source is a directory, it will be copied recursively.
pub fn copy(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    let (src, dst) = (src.as_ref(), dst.as_ref());

    let result = if src.is_dir() {
        copy_dir(src, dst)
    } else {
        copy_file(src, dst)
    };

    result.map_cause(format!("could not copy {} to {}", src.display(), dst.display()))
}

fn copy_file(src: &Path, dst: &Path) -> std::io::Result<()> {
    if let Some(parent) = dst.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::copy(src, dst).map(|_| ())
}

/// Copies a directory recursively.
fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;

    for entry in std::fs::read_dir(src)? {
        let entry = entry?;

        if entry.file_type()?.is_dir() {
            copy_dir(&entry.path(), &dst.join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.join(entry.file_name()))?;
        }
    }

    Ok(())
}

/// Lists the names of every entry within the given directory.
pub fn entry_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let entries = std::fs::read_dir(path).map_cause(format!("could not read directory {}", path.display()))?;

    let mut names = Vec::new();

    for entry in entries {
        let entry = entry.map_cause(format!("could not read directory {}", path.display()))?;

        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    names.sort();

    Ok(names)
}

/// Lists the names of every visible directory within the given directory.
pub fn subdirectory_names(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();

    Ok(entry_names(path)?
        .into_iter()
        .filter(|name| !name.starts_with('.') && path.join(name).is_dir())
        .collect())
}
