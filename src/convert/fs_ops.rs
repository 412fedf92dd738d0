use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use filetime::FileTime;
use walkdir::WalkDir;

use crate::print_warning;

/// List log files directly inside the given directory.
///
/// Only regular files whose name ends with `.<extension>` (case-insensitive) are included.
/// Subdirectories are not entered. Names that are not valid UTF-8 are skipped with a warning.
/// The returned names are sorted.
pub fn list_log_files(dir: &Path, extension: &str) -> Result<Vec<String>> {
    let suffix = format!(".{}", extension.to_lowercase());
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.with_context(|| format!("Failed to read directory {}", dir.display()))?;
        if !entry.path().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            print_warning!(
                "Warning: {} is not a valid UTF-8 file name. Skipping.",
                entry.file_name().to_string_lossy()
            );
            continue;
        };
        if name.to_lowercase().ends_with(&suffix) {
            names.push(name.to_string());
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Copy file content, permissions and timestamps.
pub fn copy_with_metadata(source: &Path, target: &Path) -> Result<()> {
    fs::copy(source, target)
        .with_context(|| format!("Failed to copy {} to {}", source.display(), target.display()))?;
    copy_metadata(source, target)
}

/// Copy access time, modification time and permission bits from `source` onto `target`.
pub fn copy_metadata(source: &Path, target: &Path) -> Result<()> {
    let metadata =
        fs::metadata(source).with_context(|| format!("Failed to read metadata of {}", source.display()))?;

    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(target, accessed, modified)
        .with_context(|| format!("Failed to set timestamps of {}", target.display()))?;

    // Permissions last, the target may become read-only
    fs::set_permissions(target, metadata.permissions())
        .with_context(|| format!("Failed to set permissions of {}", target.display()))
}

/// Move a file, replacing an existing target.
///
/// Falls back to copy and delete when the rename would cross a filesystem boundary.
pub fn move_file(source: &Path, target: &Path) -> Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            copy_with_metadata(source, target)?;
            fs::remove_file(source).with_context(|| format!("Failed to remove {}", source.display()))
        }
        Err(error) => Err(error)
            .with_context(|| format!("Failed to move {} to {}", source.display(), target.display())),
    }
}

/// Create a directory and all its parents.
///
/// An existing directory counts as success; an existing file or any other failure is an error.
pub fn create_dir(path: &Path) -> Result<()> {
    match fs::create_dir_all(path) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(error) => Err(error).with_context(|| format!("Failed to create directory {}", path.display())),
    }
}
