//! Directory-snapshot tar walking.
//!
//! The Docker archive endpoint returns a tar rooted at the requested
//! directory's base name, so entry paths are joined onto the parent of
//! the requested path to recover absolute in-container paths.

use std::path::{Path, PathBuf};

use stevedore_core::{DiscoveredFile, EnvironmentError};
use tar::Archive;

pub(crate) fn files_from_archive(
    bytes: &[u8],
    dir: &str,
    extension: &str,
) -> Result<Vec<DiscoveredFile>, EnvironmentError> {
    let parent: PathBuf = Path::new(dir)
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let mut archive = Archive::new(bytes);
    let mut files = Vec::new();

    let entries = archive
        .entries()
        .map_err(|e| EnvironmentError::Archive(e.to_string()))?;
    for entry in entries {
        let entry = entry.map_err(|e| EnvironmentError::Archive(e.to_string()))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let entry_path = entry
            .path()
            .map_err(|e| EnvironmentError::Archive(e.to_string()))?
            .into_owned();
        let Some(name) = entry_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
        else {
            continue;
        };

        let file_extension = entry_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        if !extension.is_empty() && file_extension != extension {
            continue;
        }

        files.push(DiscoveredFile {
            name,
            path: parent.join(&entry_path).to_string_lossy().into_owned(),
            extension: file_extension,
        });
    }

    Ok(files)
}
