use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::path::Path;

use crate::Result;
use crate::SystemError;

/// Opens `path` for appending, creating it and any missing parent
/// directories.
pub fn open_file_for_append(path: &Path) -> Result<File> {
    create_parent_dir_if_not_exist(path)?;
    OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| SystemError::Observability(format!("failed to open {}: {}", path.display(), e)).into())
}

pub(crate) fn create_parent_dir_if_not_exist(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                SystemError::Observability(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }
    }
    Ok(())
}
