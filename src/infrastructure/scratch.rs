// src/infrastructure/scratch.rs
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Return `parent/name`, created if needed and emptied of files otherwise.
///
/// Cleanup happens before use, so files from a failed run stay around until
/// the next call.
pub fn empty_folder(parent: &Path, name: &str) -> Result<PathBuf> {
    let folder = parent.join(name);
    if folder.exists() {
        for entry in fs::read_dir(&folder)
            .with_context(|| format!("Failed to list {}", folder.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                trace!(path = %path.display(), "Removing stale scratch file");
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
    } else {
        fs::create_dir_all(&folder)
            .with_context(|| format!("Failed to create {}", folder.display()))?;
    }
    Ok(folder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn given_missing_folder_when_emptying_then_creates_it() {
        let temp_dir = TempDir::new().unwrap();

        let folder = empty_folder(temp_dir.path(), "exported").unwrap();

        assert!(folder.is_dir());
    }

    #[test]
    fn given_stale_files_when_emptying_then_removes_them() {
        let temp_dir = TempDir::new().unwrap();
        let folder = empty_folder(temp_dir.path(), "backup").unwrap();
        fs::write(folder.join("TEMP.zip"), b"stale").unwrap();

        let folder = empty_folder(temp_dir.path(), "backup").unwrap();

        assert_eq!(fs::read_dir(folder).unwrap().count(), 0);
    }
}
