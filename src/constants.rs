// src/constants.rs
//
// Names shared by the store, the backup format and the export paths.

/// File name of the primary database, and the single entry name inside a
/// backup archive.
pub const DATABASE_NAME: &str = "NotekeepDatabase";

/// Scratch directory (under the cache dir) used while importing an archive
pub const BACKUP_DIR: &str = "backup";

/// Scratch directory (under the cache dir) holding single-note exports
pub const EXPORTED_DIR: &str = "exported";

/// Name the incoming archive is copied to inside `BACKUP_DIR`
pub const TEMP_ARCHIVE: &str = "TEMP.zip";

/// Stem of every single-note export file; callers pick the final name
pub const EXPORT_FILE_STEM: &str = "Untitled";

/// Preference file name inside the data dir
pub const PREFERENCES_FILE: &str = "preferences.toml";
