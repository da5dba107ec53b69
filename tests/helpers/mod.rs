use anyhow::{Context, Result};
use notekeep::application::{ModelEvent, NoteModel};
use notekeep::constants::DATABASE_NAME;
use notekeep::infrastructure::{Config, NoteStore};
use rusqlite::Connection;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Creation time used by fixtures: Wed 14 Oct 2026 12:00 UTC
#[allow(dead_code)]
pub const WEDNESDAY: i64 = 1_791_979_200_000;

/// Upper bound for any stream to catch up with a store change
#[allow(dead_code)]
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Table layout of an exported backup database, without the id column
#[allow(dead_code)]
pub const RAW_SCHEMA: &str = "
    CREATE TABLE Label (value TEXT);
    CREATE TABLE BaseNote (type TEXT, folder TEXT, color TEXT, title TEXT, pinned INTEGER,
        timestamp INTEGER, labels TEXT, body TEXT, spans TEXT, items TEXT);";

/// Temporary data and cache directories for one test
#[allow(dead_code)]
pub struct TestWorkspace {
    temp_dir: TempDir,
    pub config: Config,
}

#[allow(dead_code)]
impl TestWorkspace {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir().context("Failed to create temporary directory")?;
        let config = Config::in_dir(temp_dir.path());
        Ok(Self { temp_dir, config })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub async fn open_model(
        &self,
    ) -> Result<(NoteModel<NoteStore>, UnboundedReceiver<ModelEvent>)> {
        NoteModel::open(&self.config).await
    }

    /// Build a database with `RAW_SCHEMA` plus `inserts`, zipped as a backup
    pub fn raw_backup(&self, name: &str, inserts: &str) -> Result<PathBuf> {
        self.database_backup(name, &format!("{RAW_SCHEMA}\n{inserts}"))
    }

    /// Build a database from arbitrary `sql`, zipped as a backup
    pub fn database_backup(&self, name: &str, sql: &str) -> Result<PathBuf> {
        let database = self.path(&format!("{name}.db"));
        let conn = Connection::open(&database)?;
        conn.execute_batch(sql)?;
        drop(conn);

        let bytes = std::fs::read(&database)?;
        self.archive(name, DATABASE_NAME, &bytes)
    }

    /// Zip archive holding one entry
    pub fn archive(&self, name: &str, entry: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.path(&format!("{name}.zip"));
        let mut zip = ZipWriter::new(File::create(&path)?);
        zip.start_file(entry, FileOptions::default())?;
        zip.write_all(bytes)?;
        zip.finish()?;
        Ok(path)
    }

    pub fn write(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.path(name);
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

/// Legacy store layout: one XML document per note under the folder dirs
#[allow(dead_code)]
pub fn write_legacy_note(root: &Path, folder_dir: &str, file: &str, xml: &str) -> Result<()> {
    let dir = root.join(folder_dir);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join(file), xml)?;
    Ok(())
}
