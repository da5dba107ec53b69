// src/infrastructure/backup.rs
use crate::constants::{DATABASE_NAME, TEMP_ARCHIVE};
use crate::domain::{Backup, Label};
use crate::infrastructure::sqlite::RawNote;
use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Write `database` as the only entry of a zip archive at `destination`.
///
/// The destination is truncated first. The caller is responsible for
/// checkpointing the database so the file is a consistent snapshot.
#[instrument(level = "debug")]
pub fn write_archive(database: &Path, destination: &Path) -> Result<()> {
    let output = File::create(destination)
        .with_context(|| format!("Failed to create backup file {}", destination.display()))?;
    let mut zip = ZipWriter::new(output);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(DATABASE_NAME, options)
        .context("Failed to start backup archive entry")?;
    let mut source = File::open(database)
        .with_context(|| format!("Failed to open database {}", database.display()))?;
    let bytes = io::copy(&mut source, &mut zip).context("Failed to write database to archive")?;
    zip.finish().context("Failed to finish backup archive")?;

    info!(bytes, destination = %destination.display(), "Wrote backup archive");
    Ok(())
}

/// Copy an archive into `scratch_dir` and extract its database entry there.
///
/// Returns `None` when the input is not a zip archive or has no entry named
/// `DATABASE_NAME`. I/O failures while copying are returned as errors.
#[instrument(level = "debug", skip(source))]
pub fn extract_database<R: Read>(source: &mut R, scratch_dir: &Path) -> Result<Option<PathBuf>> {
    let archive_path = scratch_dir.join(TEMP_ARCHIVE);
    let mut copy = File::create(&archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    io::copy(source, &mut copy).context("Failed to copy backup archive")?;
    drop(copy);

    let file = File::open(&archive_path)
        .with_context(|| format!("Failed to reopen {}", archive_path.display()))?;
    let mut archive = match ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(ZipError::InvalidArchive(reason)) | Err(ZipError::UnsupportedArchive(reason)) => {
            debug!(reason, "Input is not a readable zip archive");
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to read backup archive"),
    };

    let entries = archive.len();
    let mut entry = match archive.by_name(DATABASE_NAME) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            debug!(entries, "Archive has no database entry");
            return Ok(None);
        }
        Err(e) => return Err(e).context("Failed to open database entry"),
    };

    let database_path = scratch_dir.join(DATABASE_NAME);
    let mut output = File::create(&database_path)
        .with_context(|| format!("Failed to create {}", database_path.display()))?;
    io::copy(&mut entry, &mut output).context("Failed to extract database entry")?;

    Ok(Some(database_path))
}

/// Read every label and note of an extracted backup database.
///
/// Any missing table or column, NULL where text is expected, pinned value
/// outside {0, 1}, unknown enum text or malformed JSON fails the whole read.
#[instrument(level = "debug")]
pub fn read_database(path: &Path) -> Result<Backup> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .with_context(|| format!("Failed to open backup database {}", path.display()))?;

    let labels = {
        let mut stmt = conn
            .prepare("SELECT * FROM Label")
            .context("Backup has no Label table")?;
        let labels = stmt
            .query_map([], |row| Ok(Label::new(row.get::<_, String>("value")?)))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read Label rows")?;
        labels
    };

    let raw_notes = {
        let mut stmt = conn
            .prepare("SELECT * FROM BaseNote")
            .context("Backup has no BaseNote table")?;
        let rows = stmt
            .query_map([], RawNote::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read BaseNote rows")?;
        rows
    };

    let mut notes = Vec::with_capacity(raw_notes.len());
    for (index, raw) in raw_notes.into_iter().enumerate() {
        let note = raw
            .into_note(0)
            .with_context(|| format!("Failed to decode BaseNote row {index}"))?;
        notes.push(note);
    }

    if notes.is_empty() && labels.is_empty() {
        debug!("Backup database is empty");
    }
    Ok(Backup { notes, labels })
}

/// Extract and read an archive in one step; `None` if it is not a backup
pub fn read_archive<R: Read>(source: &mut R, scratch_dir: &Path) -> Result<Option<Backup>> {
    match extract_database(source, scratch_dir)? {
        Some(database) => read_database(&database).map(Some),
        None => Ok(None),
    }
}
