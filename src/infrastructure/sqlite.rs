// src/infrastructure/sqlite.rs
use crate::application::NoteRepository;
use crate::domain::{Color, DomainError, Folder, Label, Note, NoteType};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS Label (
    value TEXT NOT NULL PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS BaseNote (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    type TEXT NOT NULL,
    folder TEXT NOT NULL,
    color TEXT NOT NULL,
    title TEXT NOT NULL,
    pinned INTEGER NOT NULL,
    timestamp INTEGER NOT NULL,
    labels TEXT NOT NULL,
    body TEXT NOT NULL,
    spans TEXT NOT NULL,
    items TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS BaseNote_folder ON BaseNote (folder, pinned, timestamp);
"#;

const ORDERING: &str = "ORDER BY pinned DESC, timestamp DESC";

pub(crate) fn storage(err: impl std::fmt::Display) -> DomainError {
    DomainError::Storage(err.to_string())
}

/// Columns of a `BaseNote` row as stored, before any decoding.
///
/// Every column is looked up by name so a table missing one fails to load.
#[derive(Debug)]
pub(crate) struct RawNote {
    pub note_type: String,
    pub folder: String,
    pub color: String,
    pub title: String,
    pub pinned: i64,
    pub timestamp: i64,
    pub labels: String,
    pub body: String,
    pub spans: String,
    pub items: String,
}

impl RawNote {
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            note_type: row.get("type")?,
            folder: row.get("folder")?,
            color: row.get("color")?,
            title: row.get("title")?,
            pinned: row.get("pinned")?,
            timestamp: row.get("timestamp")?,
            labels: row.get("labels")?,
            body: row.get("body")?,
            spans: row.get("spans")?,
            items: row.get("items")?,
        })
    }

    /// Decode enum text, the pinned flag and the embedded JSON columns
    pub fn into_note(self, id: i64) -> Result<Note, DomainError> {
        let pinned = match self.pinned {
            0 => false,
            1 => true,
            other => return Err(DomainError::InvalidPinned(other)),
        };

        Ok(Note {
            id,
            note_type: self.note_type.parse::<NoteType>()?,
            folder: self.folder.parse::<Folder>()?,
            color: self.color.parse::<Color>()?,
            title: self.title,
            pinned,
            timestamp: self.timestamp,
            labels: serde_json::from_str(&self.labels).map_err(|e| {
                DomainError::InvalidBackup(format!("labels column is not valid JSON: {e}"))
            })?,
            body: self.body,
            spans: serde_json::from_str(&self.spans).map_err(|e| {
                DomainError::InvalidBackup(format!("spans column is not valid JSON: {e}"))
            })?,
            items: serde_json::from_str(&self.items).map_err(|e| {
                DomainError::InvalidBackup(format!("items column is not valid JSON: {e}"))
            })?,
        })
    }
}

/// Escape `LIKE` wildcards so a keyword only matches literally
fn like_pattern(keyword: &str) -> String {
    let mut escaped = String::with_capacity(keyword.len() + 2);
    escaped.push('%');
    for c in keyword.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn insert_note_row(conn: &Connection, note: &Note) -> Result<i64, DomainError> {
    conn.execute(
        "INSERT INTO BaseNote (type, folder, color, title, pinned, timestamp, labels, body, spans, items)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            note.note_type.as_str(),
            note.folder.as_str(),
            note.color.as_str(),
            note.title,
            note.pinned,
            note.timestamp,
            serde_json::to_string(&note.labels).map_err(storage)?,
            note.body,
            serde_json::to_string(&note.spans).map_err(storage)?,
            serde_json::to_string(&note.items).map_err(storage)?,
        ],
    )
    .map_err(storage)?;
    Ok(conn.last_insert_rowid())
}

/// Ids and decoded label sets of every note carrying `label`
fn notes_with_label(
    conn: &Connection,
    label: &str,
) -> Result<Vec<(i64, BTreeSet<String>)>, DomainError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, labels FROM BaseNote
             WHERE EXISTS (SELECT 1 FROM json_each(BaseNote.labels) WHERE json_each.value = ?1)",
        )
        .map_err(storage)?;
    let rows = stmt
        .query_map([label], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
        .map_err(storage)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage)?;

    rows.into_iter()
        .map(|(id, labels)| {
            let labels: BTreeSet<String> = serde_json::from_str(&labels).map_err(storage)?;
            Ok((id, labels))
        })
        .collect()
}

fn write_labels(conn: &Connection, id: i64, labels: &BTreeSet<String>) -> Result<usize, DomainError> {
    conn.execute(
        "UPDATE BaseNote SET labels = ?2 WHERE id = ?1",
        params![id, serde_json::to_string(labels).map_err(storage)?],
    )
    .map_err(storage)
}

/// SQLite-backed note store, one connection per instance
pub struct NoteStore {
    conn: Connection,
    path: PathBuf,
    changes: watch::Sender<u64>,
}

impl NoteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = PathBuf::from(path.as_ref());
        debug!(?path, "Opening note store");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory {}", parent.display()))?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let journal_mode: String = conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .context("Failed to enable write-ahead logging")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create note store schema")?;

        let (changes, _) = watch::channel(0);
        info!(?path, %journal_mode, "Opened note store");
        Ok(Self {
            conn,
            path,
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    fn query_notes(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Vec<Note>, DomainError> {
        let mut stmt = self.conn.prepare(sql).map_err(storage)?;
        let rows = stmt
            .query_map(params, |row| Ok((row.get::<_, i64>("id")?, RawNote::from_row(row)?)))
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;

        rows.into_iter().map(|(id, raw)| raw.into_note(id)).collect()
    }

    fn expect_updated(&self, id: i64, updated: usize) -> Result<(), DomainError> {
        if updated == 0 {
            debug!(note_id = id, "No note updated");
            return Err(DomainError::NoteNotFound(id));
        }
        self.notify();
        Ok(())
    }
}

impl NoteRepository for NoteStore {
    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    #[instrument(level = "debug", skip(self))]
    fn get_note(&mut self, id: i64) -> Result<Note, DomainError> {
        self.query_notes("SELECT * FROM BaseNote WHERE id = ?1", [id])?
            .into_iter()
            .next()
            .ok_or(DomainError::NoteNotFound(id))
    }

    #[instrument(level = "trace", skip(self))]
    fn get_from(&mut self, folder: Folder) -> Result<Vec<Note>, DomainError> {
        self.query_notes(
            &format!("SELECT * FROM BaseNote WHERE folder = ?1 {ORDERING}"),
            [folder.as_str()],
        )
    }

    #[instrument(level = "trace", skip(self))]
    fn get_by_label(&mut self, label: &str) -> Result<Vec<Note>, DomainError> {
        self.query_notes(
            &format!(
                "SELECT * FROM BaseNote WHERE folder = ?1
                 AND EXISTS (SELECT 1 FROM json_each(BaseNote.labels) WHERE json_each.value = ?2)
                 {ORDERING}"
            ),
            params![Folder::Notes.as_str(), label],
        )
    }

    #[instrument(level = "trace", skip(self))]
    fn search(&mut self, keyword: &str, folder: Folder) -> Result<Vec<Note>, DomainError> {
        if keyword.is_empty() {
            return Ok(Vec::new());
        }

        self.query_notes(
            &format!(
                r"SELECT * FROM BaseNote WHERE folder = ?1 AND (
                    title LIKE ?2 ESCAPE '\'
                    OR body LIKE ?2 ESCAPE '\'
                    OR EXISTS (SELECT 1 FROM json_each(BaseNote.items)
                               WHERE json_extract(json_each.value, '$.body') LIKE ?2 ESCAPE '\')
                    OR EXISTS (SELECT 1 FROM json_each(BaseNote.labels)
                               WHERE json_each.value LIKE ?2 ESCAPE '\')
                ) {ORDERING}"
            ),
            params![folder.as_str(), like_pattern(keyword)],
        )
    }

    fn labels(&mut self) -> Result<Vec<String>, DomainError> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM Label ORDER BY value")
            .map_err(storage)?;
        let labels = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(storage)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(storage)?;
        Ok(labels)
    }

    #[instrument(level = "debug", skip(self, note), fields(title = %note.title))]
    fn insert_note(&mut self, note: &Note) -> Result<i64, DomainError> {
        let id = insert_note_row(&self.conn, note)?;
        self.notify();
        Ok(id)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_color(&mut self, id: i64, color: Color) -> Result<(), DomainError> {
        let updated = self
            .conn
            .execute(
                "UPDATE BaseNote SET color = ?2 WHERE id = ?1",
                params![id, color.as_str()],
            )
            .map_err(storage)?;
        self.expect_updated(id, updated)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_pinned(&mut self, id: i64, pinned: bool) -> Result<(), DomainError> {
        let updated = self
            .conn
            .execute(
                "UPDATE BaseNote SET pinned = ?2 WHERE id = ?1",
                params![id, pinned],
            )
            .map_err(storage)?;
        self.expect_updated(id, updated)
    }

    #[instrument(level = "debug", skip(self))]
    fn move_note(&mut self, id: i64, folder: Folder) -> Result<(), DomainError> {
        let updated = self
            .conn
            .execute(
                "UPDATE BaseNote SET folder = ?2 WHERE id = ?1",
                params![id, folder.as_str()],
            )
            .map_err(storage)?;
        self.expect_updated(id, updated)
    }

    #[instrument(level = "debug", skip(self))]
    fn update_labels(&mut self, id: i64, labels: &BTreeSet<String>) -> Result<(), DomainError> {
        let updated = write_labels(&self.conn, id, labels)?;
        self.expect_updated(id, updated)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_note(&mut self, id: i64) -> Result<(), DomainError> {
        let deleted = self
            .conn
            .execute("DELETE FROM BaseNote WHERE id = ?1", [id])
            .map_err(storage)?;
        self.expect_updated(id, deleted)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_from(&mut self, folder: Folder) -> Result<usize, DomainError> {
        let deleted = self
            .conn
            .execute("DELETE FROM BaseNote WHERE folder = ?1", [folder.as_str()])
            .map_err(storage)?;
        info!(%folder, deleted, "Deleted notes permanently");
        self.notify();
        Ok(deleted)
    }

    #[instrument(level = "debug", skip(self))]
    fn insert_label(&mut self, label: &Label) -> Result<bool, DomainError> {
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO Label (value) VALUES (?1)",
                [&label.value],
            )
            .map_err(storage)?;
        if inserted == 0 {
            debug!(label = %label.value, "Label already exists");
            return Ok(false);
        }
        self.notify();
        Ok(true)
    }

    #[instrument(level = "debug", skip(self))]
    fn delete_label(&mut self, value: &str) -> Result<(), DomainError> {
        let tx = self.conn.transaction().map_err(storage)?;
        tx.execute("DELETE FROM Label WHERE value = ?1", [value])
            .map_err(storage)?;
        for (id, mut labels) in notes_with_label(&tx, value)? {
            labels.remove(value);
            write_labels(&tx, id, &labels)?;
        }
        tx.commit().map_err(storage)?;
        self.notify();
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn update_label(&mut self, old: &str, new: &str) -> Result<bool, DomainError> {
        let tx = self.conn.transaction().map_err(storage)?;
        let exists = |value: &str| {
            tx.query_row("SELECT 1 FROM Label WHERE value = ?1", [value], |_| Ok(()))
                .optional()
                .map(|found| found.is_some())
                .map_err(storage)
        };
        if !exists(old)? || exists(new)? {
            debug!(old, new, "Label rename rejected");
            return Ok(false);
        }

        tx.execute("UPDATE Label SET value = ?2 WHERE value = ?1", [old, new])
            .map_err(storage)?;
        for (id, mut labels) in notes_with_label(&tx, old)? {
            labels.remove(old);
            labels.insert(new.to_string());
            write_labels(&tx, id, &labels)?;
        }
        tx.commit().map_err(storage)?;
        self.notify();
        Ok(true)
    }

    #[instrument(level = "debug", skip_all, fields(notes = notes.len(), labels = labels.len()))]
    fn import_backup(&mut self, notes: &[Note], labels: &[Label]) -> Result<(), DomainError> {
        let tx = self.conn.transaction().map_err(storage)?;
        for label in labels {
            tx.execute(
                "INSERT OR IGNORE INTO Label (value) VALUES (?1)",
                [&label.value],
            )
            .map_err(storage)?;
        }
        for note in notes {
            insert_note_row(&tx, note)?;
        }
        tx.commit().map_err(storage)?;

        info!("Imported backup records");
        self.notify();
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    fn snapshot(&mut self) -> Result<PathBuf, DomainError> {
        let (busy, log_frames, checkpointed): (i64, i64, i64) = self
            .conn
            .query_row("PRAGMA wal_checkpoint(FULL)", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .map_err(storage)?;
        if busy != 0 {
            warn!(log_frames, checkpointed, "Checkpoint could not complete");
        } else {
            debug!(log_frames, checkpointed, "Checkpointed write-ahead log");
        }
        Ok(self.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListItem, SpanRepresentation};
    use tempfile::TempDir;

    fn open_store() -> (TempDir, NoteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = NoteStore::open(temp_dir.path().join("notes.db")).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn given_inserted_note_when_getting_then_round_trips_all_fields() {
        let (_dir, mut store) = open_store();
        let note = Note::text("Title", "Body text", 1_700_000_000_000)
            .with_labels(["Work", "Home"])
            .with_color(Color::Sage)
            .with_spans(vec![SpanRepresentation {
                bold: true,
                start: 0,
                end: 4,
                ..Default::default()
            }])
            .pinned(true);

        let id = store.insert_note(&note).unwrap();
        let loaded = store.get_note(id).unwrap();

        assert_eq!(loaded, Note { id, ..note });
    }

    #[test]
    fn given_missing_id_when_updating_then_returns_not_found() {
        let (_dir, mut store) = open_store();

        let result = store.update_pinned(42, true);

        assert!(matches!(result, Err(DomainError::NoteNotFound(42))));
    }

    #[test]
    fn given_mixed_notes_when_listing_folder_then_orders_pinned_then_newest() {
        let (_dir, mut store) = open_store();
        let old = store.insert_note(&Note::text("old", "", 1)).unwrap();
        let new = store.insert_note(&Note::text("new", "", 3)).unwrap();
        let pinned = store.insert_note(&Note::text("pinned", "", 2).pinned(true)).unwrap();
        store
            .insert_note(&Note::text("archived", "", 4).in_folder(Folder::Archived))
            .unwrap();

        let ids: Vec<i64> = store
            .get_from(Folder::Notes)
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(ids, vec![pinned, new, old]);
    }

    #[test]
    fn given_labelled_notes_when_listing_by_label_then_returns_only_active_matches() {
        let (_dir, mut store) = open_store();
        let work = store.insert_note(&Note::text("a", "", 1).with_labels(["Work"])).unwrap();
        store.insert_note(&Note::text("b", "", 2).with_labels(["Workout"])).unwrap();
        store
            .insert_note(&Note::text("c", "", 3).with_labels(["Work"]).in_folder(Folder::Deleted))
            .unwrap();

        let notes = store.get_by_label("Work").unwrap();

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, work);
    }

    #[test]
    fn given_keyword_when_searching_then_matches_title_body_and_items() {
        let (_dir, mut store) = open_store();
        store.insert_note(&Note::text("Milk run", "", 1)).unwrap();
        store.insert_note(&Note::text("", "buy MILK", 2)).unwrap();
        store
            .insert_note(&Note::checklist("Shop", vec![ListItem::new("milk", false)], 3))
            .unwrap();
        store.insert_note(&Note::text("Bread", "", 4)).unwrap();

        let found = store.search("milk", Folder::Notes).unwrap();

        assert_eq!(found.len(), 3);
    }

    #[test]
    fn given_wildcard_keyword_when_searching_then_matches_literally() {
        let (_dir, mut store) = open_store();
        store.insert_note(&Note::text("100% done", "", 1)).unwrap();
        store.insert_note(&Note::text("100 done", "", 2)).unwrap();

        let found = store.search("100%", Folder::Notes).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "100% done");
    }

    #[test]
    fn given_checklist_keys_when_searching_field_name_then_finds_nothing() {
        let (_dir, mut store) = open_store();
        store
            .insert_note(&Note::checklist("", vec![ListItem::new("eggs", true)], 1))
            .unwrap();

        assert!(store.search("checked", Folder::Notes).unwrap().is_empty());
        assert!(store.search("", Folder::Notes).unwrap().is_empty());
    }

    #[test]
    fn given_whitespace_keyword_when_searching_then_matches_literal_spaces() {
        let (_dir, mut store) = open_store();
        store.insert_note(&Note::text("two words", "", 1)).unwrap();
        store.insert_note(&Note::text("single", "", 2)).unwrap();

        let found = store.search(" ", Folder::Notes).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "two words");
    }

    #[test]
    fn given_label_on_notes_when_deleting_label_then_strips_it_from_notes() {
        let (_dir, mut store) = open_store();
        store.insert_label(&Label::new("Work")).unwrap();
        let id = store
            .insert_note(&Note::text("a", "", 1).with_labels(["Work", "Home"]))
            .unwrap();

        store.delete_label("Work").unwrap();

        assert!(store.labels().unwrap().is_empty());
        let labels: Vec<_> = store.get_note(id).unwrap().labels.into_iter().collect();
        assert_eq!(labels, vec!["Home"]);
    }

    #[test]
    fn given_label_when_renaming_then_updates_notes_and_rejects_collisions() {
        let (_dir, mut store) = open_store();
        store.insert_label(&Label::new("Work")).unwrap();
        store.insert_label(&Label::new("Home")).unwrap();
        let id = store.insert_note(&Note::text("a", "", 1).with_labels(["Work"])).unwrap();

        assert!(!store.update_label("Work", "Home").unwrap());
        assert!(!store.update_label("Missing", "Other").unwrap());
        assert!(store.update_label("Work", "Office").unwrap());

        assert_eq!(store.labels().unwrap(), vec!["Home", "Office"]);
        assert!(store.get_note(id).unwrap().labels.contains("Office"));
    }

    #[test]
    fn given_duplicate_label_when_inserting_then_returns_false() {
        let (_dir, mut store) = open_store();

        assert!(store.insert_label(&Label::new("Work")).unwrap());
        assert!(!store.insert_label(&Label::new("Work")).unwrap());
    }

    #[test]
    fn given_backup_records_when_importing_then_assigns_fresh_ids_and_ignores_known_labels() {
        let (_dir, mut store) = open_store();
        store.insert_label(&Label::new("Work")).unwrap();
        let mut imported = Note::text("imported", "", 1);
        imported.id = 999;

        store
            .import_backup(&[imported], &[Label::new("Work"), Label::new("Home")])
            .unwrap();

        let notes = store.get_from(Folder::Notes).unwrap();
        assert_eq!(notes.len(), 1);
        assert_ne!(notes[0].id, 999);
        assert_eq!(store.labels().unwrap(), vec!["Home", "Work"]);
    }

    #[test]
    fn given_mutation_when_subscribed_then_revision_changes() {
        let (_dir, mut store) = open_store();
        let changes = store.subscribe();
        let before = *changes.borrow();

        store.insert_note(&Note::text("a", "", 1)).unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow(), before + 1);
    }

    #[test]
    fn given_trash_when_deleting_folder_then_only_trash_is_removed() {
        let (_dir, mut store) = open_store();
        store.insert_note(&Note::text("keep", "", 1)).unwrap();
        store
            .insert_note(&Note::text("gone", "", 2).in_folder(Folder::Deleted))
            .unwrap();

        let deleted = store.delete_from(Folder::Deleted).unwrap();

        assert_eq!(deleted, 1);
        assert_eq!(store.get_from(Folder::Notes).unwrap().len(), 1);
    }

    #[test]
    fn given_writes_when_taking_snapshot_then_returns_database_path() {
        let (dir, mut store) = open_store();
        store.insert_note(&Note::text("a", "", 1)).unwrap();

        let path = store.snapshot().unwrap();

        assert_eq!(path, dir.path().join("notes.db"));
        assert!(fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn given_raw_row_with_pinned_two_when_decoding_then_fails() {
        let raw = RawNote {
            note_type: "NOTE".into(),
            folder: "NOTES".into(),
            color: "DEFAULT".into(),
            title: String::new(),
            pinned: 2,
            timestamp: 0,
            labels: "[]".into(),
            body: String::new(),
            spans: "[]".into(),
            items: "[]".into(),
        };

        assert!(matches!(raw.into_note(0), Err(DomainError::InvalidPinned(2))));
    }
}
