// src/util/testing.rs

use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::application::NoteRepository;
use crate::domain::{Color, DomainError, Folder, Label, Note};

/// Sizes of every batch passed to `import_backup`, as (notes, labels)
pub type ImportLog = Arc<Mutex<Vec<(usize, usize)>>>;

/// In-memory repository for testing code that depends on NoteRepository
///
/// Ordering and filtering follow the SQLite store closely enough for the
/// model: pinned first, newest first, label lists only from `NOTES`.
///
/// # Examples
///
/// ```
/// use notekeep::application::NoteRepository;
/// use notekeep::domain::Note;
/// use notekeep::util::testing::MockNoteRepository;
///
/// let mut mock = MockNoteRepository::builder()
///     .with_note(Note::text("Groceries", "milk", 0))
///     .with_label("errands")
///     .build();
///
/// assert_eq!(mock.get_note(1).unwrap().title, "Groceries");
/// assert_eq!(mock.labels().unwrap(), vec!["errands".to_string()]);
/// ```
pub struct MockNoteRepository {
    notes: BTreeMap<i64, Note>,
    labels: BTreeSet<String>,
    next_id: i64,
    snapshot: Option<PathBuf>,
    imports: ImportLog,
    changes: watch::Sender<u64>,
}

impl MockNoteRepository {
    pub fn builder() -> MockNoteRepositoryBuilder {
        MockNoteRepositoryBuilder::new()
    }

    /// Shared log of import batches, readable after the mock moved into a model
    pub fn imports(&self) -> ImportLog {
        Arc::clone(&self.imports)
    }

    fn notify(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }

    fn sorted(mut notes: Vec<Note>) -> Vec<Note> {
        notes.sort_by(|a, b| {
            b.pinned
                .cmp(&a.pinned)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        notes
    }

    fn note_mut(&mut self, id: i64) -> Result<&mut Note, DomainError> {
        self.notes.get_mut(&id).ok_or(DomainError::NoteNotFound(id))
    }

    fn store(&mut self, note: &Note) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.notes.insert(id, Note { id, ..note.clone() });
        id
    }
}

impl NoteRepository for MockNoteRepository {
    fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    fn get_note(&mut self, id: i64) -> Result<Note, DomainError> {
        self.notes
            .get(&id)
            .cloned()
            .ok_or(DomainError::NoteNotFound(id))
    }

    fn get_from(&mut self, folder: Folder) -> Result<Vec<Note>, DomainError> {
        Ok(Self::sorted(
            self.notes
                .values()
                .filter(|note| note.folder == folder)
                .cloned()
                .collect(),
        ))
    }

    fn get_by_label(&mut self, label: &str) -> Result<Vec<Note>, DomainError> {
        Ok(Self::sorted(
            self.notes
                .values()
                .filter(|note| note.folder == Folder::Notes && note.labels.contains(label))
                .cloned()
                .collect(),
        ))
    }

    fn search(&mut self, keyword: &str, folder: Folder) -> Result<Vec<Note>, DomainError> {
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let keyword = keyword.to_lowercase();
        let matches = |text: &str| text.to_lowercase().contains(&keyword);
        Ok(Self::sorted(
            self.notes
                .values()
                .filter(|note| note.folder == folder)
                .filter(|note| {
                    matches(&note.title)
                        || matches(&note.body)
                        || note.items.iter().any(|item| matches(&item.body))
                        || note.labels.iter().any(|label| matches(label))
                })
                .cloned()
                .collect(),
        ))
    }

    fn labels(&mut self) -> Result<Vec<String>, DomainError> {
        Ok(self.labels.iter().cloned().collect())
    }

    fn insert_note(&mut self, note: &Note) -> Result<i64, DomainError> {
        let id = self.store(note);
        self.notify();
        Ok(id)
    }

    fn update_color(&mut self, id: i64, color: Color) -> Result<(), DomainError> {
        self.note_mut(id)?.color = color;
        self.notify();
        Ok(())
    }

    fn update_pinned(&mut self, id: i64, pinned: bool) -> Result<(), DomainError> {
        self.note_mut(id)?.pinned = pinned;
        self.notify();
        Ok(())
    }

    fn move_note(&mut self, id: i64, folder: Folder) -> Result<(), DomainError> {
        self.note_mut(id)?.folder = folder;
        self.notify();
        Ok(())
    }

    fn update_labels(&mut self, id: i64, labels: &BTreeSet<String>) -> Result<(), DomainError> {
        self.note_mut(id)?.labels = labels.clone();
        self.notify();
        Ok(())
    }

    fn delete_note(&mut self, id: i64) -> Result<(), DomainError> {
        self.notes.remove(&id).ok_or(DomainError::NoteNotFound(id))?;
        self.notify();
        Ok(())
    }

    fn delete_from(&mut self, folder: Folder) -> Result<usize, DomainError> {
        let before = self.notes.len();
        self.notes.retain(|_, note| note.folder != folder);
        self.notify();
        Ok(before - self.notes.len())
    }

    fn insert_label(&mut self, label: &Label) -> Result<bool, DomainError> {
        let inserted = self.labels.insert(label.value.clone());
        if inserted {
            self.notify();
        }
        Ok(inserted)
    }

    fn delete_label(&mut self, value: &str) -> Result<(), DomainError> {
        self.labels.remove(value);
        for note in self.notes.values_mut() {
            note.labels.remove(value);
        }
        self.notify();
        Ok(())
    }

    fn update_label(&mut self, old: &str, new: &str) -> Result<bool, DomainError> {
        if !self.labels.contains(old) || self.labels.contains(new) {
            return Ok(false);
        }
        self.labels.remove(old);
        self.labels.insert(new.to_string());
        for note in self.notes.values_mut() {
            if note.labels.remove(old) {
                note.labels.insert(new.to_string());
            }
        }
        self.notify();
        Ok(true)
    }

    fn import_backup(&mut self, notes: &[Note], labels: &[Label]) -> Result<(), DomainError> {
        if let Ok(mut imports) = self.imports.lock() {
            imports.push((notes.len(), labels.len()));
        }
        for label in labels {
            self.labels.insert(label.value.clone());
        }
        for note in notes {
            self.store(note);
        }
        self.notify();
        Ok(())
    }

    fn snapshot(&mut self) -> Result<PathBuf, DomainError> {
        self.snapshot
            .clone()
            .ok_or_else(|| DomainError::Storage("mock has no database file".to_string()))
    }
}

/// Builder for MockNoteRepository
///
/// Provides a fluent interface for configuring mock contents.
pub struct MockNoteRepositoryBuilder {
    notes: Vec<Note>,
    labels: BTreeSet<String>,
    snapshot: Option<PathBuf>,
}

impl MockNoteRepositoryBuilder {
    pub fn new() -> Self {
        Self {
            notes: Vec::new(),
            labels: BTreeSet::new(),
            snapshot: None,
        }
    }

    /// Add a note; ids are assigned from 1 in insertion order
    pub fn with_note(mut self, note: Note) -> Self {
        self.notes.push(note);
        self
    }

    pub fn with_label(mut self, value: &str) -> Self {
        self.labels.insert(value.to_string());
        self
    }

    /// File returned by `snapshot`, as if it were the database
    pub fn with_snapshot(mut self, path: PathBuf) -> Self {
        self.snapshot = Some(path);
        self
    }

    pub fn build(self) -> MockNoteRepository {
        let (changes, _) = watch::channel(0);
        let mut mock = MockNoteRepository {
            notes: BTreeMap::new(),
            labels: self.labels,
            next_id: 1,
            snapshot: self.snapshot,
            imports: Arc::new(Mutex::new(Vec::new())),
            changes,
        };
        for note in &self.notes {
            mock.store(note);
        }
        mock
    }
}

impl Default for MockNoteRepositoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn init_test_setup() -> Result<()> {
    // Set up logging first
    setup_test_logging();

    info!("Test Setup complete");
    Ok(())
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "trace");
    }

    // Create a filter for noisy modules
    let noisy_modules = ["rusqlite", "tokio", "runtime", "mio"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    // Set up the subscriber with environment filter
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    // Build and set the subscriber
    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListItem;

    #[ctor::ctor]
    fn init() {
        init_test_setup().expect("Failed to initialize test setup");
    }

    #[test]
    fn given_note_added_when_getting_note_then_returns_note() {
        let mut mock = MockNoteRepository::builder()
            .with_note(Note::text("Test Question", "Test Answer", 0))
            .build();

        let result = mock.get_note(1).expect("Note should exist");
        assert_eq!(result.id, 1);
        assert_eq!(result.title, "Test Question");
    }

    #[test]
    fn given_no_note_when_getting_note_then_returns_error() {
        let mut mock = MockNoteRepository::builder().build();

        let result = mock.get_note(999);
        assert!(matches!(result, Err(DomainError::NoteNotFound(999))));
    }

    #[test]
    fn given_mixed_notes_when_listing_folder_then_orders_pinned_then_newest() {
        // Arrange
        let mut mock = MockNoteRepository::builder()
            .with_note(Note::text("old", "", 1))
            .with_note(Note::text("pinned", "", 0).pinned(true))
            .with_note(Note::text("new", "", 2))
            .with_note(Note::text("gone", "", 3).in_folder(Folder::Deleted))
            .build();

        // Act
        let titles: Vec<String> = mock
            .get_from(Folder::Notes)
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect();

        // Assert
        assert_eq!(titles, vec!["pinned", "new", "old"]);
    }

    #[test]
    fn given_checklist_when_searching_item_text_then_matches_case_insensitively() {
        let mut mock = MockNoteRepository::builder()
            .with_note(Note::checklist("Shop", vec![ListItem::new("Buy MILK", false)], 0))
            .build();

        assert_eq!(mock.search("milk", Folder::Notes).unwrap().len(), 1);
        assert!(mock.search("", Folder::Notes).unwrap().is_empty());
    }

    #[test]
    fn given_import_when_reading_log_then_records_batch_sizes() {
        let mut mock = MockNoteRepository::builder().build();
        let imports = mock.imports();

        mock.import_backup(&[Note::text("T", "B", 0)], &[Label::new("L")])
            .unwrap();

        assert_eq!(*imports.lock().unwrap(), vec![(1, 1)]);
        assert_eq!(mock.labels().unwrap(), vec!["L".to_string()]);
    }

    #[test]
    fn given_mutation_when_subscribed_then_revision_changes() {
        let mut mock = MockNoteRepository::builder().build();
        let mut changes = mock.subscribe();

        mock.insert_note(&Note::text("T", "", 0)).unwrap();

        assert!(changes.has_changed().unwrap());
        assert_eq!(*changes.borrow_and_update(), 1);
    }
}
