// src/application/note_repository.rs
use crate::domain::{Color, DomainError, Folder, Label, Note};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::watch;

pub trait NoteRepository: Send + 'static {
    /// Receiver whose value changes after every committed mutation
    fn subscribe(&self) -> watch::Receiver<u64>;

    fn get_note(&mut self, id: i64) -> Result<Note, DomainError>;

    /// Notes of a folder, pinned first, newest first
    fn get_from(&mut self, folder: Folder) -> Result<Vec<Note>, DomainError>;

    /// Active notes carrying `label`, pinned first, newest first
    fn get_by_label(&mut self, label: &str) -> Result<Vec<Note>, DomainError>;

    fn search(&mut self, keyword: &str, folder: Folder) -> Result<Vec<Note>, DomainError>;

    fn labels(&mut self) -> Result<Vec<String>, DomainError>;

    /// Store a new note and return its id
    fn insert_note(&mut self, note: &Note) -> Result<i64, DomainError>;

    fn update_color(&mut self, id: i64, color: Color) -> Result<(), DomainError>;

    fn update_pinned(&mut self, id: i64, pinned: bool) -> Result<(), DomainError>;

    fn move_note(&mut self, id: i64, folder: Folder) -> Result<(), DomainError>;

    fn update_labels(&mut self, id: i64, labels: &BTreeSet<String>) -> Result<(), DomainError>;

    fn delete_note(&mut self, id: i64) -> Result<(), DomainError>;

    /// Permanently delete every note in `folder`, returning how many went
    fn delete_from(&mut self, folder: Folder) -> Result<usize, DomainError>;

    /// Returns false if the label already exists
    fn insert_label(&mut self, label: &Label) -> Result<bool, DomainError>;

    /// Remove the label and strip it from every note
    fn delete_label(&mut self, value: &str) -> Result<(), DomainError>;

    /// Rename the label everywhere; false if `old` is missing or `new` is taken
    fn update_label(&mut self, old: &str, new: &str) -> Result<bool, DomainError>;

    /// Insert labels and notes as one transaction
    fn import_backup(&mut self, notes: &[Note], labels: &[Label]) -> Result<(), DomainError>;

    /// Flush the write-ahead log and return the primary database file
    fn snapshot(&mut self) -> Result<PathBuf, DomainError>;
}
