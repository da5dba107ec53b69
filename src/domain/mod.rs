// src/domain/mod.rs
pub mod error;
pub mod item;
pub mod note;
pub mod preference;

pub use error::DomainError;
pub use item::{group_by_pinned, Header, Item};
pub use note::{Color, Folder, Label, ListItem, Note, NoteType, SpanRepresentation};

/// Notes and labels read from a backup, ready to be applied in one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Backup {
    pub notes: Vec<Note>,
    pub labels: Vec<Label>,
}

impl Backup {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.labels.is_empty()
    }
}
