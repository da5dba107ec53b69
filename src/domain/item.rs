// src/domain/item.rs
use crate::domain::Note;

/// Separator injected into a rendered list; never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub label: String,
}

impl Header {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Header(Header),
    Note(Note),
}

impl Item {
    pub fn as_note(&self) -> Option<&Note> {
        match self {
            Item::Note(note) => Some(note),
            Item::Header(_) => None,
        }
    }

    pub fn is_header(&self) -> bool {
        matches!(self, Item::Header(_))
    }
}

/// Group notes ordered pinned-first into "pinned" and "others" sections.
///
/// Headers are only injected when the first note is pinned. A list without
/// pinned notes comes back unchanged, and the "others" header is left out
/// when every note is pinned.
pub fn group_by_pinned(notes: Vec<Note>, pinned: &Header, others: &Header) -> Vec<Item> {
    let first_pinned = notes.first().map(|note| note.pinned).unwrap_or(false);
    if !first_pinned {
        return notes.into_iter().map(Item::Note).collect();
    }

    let first_unpinned = notes.iter().position(|note| !note.pinned);
    let mut items = Vec::with_capacity(notes.len() + 2);
    items.push(Item::Header(pinned.clone()));
    for (index, note) in notes.into_iter().enumerate() {
        if Some(index) == first_unpinned {
            items.push(Item::Header(others.clone()));
        }
        items.push(Item::Note(note));
    }
    items
}
