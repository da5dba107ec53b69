// src/domain/note.rs
use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Declares an enum whose stored form is its upper-case name, with an
/// explicit fallible parse for text read back from storage or backups.
macro_rules! stored_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(DomainError::UnknownValue {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

stored_enum!(
    /// Whether a note is free text or a checklist
    NoteType, "type", {
        Note => "NOTE",
        List => "LIST",
    }
);

stored_enum!(
    /// Lifecycle bucket a note lives in
    Folder, "folder", {
        Notes => "NOTES",
        Deleted => "DELETED",
        Archived => "ARCHIVED",
    }
);

stored_enum!(
    Color, "color", {
        Default => "DEFAULT",
        Coral => "CORAL",
        Orange => "ORANGE",
        Sand => "SAND",
        Storm => "STORM",
        Fog => "FOG",
        Sage => "SAGE",
        Mint => "MINT",
        Dusk => "DUSK",
        Flower => "FLOWER",
        Blossom => "BLOSSOM",
        Clay => "CLAY",
    }
);

/// Formatting applied to the characters `start..end` of a note body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanRepresentation {
    pub bold: bool,
    pub link: bool,
    pub italic: bool,
    pub monospace: bool,
    pub strikethrough: bool,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    pub body: String,
    pub checked: bool,
}

impl ListItem {
    pub fn new(body: impl Into<String>, checked: bool) -> Self {
        Self {
            body: body.into(),
            checked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    pub value: String,
}

impl Label {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: i64,
    pub note_type: NoteType,
    pub folder: Folder,
    pub color: Color,
    pub title: String,
    pub pinned: bool,
    /// Creation time in milliseconds since the Unix epoch
    pub timestamp: i64,
    pub labels: BTreeSet<String>,
    pub body: String,
    pub spans: Vec<SpanRepresentation>,
    pub items: Vec<ListItem>,
}

impl Note {
    /// A plain-text note in the `NOTES` folder, not yet stored (id 0)
    pub fn text(title: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: 0,
            note_type: NoteType::Note,
            folder: Folder::Notes,
            color: Color::Default,
            title: title.into(),
            pinned: false,
            timestamp,
            labels: BTreeSet::new(),
            body: body.into(),
            spans: Vec::new(),
            items: Vec::new(),
        }
    }

    /// A checklist note in the `NOTES` folder, not yet stored (id 0)
    pub fn checklist(title: impl Into<String>, items: Vec<ListItem>, timestamp: i64) -> Self {
        Self {
            id: 0,
            note_type: NoteType::List,
            folder: Folder::Notes,
            color: Color::Default,
            title: title.into(),
            pinned: false,
            timestamp,
            labels: BTreeSet::new(),
            body: String::new(),
            spans: Vec::new(),
            items,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_spans(mut self, spans: Vec<SpanRepresentation>) -> Self {
        self.spans = spans;
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn in_folder(mut self, folder: Folder) -> Self {
        self.folder = folder;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}
