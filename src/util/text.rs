// src/util/text.rs
use crate::domain::{Note, NoteType};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RUN: Regex =
        Regex::new(r"\s+").expect("Failed to compile whitespace regex");
}

/// Extract the first non-empty line of plain text, with inner whitespace
/// runs collapsed to single spaces.
///
/// # Examples
///
/// ```
/// use notekeep::util::text::extract_first_line;
///
/// let text = "\n  Buy   milk\nand bread";
/// assert_eq!(extract_first_line(text), "Buy milk");
/// ```
pub fn extract_first_line(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .find(|line| !line.is_empty())
        .map(|line| WHITESPACE_RUN.replace_all(line, " ").into_owned())
        .unwrap_or_default()
}

/// One-line summary of a note for list output
pub fn preview(note: &Note) -> String {
    if !note.title.trim().is_empty() {
        return extract_first_line(&note.title);
    }
    match note.note_type {
        NoteType::Note => extract_first_line(&note.body),
        NoteType::List => note
            .items
            .iter()
            .map(|item| extract_first_line(&item.body))
            .find(|line| !line.is_empty())
            .unwrap_or_default(),
    }
}
