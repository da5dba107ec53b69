// src/domain/error.rs
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Note not found: {0}")]
    NoteNotFound(i64),
    #[error("Unknown {kind} value: {value}")]
    UnknownValue { kind: &'static str, value: String },
    #[error("pinned must be 0 or 1, got {0}")]
    InvalidPinned(i64),
    #[error("Invalid backup: {0}")]
    InvalidBackup(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Preference {key} must be within {min}..={max}, got {value}")]
    PreferenceOutOfRange {
        key: String,
        value: i32,
        min: i32,
        max: i32,
    },
    #[error("Preference {key} does not accept {value}")]
    UnknownChoice { key: String, value: String },
    #[error("Unknown preference: {0}")]
    UnknownPreference(String),
}
