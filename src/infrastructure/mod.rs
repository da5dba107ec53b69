// src/infrastructure/mod.rs
pub mod backup;
pub mod config;
pub mod legacy;
pub mod pdf;
pub mod preferences;
pub mod scratch;
pub mod sqlite;

pub use config::Config;
pub use legacy::LegacyStore;
pub use pdf::{CommandPdfGenerator, PdfGenerator};
pub use preferences::PreferenceStore;
pub use sqlite::NoteStore;
