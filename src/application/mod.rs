// src/application/mod.rs
pub mod live;
pub mod note_exporter;
pub mod note_model;
pub mod note_repository;

pub use live::{Headers, Live, LiveLabels, LiveList, SearchParams, SearchResults};
pub use note_exporter::{ExportFormat, NoteExporter};
pub use note_model::{ImportOutcome, ModelEvent, NoteModel};
pub use note_repository::NoteRepository;
