// src/application/note_model.rs
use crate::application::live::{lock, spawn_live, SharedRepository};
use crate::application::note_exporter::{ExportFormat, NoteExporter};
use crate::application::{Headers, LiveLabels, LiveList, NoteRepository, SearchParams, SearchResults};
use crate::constants::BACKUP_DIR;
use crate::domain::preference::{ListInfo, Preference, SeekbarInfo, DATE_FORMAT};
use crate::domain::{Backup, Color, DomainError, Folder, Header, Item, Label, Note};
use crate::infrastructure::backup::{read_archive, write_archive};
use crate::infrastructure::legacy::{parse_backup, LegacyStore};
use crate::infrastructure::pdf::{CommandPdfGenerator, PdfGenerator};
use crate::infrastructure::preferences::PreferenceStore;
use crate::infrastructure::scratch::empty_folder;
use crate::infrastructure::{Config, NoteStore};
use crate::util::date::DateFormatter;
use anyhow::{anyhow, Context, Result};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

/// User-facing outcome of a model operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelEvent {
    SavedToDevice,
    ImportedBackup,
    InvalidBackup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported { notes: usize, labels: usize },
    InvalidBackup,
    /// The source could not be opened; nothing happened and no event was sent
    Skipped,
}

fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// View-model over a note repository.
///
/// Every store call runs on the blocking pool. Folder, label and search
/// streams are recomputed after each committed change. Must be created and
/// used inside a Tokio runtime.
pub struct NoteModel<R: NoteRepository> {
    repository: SharedRepository<R>,
    changes: watch::Receiver<u64>,
    headers: Arc<Headers>,
    notes: LiveList,
    deleted_notes: LiveList,
    archived_notes: LiveList,
    labels: LiveLabels,
    search: SearchResults,
    label_cache: Mutex<HashMap<String, LiveList>>,
    preferences: Arc<Mutex<PreferenceStore>>,
    exporter: NoteExporter,
    cache_dir: PathBuf,
    current_file: Mutex<Option<PathBuf>>,
    events: mpsc::UnboundedSender<ModelEvent>,
}

impl NoteModel<NoteStore> {
    /// Open the SQLite store described by `config`, migrating a legacy store
    /// first when one is configured.
    pub async fn open(config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<ModelEvent>)> {
        let path = config.database_path();
        let store = tokio::task::spawn_blocking(move || NoteStore::open(path))
            .await
            .context("Store open task failed")??;
        let (model, events) = Self::new(store, config)?;

        if let Some(legacy_dir) = &config.storage.legacy_dir {
            model.migrate_legacy(LegacyStore::new(legacy_dir)).await?;
        }
        Ok((model, events))
    }
}

impl<R: NoteRepository> NoteModel<R> {
    pub fn new(repository: R, config: &Config) -> Result<(Self, mpsc::UnboundedReceiver<ModelEvent>)> {
        let pdf = CommandPdfGenerator::new(
            config.export.pdf_command.clone(),
            config.export.pdf_args.clone(),
        );
        Self::with_pdf_generator(repository, config, Arc::new(pdf))
    }

    pub fn with_pdf_generator(
        repository: R,
        config: &Config,
        pdf: Arc<dyn PdfGenerator>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ModelEvent>)> {
        let preferences = PreferenceStore::open(config.preferences_path())?;
        let changes = repository.subscribe();
        let repository = Arc::new(Mutex::new(repository));
        let headers = Arc::new(Headers {
            pinned: Header::new(config.display.pinned_header.clone()),
            others: Header::new(config.display.others_header.clone()),
        });

        let folder_list = |folder: Folder| {
            let headers = Arc::clone(&headers);
            spawn_live(Arc::clone(&repository), changes.clone(), move |repository: &mut R| {
                Ok(headers.group(repository.get_from(folder)?))
            })
        };
        let notes = folder_list(Folder::Notes);
        let deleted_notes = folder_list(Folder::Deleted);
        let archived_notes = folder_list(Folder::Archived);
        let labels = spawn_live(Arc::clone(&repository), changes.clone(), |repository: &mut R| {
            repository.labels()
        });
        let search = SearchResults::spawn(
            Arc::clone(&repository),
            changes.clone(),
            Arc::clone(&headers),
        );

        let exporter = NoteExporter::new(
            config.storage.cache_dir.clone(),
            DateFormatter::local(&config.display.locale),
            pdf,
        );
        let (events, receiver) = mpsc::unbounded_channel();

        let model = Self {
            repository,
            changes,
            headers,
            notes,
            deleted_notes,
            archived_notes,
            labels,
            search,
            label_cache: Mutex::new(HashMap::new()),
            preferences: Arc::new(Mutex::new(preferences)),
            exporter,
            cache_dir: config.storage.cache_dir.clone(),
            current_file: Mutex::new(None),
            events,
        };
        Ok((model, receiver))
    }

    fn emit(&self, event: ModelEvent) {
        if self.events.send(event).is_err() {
            debug!(?event, "No listener for model event");
        }
    }

    async fn run<T, F>(&self, task: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut R) -> Result<T, DomainError> + Send + 'static,
    {
        let repository = Arc::clone(&self.repository);
        let value = tokio::task::spawn_blocking(move || {
            let mut guard = lock(&repository)?;
            task(&mut *guard)
        })
        .await
        .context("Store task failed")??;
        Ok(value)
    }

    // Streams

    pub fn notes(&self) -> LiveList {
        self.notes.clone()
    }

    pub fn deleted_notes(&self) -> LiveList {
        self.deleted_notes.clone()
    }

    pub fn archived_notes(&self) -> LiveList {
        self.archived_notes.clone()
    }

    pub fn labels(&self) -> LiveLabels {
        self.labels.clone()
    }

    /// Active notes carrying `label`; the stream is created once per label
    /// and kept for the lifetime of the model.
    pub fn notes_by_label(&self, label: &str) -> LiveList {
        let mut cache = relock(&self.label_cache);
        if let Some(live) = cache.get(label) {
            return live.clone();
        }

        debug!(label, cached = cache.len(), "Creating label stream");
        let headers = Arc::clone(&self.headers);
        let value = label.to_string();
        let live = spawn_live(Arc::clone(&self.repository), self.changes.clone(), move |repository: &mut R| {
            Ok(headers.group(repository.get_by_label(&value)?))
        });
        cache.insert(label.to_string(), live.clone());
        live
    }

    pub fn search_results(&self) -> LiveList {
        self.search.results()
    }

    pub fn search_params(&self) -> SearchParams {
        self.search.params()
    }

    pub fn set_keyword(&self, keyword: &str) -> bool {
        self.search.set_keyword(keyword)
    }

    pub fn set_folder(&self, folder: Folder) -> bool {
        self.search.set_folder(folder)
    }

    /// Grouped notes of one folder, queried once
    pub async fn folder_items(&self, folder: Folder) -> Result<Vec<Item>> {
        let headers = Arc::clone(&self.headers);
        self.run(move |repository| Ok(headers.group(repository.get_from(folder)?)))
            .await
    }

    pub async fn label_items(&self, label: &str) -> Result<Vec<Item>> {
        let headers = Arc::clone(&self.headers);
        let label = label.to_string();
        self.run(move |repository| Ok(headers.group(repository.get_by_label(&label)?)))
            .await
    }

    pub async fn search(&self, keyword: &str, folder: Folder) -> Result<Vec<Item>> {
        let headers = Arc::clone(&self.headers);
        let keyword = keyword.to_string();
        self.run(move |repository| Ok(headers.group(repository.search(&keyword, folder)?)))
            .await
    }

    // Mutations

    pub async fn get_note(&self, id: i64) -> Result<Note> {
        self.run(move |repository| repository.get_note(id)).await
    }

    #[instrument(level = "debug", skip(self, note))]
    pub async fn insert_note(&self, note: Note) -> Result<i64> {
        self.run(move |repository| repository.insert_note(&note)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn color_note(&self, id: i64, color: Color) -> Result<()> {
        self.run(move |repository| repository.update_color(id, color)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn pin_note(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.update_pinned(id, true)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn unpin_note(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.update_pinned(id, false)).await
    }

    /// Empty the trash, returning how many notes were removed
    #[instrument(level = "debug", skip(self))]
    pub async fn delete_all_notes(&self) -> Result<usize> {
        let deleted = self
            .run(|repository| repository.delete_from(Folder::Deleted))
            .await?;
        info!(deleted, "Emptied trash");
        Ok(deleted)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn restore_note(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.move_note(id, Folder::Notes)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn move_note_to_deleted(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.move_note(id, Folder::Deleted)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn move_note_to_archive(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.move_note(id, Folder::Archived)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_note_forever(&self, id: i64) -> Result<()> {
        self.run(move |repository| repository.delete_note(id)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn update_note_labels(&self, id: i64, labels: BTreeSet<String>) -> Result<()> {
        self.run(move |repository| repository.update_labels(id, &labels)).await
    }

    pub async fn all_labels(&self) -> Result<Vec<String>> {
        self.run(|repository| repository.labels()).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn insert_label(&self, value: &str) -> Result<bool> {
        let label = Label::new(value);
        self.run(move |repository| repository.insert_label(&label)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn update_label(&self, old: &str, new: &str) -> Result<bool> {
        let (old, new) = (old.to_string(), new.to_string());
        self.run(move |repository| repository.update_label(&old, &new)).await
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn delete_label(&self, value: &str) -> Result<()> {
        let value = value.to_string();
        self.run(move |repository| repository.delete_label(&value)).await
    }

    // Backups

    /// Write the whole store as a single-entry zip archive to `destination`
    #[instrument(level = "debug", skip(self))]
    pub async fn export_backup(&self, destination: &Path) -> Result<()> {
        let repository = Arc::clone(&self.repository);
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = lock(&repository)?;
            let database = guard.snapshot()?;
            write_archive(&database, &destination)
        })
        .await
        .context("Backup export task failed")??;

        self.emit(ModelEvent::SavedToDevice);
        Ok(())
    }

    /// Import a zip archive produced by `export_backup`
    #[instrument(level = "debug", skip(self))]
    pub async fn import_zip_backup(&self, source: &Path) -> Result<ImportOutcome> {
        let mut file = match File::open(source) {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "Backup source unavailable, skipping import");
                return Ok(ImportOutcome::Skipped);
            }
        };

        let cache_dir = self.cache_dir.clone();
        let parsed = tokio::task::spawn_blocking(move || -> Result<Result<Option<Backup>>> {
            let scratch = empty_folder(&cache_dir, BACKUP_DIR)?;
            Ok(read_archive(&mut file, &scratch))
        })
        .await
        .context("Backup import task failed")??;

        match parsed {
            Ok(Some(backup)) => Ok(self.apply_backup(backup).await),
            Ok(None) => Ok(self.reject_backup(&anyhow!("missing database entry"))),
            Err(e) => Ok(self.reject_backup(&e)),
        }
    }

    /// Import a document in the XML format of the legacy store
    #[instrument(level = "debug", skip(self))]
    pub async fn import_xml_backup(&self, source: &Path) -> Result<ImportOutcome> {
        let file = match File::open(source) {
            Ok(file) => file,
            Err(e) => {
                debug!(error = %e, "Backup source unavailable, skipping import");
                return Ok(ImportOutcome::Skipped);
            }
        };

        let parsed = tokio::task::spawn_blocking(move || parse_backup(BufReader::new(file)))
            .await
            .context("Backup import task failed")?;

        match parsed {
            Ok(backup) => Ok(self.apply_backup(backup).await),
            Err(e) => Ok(self.reject_backup(&e)),
        }
    }

    fn reject_backup(&self, reason: &anyhow::Error) -> ImportOutcome {
        warn!(error = ?reason, "Rejected invalid backup");
        self.emit(ModelEvent::InvalidBackup);
        ImportOutcome::InvalidBackup
    }

    async fn apply_backup(&self, backup: Backup) -> ImportOutcome {
        let (notes, labels) = (backup.notes.len(), backup.labels.len());
        let applied = self
            .run(move |repository| repository.import_backup(&backup.notes, &backup.labels))
            .await;

        match applied {
            Ok(()) => {
                info!(notes, labels, "Imported backup");
                self.emit(ModelEvent::ImportedBackup);
                ImportOutcome::Imported { notes, labels }
            }
            Err(e) => self.reject_backup(&e),
        }
    }

    /// Move everything left in the legacy store into the repository.
    ///
    /// Returns whether anything was migrated. The legacy files are removed
    /// only after the import committed.
    #[instrument(level = "debug", skip(self, legacy))]
    pub async fn migrate_legacy(&self, legacy: LegacyStore) -> Result<bool> {
        let reader = legacy.clone();
        let backup = tokio::task::spawn_blocking(move || -> Result<Backup> {
            Ok(Backup {
                notes: reader.previous_notes()?,
                labels: reader.previous_labels()?,
            })
        })
        .await
        .context("Legacy read task failed")??;

        if backup.is_empty() {
            debug!("Legacy store is empty");
            return Ok(false);
        }

        let (notes, labels) = (backup.notes.len(), backup.labels.len());
        self.run(move |repository| repository.import_backup(&backup.notes, &backup.labels))
            .await
            .context("Failed to migrate legacy notes")?;

        tokio::task::spawn_blocking(move || -> Result<()> {
            legacy.clear_all_labels()?;
            legacy.clear_all_folders()
        })
        .await
        .context("Legacy cleanup task failed")??;

        info!(notes, labels, "Migrated legacy store");
        Ok(true)
    }

    // Single-note export

    /// Render `note` into the export scratch directory.
    ///
    /// The rendered file becomes the current file for `write_current_file_to`.
    /// The creation date is included unless the date format preference is
    /// `none`.
    pub async fn export_note(&self, note: &Note, format: ExportFormat) -> Result<PathBuf> {
        let show_date_created = self.list_preference(&DATE_FORMAT) != "none";
        let path = self.exporter.export(note, format, show_date_created).await?;
        *relock(&self.current_file) = Some(path.clone());
        Ok(path)
    }

    pub fn current_file(&self) -> Option<PathBuf> {
        relock(&self.current_file).clone()
    }

    /// Copy the last exported file to `destination`, replacing its contents
    #[instrument(level = "debug", skip(self))]
    pub async fn write_current_file_to(&self, destination: &Path) -> Result<()> {
        let source = self
            .current_file()
            .context("No note has been exported yet")?;
        let destination = destination.to_path_buf();
        tokio::task::spawn_blocking(move || {
            std::fs::copy(&source, &destination).with_context(|| {
                format!("Failed to copy {} to {}", source.display(), destination.display())
            })
        })
        .await
        .context("Save task failed")??;

        self.emit(ModelEvent::SavedToDevice);
        Ok(())
    }

    // Preferences

    pub fn seekbar_preference(&self, info: &SeekbarInfo) -> i32 {
        relock(&self.preferences).seekbar(info)
    }

    pub fn list_preference(&self, info: &ListInfo) -> String {
        relock(&self.preferences).list(info)
    }

    pub async fn save_seekbar_preference(&self, info: SeekbarInfo, value: i32) -> Result<()> {
        let preferences = Arc::clone(&self.preferences);
        tokio::task::spawn_blocking(move || relock(&preferences).save_seekbar(&info, value))
            .await
            .context("Preference task failed")?
    }

    pub async fn save_list_preference(&self, info: ListInfo, value: &str) -> Result<()> {
        let preferences = Arc::clone(&self.preferences);
        let value = value.to_string();
        tokio::task::spawn_blocking(move || relock(&preferences).save_list(&info, &value))
            .await
            .context("Preference task failed")?
    }

    /// Save a preference given by key, parsing `value` for numeric settings
    pub async fn save_preference(&self, key: &str, value: &str) -> Result<()> {
        match Preference::find(key) {
            Some(Preference::Seekbar(info)) => {
                let number = value
                    .parse::<i32>()
                    .with_context(|| format!("Preference {key} expects a number"))?;
                self.save_seekbar_preference(info, number).await
            }
            Some(Preference::List(info)) => self.save_list_preference(info, value).await,
            None => Err(DomainError::UnknownPreference(key.to_string()).into()),
        }
    }

    /// Current value of a preference given by key, as text
    pub fn preference(&self, key: &str) -> Result<String> {
        match Preference::find(key) {
            Some(Preference::Seekbar(info)) => Ok(self.seekbar_preference(&info).to_string()),
            Some(Preference::List(info)) => Ok(self.list_preference(&info)),
            None => Err(DomainError::UnknownPreference(key.to_string()).into()),
        }
    }
}
