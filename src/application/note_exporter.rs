// src/application/note_exporter.rs
use crate::constants::{EXPORTED_DIR, EXPORT_FILE_STEM};
use crate::domain::Note;
use crate::infrastructure::pdf::PdfGenerator;
use crate::infrastructure::scratch::empty_folder;
use crate::ports::{json, HtmlPresenter, TextPresenter};
use crate::util::date::DateFormatter;
use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Txt,
    Html,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "html" => Ok(ExportFormat::Html),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(format!("unknown export format: {other}")),
        }
    }
}

/// Renders single notes into fixed-name files of the export scratch dir.
///
/// The directory is emptied before every export, so two exports running at
/// once can clobber each other.
#[derive(Clone)]
pub struct NoteExporter {
    cache_dir: PathBuf,
    text: TextPresenter,
    html: HtmlPresenter,
    pdf: Arc<dyn PdfGenerator>,
}

impl fmt::Debug for NoteExporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoteExporter")
            .field("cache_dir", &self.cache_dir)
            .finish_non_exhaustive()
    }
}

impl NoteExporter {
    pub fn new(cache_dir: PathBuf, formatter: DateFormatter, pdf: Arc<dyn PdfGenerator>) -> Self {
        Self {
            cache_dir,
            text: TextPresenter::new(formatter.clone()),
            html: HtmlPresenter::new(formatter),
            pdf,
        }
    }

    pub fn html(&self, note: &Note, show_date_created: bool) -> String {
        self.html.render(note, show_date_created)
    }

    pub fn text(&self, note: &Note, show_date_created: bool) -> String {
        self.text.render(note, show_date_created)
    }

    /// Write the rendering of `note` and return the file path
    #[instrument(level = "debug", skip(self, note), fields(id = note.id))]
    pub async fn export(
        &self,
        note: &Note,
        format: ExportFormat,
        show_date_created: bool,
    ) -> Result<PathBuf> {
        let content = match format {
            ExportFormat::Json => json::render(note).context("Failed to render note as JSON")?,
            ExportFormat::Txt => self.text(note, show_date_created),
            ExportFormat::Html | ExportFormat::Pdf => self.html(note, show_date_created),
        };

        let cache_dir = self.cache_dir.clone();
        let pdf = Arc::clone(&self.pdf);
        let path = tokio::task::spawn_blocking(move || -> Result<PathBuf> {
            let dir = empty_folder(&cache_dir, EXPORTED_DIR)?;
            let file = dir.join(format!("{EXPORT_FILE_STEM}.{}", format.extension()));
            match format {
                ExportFormat::Pdf => pdf.generate(&content, &file)?,
                _ => std::fs::write(&file, content)
                    .with_context(|| format!("Failed to write {}", file.display()))?,
            }
            Ok(file)
        })
        .await
        .context("Export task failed")??;

        info!(%format, path = %path.display(), "Exported note");
        Ok(path)
    }

    pub async fn json_file(&self, note: &Note) -> Result<PathBuf> {
        self.export(note, ExportFormat::Json, false).await
    }

    pub async fn txt_file(&self, note: &Note, show_date_created: bool) -> Result<PathBuf> {
        self.export(note, ExportFormat::Txt, show_date_created).await
    }

    pub async fn html_file(&self, note: &Note, show_date_created: bool) -> Result<PathBuf> {
        self.export(note, ExportFormat::Html, show_date_created).await
    }

    pub async fn pdf_file(&self, note: &Note, show_date_created: bool) -> Result<PathBuf> {
        self.export(note, ExportFormat::Pdf, show_date_created).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ListItem;
    use chrono::FixedOffset;
    use std::fs;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records the HTML it was given and writes a stub document
    #[derive(Default)]
    struct RecordingPdf {
        html: Mutex<Option<String>>,
    }

    impl PdfGenerator for RecordingPdf {
        fn generate(&self, html: &str, destination: &Path) -> Result<()> {
            *self.html.lock().unwrap() = Some(html.to_string());
            fs::write(destination, b"%PDF-1.4")?;
            Ok(())
        }
    }

    fn exporter(dir: &Path, pdf: Arc<dyn PdfGenerator>) -> NoteExporter {
        NoteExporter::new(
            dir.to_path_buf(),
            DateFormatter::new("en", FixedOffset::east_opt(0).unwrap()),
            pdf,
        )
    }

    #[rstest::rstest]
    #[case("json", ExportFormat::Json)]
    #[case("TXT", ExportFormat::Txt)]
    #[case("text", ExportFormat::Txt)]
    #[case("html", ExportFormat::Html)]
    #[case("pdf", ExportFormat::Pdf)]
    fn given_format_name_when_parsing_then_returns_format(
        #[case] input: &str,
        #[case] expected: ExportFormat,
    ) {
        assert_eq!(input.parse::<ExportFormat>().unwrap(), expected);
    }

    #[tokio::test]
    async fn given_note_when_exporting_each_format_then_keeps_only_latest_file() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let exporter = exporter(temp_dir.path(), Arc::new(RecordingPdf::default()));
        let note = Note::text("T", "B", 0);

        // Act
        let json = exporter.json_file(&note).await.unwrap();
        let txt = exporter.txt_file(&note, true).await.unwrap();

        // Assert
        assert_eq!(json.file_name().unwrap(), "Untitled.json");
        assert!(!json.exists(), "previous export should be cleared");
        assert_eq!(txt.file_name().unwrap(), "Untitled.txt");
        assert_eq!(fs::read_to_string(&txt).unwrap(), "T\n\nThu 1 Jan 1970\n\nB");
        assert_eq!(
            fs::read_dir(txt.parent().unwrap()).unwrap().count(),
            1
        );
    }

    #[tokio::test]
    async fn given_checklist_when_exporting_pdf_then_passes_html_to_generator() {
        let temp_dir = TempDir::new().unwrap();
        let pdf = Arc::new(RecordingPdf::default());
        let exporter = exporter(temp_dir.path(), pdf.clone());
        let note = Note::checklist("Shop", vec![ListItem::new("Buy milk", false)], 0);

        let path = exporter.pdf_file(&note, false).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "Untitled.pdf");
        assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4");
        let html = pdf.html.lock().unwrap().clone().unwrap();
        assert!(html.contains("<ol><li>Buy milk</li></ol>"));
    }

    #[tokio::test]
    async fn given_html_export_when_reading_file_then_matches_presenter_output() {
        let temp_dir = TempDir::new().unwrap();
        let exporter = exporter(temp_dir.path(), Arc::new(RecordingPdf::default()));
        let note = Note::text("a < b", "body", 0);

        let path = exporter.html_file(&note, false).await.unwrap();

        assert_eq!(fs::read_to_string(path).unwrap(), exporter.html(&note, false));
    }
}
