// src/infrastructure/legacy.rs
//
// Reader for the XML format written by older releases, both as a single
// exported backup document and as the per-note files of the old on-disk store.
use crate::domain::{Backup, Color, Folder, Label, ListItem, Note, NoteType, SpanRepresentation};
use anyhow::{bail, Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const LABELS_FILE: &str = "labels.xml";

/// Subdirectory of the legacy store for each folder
const FOLDER_DIRS: &[(&str, Folder)] = &[
    ("notes", Folder::Notes),
    ("deleted", Folder::Deleted),
    ("archived", Folder::Archived),
];

fn folder_for_container(name: &str) -> Option<Folder> {
    match name {
        "notes" => Some(Folder::Notes),
        "deleted-notes" => Some(Folder::Deleted),
        "archived-notes" => Some(Folder::Archived),
        _ => None,
    }
}

fn parse_bool(element: &str, text: &str) -> Result<bool> {
    match text.trim() {
        "true" => Ok(true),
        "false" | "" => Ok(false),
        other => bail!("<{element}> expects true or false, got {other:?}"),
    }
}

#[derive(Debug)]
struct NoteBuilder {
    note_type: NoteType,
    timestamp: i64,
    pinned: bool,
    title: String,
    body: String,
    spans: Vec<SpanRepresentation>,
    items: Vec<ListItem>,
    labels: BTreeSet<String>,
}

impl NoteBuilder {
    fn new(note_type: NoteType) -> Self {
        Self {
            note_type,
            timestamp: 0,
            pinned: false,
            title: String::new(),
            body: String::new(),
            spans: Vec::new(),
            items: Vec::new(),
            labels: BTreeSet::new(),
        }
    }

    fn build(self, folder: Folder) -> Note {
        Note {
            id: 0,
            note_type: self.note_type,
            folder,
            color: Color::Default,
            title: self.title,
            pinned: self.pinned,
            timestamp: self.timestamp,
            labels: self.labels,
            body: self.body,
            spans: self.spans,
            items: self.items,
        }
    }
}

fn parse_span(element: &BytesStart<'_>) -> Result<SpanRepresentation> {
    let mut span = SpanRepresentation::default();
    for attribute in element.attributes() {
        let attribute = attribute.context("Malformed span attribute")?;
        let value = attribute.unescape_value()?;
        match attribute.key.as_ref() {
            b"bold" => span.bold = parse_bool("span", &value)?,
            b"link" => span.link = parse_bool("span", &value)?,
            b"italic" => span.italic = parse_bool("span", &value)?,
            b"monospace" => span.monospace = parse_bool("span", &value)?,
            b"strikethrough" => span.strikethrough = parse_bool("span", &value)?,
            b"start" => span.start = value.trim().parse().context("Invalid span start")?,
            b"end" => span.end = value.trim().parse().context("Invalid span end")?,
            _ => {}
        }
    }
    Ok(span)
}

fn checked_attribute(element: &BytesStart<'_>) -> Result<bool> {
    for attribute in element.attributes() {
        let attribute = attribute.context("Malformed item attribute")?;
        if attribute.key.as_ref() == b"checked" {
            return parse_bool("item", &attribute.unescape_value()?);
        }
    }
    Ok(false)
}

/// Streaming state while walking a legacy document
struct Parser {
    default_folder: Folder,
    folder: Option<Folder>,
    current: Option<NoteBuilder>,
    text: String,
    item_checked: bool,
    backup: Backup,
}

impl Parser {
    fn new(default_folder: Folder) -> Self {
        Self {
            default_folder,
            folder: None,
            current: None,
            text: String::new(),
            item_checked: false,
            backup: Backup::default(),
        }
    }

    fn start(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
        self.text.clear();

        if let Some(folder) = folder_for_container(&name) {
            self.folder = Some(folder);
            return Ok(());
        }
        match name.as_str() {
            "note" => self.current = Some(NoteBuilder::new(NoteType::Note)),
            "list" => self.current = Some(NoteBuilder::new(NoteType::List)),
            "span" => {
                if let Some(note) = self.current.as_mut() {
                    note.spans.push(parse_span(element)?);
                }
            }
            "item" => self.item_checked = checked_attribute(element)?,
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) -> Result<()> {
        let name = String::from_utf8_lossy(name).into_owned();
        let text = std::mem::take(&mut self.text);

        if folder_for_container(&name).is_some() {
            self.folder = None;
            return Ok(());
        }

        if name == "note" || name == "list" {
            if let Some(builder) = self.current.take() {
                let folder = self.folder.unwrap_or(self.default_folder);
                self.backup.notes.push(builder.build(folder));
            }
            return Ok(());
        }

        let Some(note) = self.current.as_mut() else {
            if name == "label" && !text.is_empty() {
                self.backup.labels.push(Label::new(text));
            }
            return Ok(());
        };

        match name.as_str() {
            "date-created" => {
                note.timestamp = text
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid date-created {text:?}"))?;
            }
            "pinned" => note.pinned = parse_bool("pinned", &text)?,
            "title" => note.title = text,
            "body" => note.body = text,
            "item" => note.items.push(ListItem::new(text, self.item_checked)),
            "label" => {
                if !text.is_empty() {
                    note.labels.insert(text);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn parse_document<R: BufRead>(reader: R, default_folder: Folder) -> Result<Backup> {
    let mut reader = Reader::from_reader(reader);
    let mut parser = Parser::new(default_folder);
    let mut buf = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader
            .read_event_into(&mut buf)
            .with_context(|| format!("Malformed XML at byte {}", reader.buffer_position()))?
        {
            Event::Start(element) => {
                depth += 1;
                parser.start(&element)?;
            }
            Event::Empty(element) => {
                parser.start(&element)?;
                parser.end(element.name().as_ref())?;
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                parser.end(element.name().as_ref())?;
            }
            Event::Text(text) => parser.text.push_str(&text.unescape()?),
            Event::CData(data) => parser.text.push_str(&String::from_utf8_lossy(&data.into_inner())),
            Event::Eof if depth > 0 => bail!("Document ends inside {depth} open elements"),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.backup)
}

/// Parse an exported legacy backup document into notes and labels
#[instrument(level = "debug", skip(reader))]
pub fn parse_backup<R: BufRead>(reader: R) -> Result<Backup> {
    let backup = parse_document(reader, Folder::Notes)?;
    debug!(
        notes = backup.notes.len(),
        labels = backup.labels.len(),
        "Parsed legacy backup"
    );
    Ok(backup)
}

/// The XML-file store used before notes moved into SQLite
#[derive(Debug, Clone)]
pub struct LegacyStore {
    root: PathBuf,
}

impl LegacyStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "xml") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Every note left in the legacy folders
    pub fn previous_notes(&self) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        for (dir, folder) in FOLDER_DIRS {
            for path in Self::xml_files(&self.root.join(dir))? {
                let file = File::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                let document = parse_document(BufReader::new(file), *folder)
                    .with_context(|| format!("Failed to parse {}", path.display()))?;
                notes.extend(document.notes);
            }
        }
        Ok(notes)
    }

    pub fn previous_labels(&self) -> Result<Vec<Label>> {
        let path = self.root.join(LABELS_FILE);
        if !path.is_file() {
            return Ok(Vec::new());
        }
        let file =
            File::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(parse_document(BufReader::new(file), Folder::Notes)?.labels)
    }

    pub fn clear_all_labels(&self) -> Result<()> {
        let path = self.root.join(LABELS_FILE);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }

    pub fn clear_all_folders(&self) -> Result<()> {
        for (dir, _) in FOLDER_DIRS {
            for path in Self::xml_files(&self.root.join(dir))? {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
        }
        info!(root = %self.root.display(), "Cleared legacy note folders");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BACKUP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<exported-notes>
    <notes>
        <note>
            <date-created>1600000000000</date-created>
            <pinned>true</pinned>
            <title>Fish &amp; chips</title>
            <body>Bold start</body>
            <spans>
                <span bold="true" italic="false" link="false" monospace="false" strikethrough="false" start="0" end="4"/>
            </spans>
            <labels>
                <label>Food</label>
            </labels>
        </note>
    </notes>
    <archived-notes>
        <list>
            <date-created>1600000000001</date-created>
            <pinned>false</pinned>
            <title>Chores</title>
            <items>
                <item checked="true">Dishes</item>
                <item checked="false">Laundry</item>
            </items>
        </list>
    </archived-notes>
    <labels>
        <label>Food</label>
        <label>Home</label>
    </labels>
</exported-notes>"#;

    #[test]
    fn given_exported_document_when_parsing_then_returns_notes_in_their_folders() {
        // Act
        let backup = parse_backup(BACKUP.as_bytes()).unwrap();

        // Assert
        assert_eq!(backup.labels, vec![Label::new("Food"), Label::new("Home")]);
        assert_eq!(backup.notes.len(), 2);

        let note = &backup.notes[0];
        assert_eq!(note.note_type, NoteType::Note);
        assert_eq!(note.folder, Folder::Notes);
        assert_eq!(note.title, "Fish & chips");
        assert!(note.pinned);
        assert_eq!(note.timestamp, 1_600_000_000_000);
        assert_eq!(note.spans.len(), 1);
        assert!(note.spans[0].bold);
        assert_eq!((note.spans[0].start, note.spans[0].end), (0, 4));
        assert!(note.labels.contains("Food"));

        let list = &backup.notes[1];
        assert_eq!(list.note_type, NoteType::List);
        assert_eq!(list.folder, Folder::Archived);
        assert_eq!(
            list.items,
            vec![ListItem::new("Dishes", true), ListItem::new("Laundry", false)]
        );
    }

    #[test]
    fn given_invalid_pinned_text_when_parsing_then_fails() {
        let xml = "<exported-notes><notes><note><pinned>yes</pinned></note></notes></exported-notes>";

        assert!(parse_backup(xml.as_bytes()).is_err());
    }

    #[test]
    fn given_truncated_document_when_parsing_then_fails() {
        let xml = "<exported-notes><notes><note><title>x</note>";

        assert!(parse_backup(xml.as_bytes()).is_err());
    }

    #[test]
    fn given_unclosed_elements_at_end_when_parsing_then_fails() {
        let xml = "<exported-notes><notes><note><title>x</title>";

        assert!(parse_backup(xml.as_bytes()).is_err());
    }

    #[test]
    fn given_legacy_store_when_reading_and_clearing_then_empties_store() {
        // Arrange
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("notes")).unwrap();
        fs::create_dir_all(root.join("deleted")).unwrap();
        fs::write(
            root.join("notes/1.xml"),
            "<note><date-created>5</date-created><title>Kept</title><body>b</body></note>",
        )
        .unwrap();
        fs::write(
            root.join("deleted/2.xml"),
            r#"<list><title>Gone</title><item checked="true">x</item></list>"#,
        )
        .unwrap();
        fs::write(root.join(LABELS_FILE), "<labels><label>Work</label></labels>").unwrap();
        let store = LegacyStore::new(root);

        // Act
        let notes = store.previous_notes().unwrap();
        let labels = store.previous_labels().unwrap();
        store.clear_all_labels().unwrap();
        store.clear_all_folders().unwrap();

        // Assert
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].folder, Folder::Notes);
        assert_eq!(notes[1].folder, Folder::Deleted);
        assert_eq!(labels, vec![Label::new("Work")]);
        assert!(store.previous_notes().unwrap().is_empty());
        assert!(store.previous_labels().unwrap().is_empty());
    }

    #[test]
    fn given_missing_store_when_reading_then_returns_nothing() {
        let store = LegacyStore::new("/nonexistent/legacy");

        assert!(store.previous_notes().unwrap().is_empty());
        assert!(store.previous_labels().unwrap().is_empty());
    }
}
