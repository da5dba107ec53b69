// src/lib.rs
pub mod application;
pub mod cli;
pub mod constants;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod util;

use crate::application::{ImportOutcome, NoteModel};
use crate::cli::args::{Args, Command};
use crate::domain::{Item, ListItem, Note};
use crate::infrastructure::{Config, NoteStore};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, info};

pub fn run(args: Args) -> Result<()> {
    debug!(?args, "Starting notekeep with arguments");

    let config = load_config(&args)?;
    debug!(?config, "Resolved configuration");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(execute(args.command, config))
}

/// Default location of the configuration file
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("notekeep").join("config.toml"))
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match args.config.as_ref().cloned().or_else(default_config_path) {
        Some(path) => {
            debug!(?path, "Loading configuration");
            Config::load_or_default(&path)?
        }
        None => Config::default(),
    };
    if let Some(dir) = &args.data_dir {
        config.storage = Config::in_dir(dir).storage;
    }
    Ok(config)
}

fn print_items(items: &[Item]) {
    for item in items {
        match item {
            Item::Header(header) => println!("-- {} --", header.label),
            Item::Note(note) => println!("{}\t{}", note.id, util::text::preview(note)),
        }
    }
}

/// Checklist items from the command line; `x:` marks an item as checked
fn parse_item(raw: &str) -> ListItem {
    match raw.strip_prefix("x:") {
        Some(body) => ListItem::new(body.trim_start(), true),
        None => ListItem::new(raw, false),
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

async fn execute(command: Command, config: Config) -> Result<()> {
    let (model, _events) = NoteModel::<NoteStore>::open(&config).await?;

    match command {
        Command::List { folder, label } => {
            let items = match label {
                Some(label) => model.label_items(&label).await?,
                None => model.folder_items(folder).await?,
            };
            print_items(&items);
        }
        Command::Search { keyword, folder } => {
            print_items(&model.search(&keyword, folder).await?);
        }
        Command::Add {
            title,
            body,
            items,
            labels,
        } => {
            let note = if items.is_empty() {
                Note::text(title, body.unwrap_or_default(), now_millis())
            } else {
                Note::checklist(title, items.iter().map(|raw| parse_item(raw)).collect(), now_millis())
            };
            let id = model.insert_note(note.with_labels(labels)).await?;
            info!(note_id = id, "Added note");
            println!("{id}");
        }
        Command::Pin { note_id } => model.pin_note(note_id).await?,
        Command::Unpin { note_id } => model.unpin_note(note_id).await?,
        Command::Color { note_id, color } => model.color_note(note_id, color).await?,
        Command::Move { note_id, folder } => match folder {
            domain::Folder::Notes => model.restore_note(note_id).await?,
            domain::Folder::Deleted => model.move_note_to_deleted(note_id).await?,
            domain::Folder::Archived => model.move_note_to_archive(note_id).await?,
        },
        Command::Delete { note_id } => {
            model.delete_note_forever(note_id).await?;
            info!(note_id, "Deleted note");
        }
        Command::EmptyTrash => {
            let deleted = model.delete_all_notes().await?;
            println!("Deleted {deleted} notes");
        }
        Command::Labels => {
            for label in model.all_labels().await? {
                println!("{label}");
            }
        }
        Command::LabelAdd { label } => {
            if !model.insert_label(&label).await? {
                println!("Label {label} already exists");
            }
        }
        Command::LabelRename { old, new } => {
            if !model.update_label(&old, &new).await? {
                println!("Could not rename {old} to {new}");
            }
        }
        Command::LabelDelete { label } => model.delete_label(&label).await?,
        Command::Tag { note_id, labels } => {
            model
                .update_note_labels(note_id, labels.into_iter().collect())
                .await?
        }
        Command::Export {
            note_id,
            format,
            output,
        } => {
            let note = model.get_note(note_id).await?;
            let path = model.export_note(&note, format).await?;
            match output {
                Some(destination) => model.write_current_file_to(&destination).await?,
                None => println!("{}", path.display()),
            }
        }
        Command::ExportBackup { path } => {
            model.export_backup(&path).await?;
            println!("Saved backup to {}", path.display());
        }
        Command::ImportBackup { path } => report_import(model.import_zip_backup(&path).await?),
        Command::ImportXml { path } => report_import(model.import_xml_backup(&path).await?),
        Command::Pref { key, value } => match value {
            Some(value) => model.save_preference(&key, &value).await?,
            None => println!("{}", model.preference(&key)?),
        },
    }
    Ok(())
}

fn report_import(outcome: ImportOutcome) {
    match outcome {
        ImportOutcome::Imported { notes, labels } => {
            println!("Imported {notes} notes and {labels} labels")
        }
        ImportOutcome::InvalidBackup => println!("Invalid backup"),
        ImportOutcome::Skipped => debug!("Import skipped"),
    }
}
