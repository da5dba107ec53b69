// src/cli/args.rs
use crate::application::ExportFormat;
use crate::domain::{Color, DomainError, Folder};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Folder and color names are accepted in any case on the command line
fn parse_folder(value: &str) -> Result<Folder, DomainError> {
    value.to_ascii_uppercase().parse()
}

fn parse_color(value: &str) -> Result<Color, DomainError> {
    value.to_ascii_uppercase().parse()
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)] // Read from `Cargo.toml`
#[command(arg_required_else_help = true, disable_help_subcommand = true)]
pub struct Args {
    /// Path to the TOML configuration file (optional)
    #[arg(short, long, value_name = "CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Root directory for data and cache, overriding the configuration
    #[arg(short, long, value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Verbosity level (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the notes of a folder, pinned first
    List {
        #[arg(short, long, value_name = "FOLDER", default_value = "NOTES", value_parser = parse_folder)]
        folder: Folder,

        /// Only active notes carrying this label
        #[arg(short, long, value_name = "LABEL", conflicts_with = "folder")]
        label: Option<String>,
    },

    /// Search titles, bodies, items and labels of one folder
    Search {
        #[arg(value_name = "KEYWORD")]
        keyword: String,

        #[arg(short, long, value_name = "FOLDER", default_value = "NOTES", value_parser = parse_folder)]
        folder: Folder,
    },

    /// Add a note; with --item, a checklist
    Add {
        #[arg(short, long, default_value = "")]
        title: String,

        #[arg(short, long)]
        body: Option<String>,

        /// Checklist item, repeatable; prefix with `x:` to mark it checked
        #[arg(short, long = "item", value_name = "ITEM", conflicts_with = "body")]
        items: Vec<String>,

        #[arg(short, long = "label", value_name = "LABEL")]
        labels: Vec<String>,
    },

    Pin {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,
    },

    Unpin {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,
    },

    /// Change the color tag of a note
    Color {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,

        #[arg(value_name = "COLOR", value_parser = parse_color)]
        color: Color,
    },

    /// Move a note to another folder
    Move {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,

        #[arg(value_name = "FOLDER", value_parser = parse_folder)]
        folder: Folder,
    },

    /// Delete a note permanently
    Delete {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,
    },

    /// Permanently delete every note in the trash
    EmptyTrash,

    Labels,

    LabelAdd {
        #[arg(value_name = "LABEL")]
        label: String,
    },

    LabelRename {
        #[arg(value_name = "OLD")]
        old: String,

        #[arg(value_name = "NEW")]
        new: String,
    },

    /// Delete a label and strip it from every note
    LabelDelete {
        #[arg(value_name = "LABEL")]
        label: String,
    },

    /// Replace the labels of a note
    Tag {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,

        #[arg(value_name = "LABEL")]
        labels: Vec<String>,
    },

    /// Render one note as json, txt, html or pdf
    Export {
        #[arg(value_name = "NOTE_ID")]
        note_id: i64,

        #[arg(short, long, default_value = "json")]
        format: ExportFormat,

        /// Copy the rendered file here instead of printing its path
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Write every note and label to a zip archive
    ExportBackup {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Import a zip archive written by export-backup
    ImportBackup {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Import a backup in the old XML format
    ImportXml {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Show a preference, or set it when a value is given
    Pref {
        #[arg(value_name = "KEY")]
        key: String,

        #[arg(value_name = "VALUE")]
        value: Option<String>,
    },
}
