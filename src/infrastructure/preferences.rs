// src/infrastructure/preferences.rs
use crate::domain::preference::{ListInfo, SeekbarInfo};
use crate::domain::DomainError;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum StoredValue {
    Number(i64),
    Text(String),
}

/// Keyed settings persisted as a flat TOML table
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: BTreeMap<String, StoredValue>,
}

impl PreferenceStore {
    /// Open the store at `path`; a missing file starts empty
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read preferences {}", path.display()))?;
            parse_values(&content)
        } else {
            BTreeMap::new()
        };
        debug!(?path, count = values.len(), "Loaded preferences");
        Ok(Self { path, values })
    }

    pub fn seekbar(&self, info: &SeekbarInfo) -> i32 {
        match self.values.get(info.key) {
            Some(StoredValue::Number(value)) => i32::try_from(*value)
                .ok()
                .filter(|value| info.contains(*value))
                .unwrap_or(info.default),
            _ => info.default,
        }
    }

    pub fn list(&self, info: &ListInfo) -> String {
        match self.values.get(info.key) {
            Some(StoredValue::Text(value)) if info.accepts(value) => value.clone(),
            _ => info.default.to_string(),
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn save_seekbar(&mut self, info: &SeekbarInfo, value: i32) -> Result<()> {
        if !info.contains(value) {
            return Err(DomainError::PreferenceOutOfRange {
                key: info.key.to_string(),
                value,
                min: info.min,
                max: info.max,
            }
            .into());
        }
        self.values
            .insert(info.key.to_string(), StoredValue::Number(i64::from(value)));
        self.persist()
    }

    #[instrument(level = "debug", skip(self))]
    pub fn save_list(&mut self, info: &ListInfo, value: &str) -> Result<()> {
        if !info.accepts(value) {
            return Err(DomainError::UnknownChoice {
                key: info.key.to_string(),
                value: value.to_string(),
            }
            .into());
        }
        self.values
            .insert(info.key.to_string(), StoredValue::Text(value.to_string()));
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create preferences directory")?;
        }
        let content =
            toml::to_string_pretty(&self.values).context("Failed to serialize preferences")?;
        fs::write(&self.path, content)
            .with_context(|| format!("Failed to write preferences {}", self.path.display()))
    }
}

/// Integer and string entries of a preferences file. Anything else is
/// dropped so that reads of those keys fall back to defaults.
fn parse_values(content: &str) -> BTreeMap<String, StoredValue> {
    let table = match content.parse::<Table>() {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable preferences file");
            return BTreeMap::new();
        }
    };
    table
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::Integer(number) => Some((key, StoredValue::Number(number))),
            Value::String(text) => Some((key, StoredValue::Text(text))),
            other => {
                warn!(key = %key, kind = other.type_str(), "Ignoring preference of unsupported type");
                None
            }
        })
        .collect()
}
