use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// TOML configuration for a notekeep installation
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    /// Directory of the old XML store; migrated on open when present
    #[serde(default)]
    pub legacy_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct DisplayConfig {
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_pinned_header")]
    pub pinned_header: String,
    #[serde(default = "default_others_header")]
    pub others_header: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExportConfig {
    #[serde(default = "default_pdf_command")]
    pub pdf_command: String,
    #[serde(default)]
    pub pdf_args: Vec<String>,
}

// Default value functions
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("notekeep")
}
fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("notekeep")
}
fn default_locale() -> String { "en".to_string() }
fn default_pinned_header() -> String { "Pinned".to_string() }
fn default_others_header() -> String { "Others".to_string() }
fn default_pdf_command() -> String { "wkhtmltopdf".to_string() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            legacy_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            pinned_header: default_pinned_header(),
            others_header: default_others_header(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            pdf_command: default_pdf_command(),
            pdf_args: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse TOML config")?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .context("Failed to serialize config to TOML")?;

        std::fs::write(path.as_ref(), toml_string)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Configuration rooted at one directory, with the cache beneath it
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            storage: StorageConfig {
                data_dir: dir.join("data"),
                cache_dir: dir.join("cache"),
                legacy_dir: None,
            },
            ..Default::default()
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.storage.data_dir.join(crate::constants::DATABASE_NAME)
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.storage.data_dir.join(crate::constants::PREFERENCES_FILE)
    }
}
