// src/infrastructure/pdf.rs
use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::Builder;
use tracing::{debug, instrument};

/// Turns a standalone HTML document into a paginated PDF file
pub trait PdfGenerator: Send + Sync {
    fn generate(&self, html: &str, destination: &Path) -> Result<()>;
}

/// Runs an external converter as `command [args..] <input.html> <output.pdf>`
#[derive(Debug, Clone)]
pub struct CommandPdfGenerator {
    command: String,
    args: Vec<String>,
}

impl CommandPdfGenerator {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

impl PdfGenerator for CommandPdfGenerator {
    #[instrument(level = "debug", skip(self, html), fields(command = %self.command))]
    fn generate(&self, html: &str, destination: &Path) -> Result<()> {
        let temp_dir = Builder::new()
            .prefix("notekeep-pdf-")
            .rand_bytes(5)
            .tempdir()
            .context("Failed to create temporary directory")?;

        let input = temp_dir.path().join("note.html");
        File::create(&input)
            .with_context(|| format!("Failed to create temp file at {}", input.display()))?
            .write_all(html.as_bytes())
            .context("Failed to write content to temporary file")?;

        let status = Command::new(&self.command)
            .args(&self.args)
            .arg(&input)
            .arg(destination)
            .status()
            .with_context(|| format!("Failed to run {}", self.command))?;
        if !status.success() {
            bail!("{} exited with {}", self.command, status);
        }

        debug!(destination = %destination.display(), "Generated PDF");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    #[test]
    fn given_copying_command_when_generating_then_writes_destination() {
        let temp_dir = TempDir::new().unwrap();
        let destination = temp_dir.path().join("out.pdf");
        let generator = CommandPdfGenerator::new("cp", vec![]);

        generator.generate("<p>hi</p>", &destination).unwrap();

        assert_eq!(std::fs::read_to_string(&destination).unwrap(), "<p>hi</p>");
    }

    #[cfg(unix)]
    #[test]
    fn given_failing_command_when_generating_then_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let generator = CommandPdfGenerator::new("false", vec![]);

        assert!(generator.generate("", &temp_dir.path().join("out.pdf")).is_err());
    }

    #[test]
    fn given_missing_command_when_generating_then_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let generator = CommandPdfGenerator::new("notekeep-no-such-converter", vec![]);

        assert!(generator.generate("", &temp_dir.path().join("out.pdf")).is_err());
    }
}
