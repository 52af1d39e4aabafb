//! Exporters that turn a canvas snapshot into files: a Markdown transcript,
//! a JSON project file that can be imported again, and a self-contained
//! HTML viewer.

pub mod html;
pub mod markdown;
pub mod project;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::config::Theme;
use crate::error::ExportError;
use crate::types::CanvasSnapshot;

pub use html::HtmlExporter;
pub use markdown::MarkdownExporter;
pub use project::{ImportSummary, ProjectExporter, ProjectFile, import_project, parse_project};

/// Settings shared by every exporter.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// Document title. Markdown uses it as the H1.
    pub title: String,
    /// Initial colour scheme of the HTML viewer.
    pub theme: Theme,
    /// Stamped into project files and used for the default file name.
    pub created_at: DateTime<Utc>,
}

impl ExportOptions {
    /// Options stamped with the current time, titled with the default base name.
    pub fn now(theme: Theme) -> Self {
        let created_at = Utc::now();
        Self {
            title: default_base_name(&created_at),
            theme,
            created_at,
        }
    }
}

/// `ariadne-export-YYYY-MM-DD` for the given instant.
pub fn default_base_name(at: &DateTime<Utc>) -> String {
    format!("ariadne-export-{}", at.format("%Y-%m-%d"))
}

/// Common interface for export formats.
pub trait Exporter: Send + Sync {
    /// Human-readable name for this format.
    fn name(&self) -> &'static str;

    /// File extension without the dot.
    fn extension(&self) -> &'static str;

    /// Produce the file content. An empty snapshot is an error.
    fn render(&self, snapshot: &CanvasSnapshot, options: &ExportOptions) -> crate::error::Result<String>;

    /// Render and write `<dir>/<base_name>.<extension>`, returning the path.
    fn write(
        &self,
        snapshot: &CanvasSnapshot,
        options: &ExportOptions,
        dir: &Path,
        base_name: &str,
    ) -> crate::error::Result<PathBuf> {
        let content = self.render(snapshot, options)?;
        std::fs::create_dir_all(dir).map_err(ExportError::Io)?;
        let path = dir.join(format!("{base_name}.{}", self.extension()));
        std::fs::write(&path, content).map_err(ExportError::Io)?;
        info!(format = self.name(), path = %path.display(), nodes = snapshot.nodes.len(), "Exported canvas");
        Ok(path)
    }
}

/// Every available exporter, in the order the CLI writes them.
pub fn all_exporters() -> Vec<Box<dyn Exporter>> {
    vec![
        Box::new(HtmlExporter),
        Box::new(MarkdownExporter),
        Box::new(ProjectExporter),
    ]
}

fn ensure_not_empty(snapshot: &CanvasSnapshot) -> Result<(), ExportError> {
    if snapshot.is_empty() {
        return Err(ExportError::Empty);
    }
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────
