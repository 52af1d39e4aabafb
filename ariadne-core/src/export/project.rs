//! The `.ariadne` project file: a versioned JSON snapshot that round-trips
//! through [`import_project`].

use std::path::Path;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ExportError, ImportError};
use crate::store::CanvasStore;
use crate::types::{CanvasSnapshot, Edge, Node};

use super::{ExportOptions, Exporter, ensure_not_empty};

pub const PROJECT_VERSION: &str = "1.0";
pub const PROJECT_EXTENSIONS: [&str; 2] = ["ariadne", "json"];

const REQUIRED_KEYS: [&str; 3] = ["version", "nodes", "edges"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFile {
    pub version: String,
    #[serde(default)]
    pub created_at: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl ProjectFile {
    pub fn from_snapshot(snapshot: &CanvasSnapshot, options: &ExportOptions) -> Self {
        Self {
            version: PROJECT_VERSION.to_string(),
            created_at: options
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            nodes: snapshot.nodes.clone(),
            edges: snapshot.edges.clone(),
        }
    }

    pub fn into_snapshot(self) -> CanvasSnapshot {
        CanvasSnapshot {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectExporter;

impl Exporter for ProjectExporter {
    fn name(&self) -> &'static str {
        "project"
    }

    fn extension(&self) -> &'static str {
        "ariadne"
    }

    fn render(&self, snapshot: &CanvasSnapshot, options: &ExportOptions) -> crate::error::Result<String> {
        ensure_not_empty(snapshot)?;
        let file = ProjectFile::from_snapshot(snapshot, options);
        serde_json::to_string_pretty(&file).map_err(|e| ExportError::Template(e.to_string()).into())
    }
}

/// Reject paths without a project extension.
pub fn validate_extension(path: &Path) -> Result<(), ImportError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    if PROJECT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ImportError::UnsupportedExtension(path.display().to_string()))
    }
}

/// Parse project-file text. Checks the required top-level keys before
/// decoding nodes and edges.
pub fn parse_project(text: &str) -> Result<ProjectFile, ImportError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| ImportError::InvalidJson(e.to_string()))?;
    let Some(object) = value.as_object() else {
        return Err(ImportError::InvalidJson("top level is not an object".into()));
    };
    if let Some(missing) = REQUIRED_KEYS.iter().find(|k| !object.contains_key(**k)) {
        return Err(ImportError::MissingKey(*missing));
    }
    serde_json::from_value(value).map_err(|e| ImportError::InvalidJson(e.to_string()))
}

/// Counts from a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub nodes: usize,
    pub edges: usize,
    /// Edges dropped because an endpoint was missing.
    pub dropped_edges: usize,
}

/// Replace the store's contents with a project file. Nothing in the store
/// changes unless the whole file is valid.
pub fn import_project(store: &CanvasStore, path: &Path) -> crate::error::Result<ImportSummary> {
    validate_extension(path)?;
    let text = std::fs::read_to_string(path).map_err(ImportError::Io)?;
    let project = parse_project(&text)?;

    let counts = store.replace_all(project.into_snapshot());
    let summary = ImportSummary {
        nodes: counts.nodes,
        edges: counts.edges,
        dropped_edges: counts.dropped_edges,
    };
    info!(
        path = %path.display(),
        nodes = summary.nodes,
        edges = summary.edges,
        dropped = summary.dropped_edges,
        "Imported project"
    );
    Ok(summary)
}

// ── Tests ───────────────────────────────────────────────────────────
