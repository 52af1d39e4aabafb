use crate::types::CanvasSnapshot;

use super::{ExportOptions, Exporter, ensure_not_empty};

/// Q&A transcript in store order.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, snapshot: &CanvasSnapshot, options: &ExportOptions) -> crate::error::Result<String> {
        ensure_not_empty(snapshot)?;

        let mut lines: Vec<String> = vec![format!("# {}", options.title), String::new()];
        for node in &snapshot.nodes {
            lines.push(format!("## {}", node.content.user_prompt));
            lines.push(String::new());
            if let Some(anchor) = &node.source_anchor {
                lines.push(format!("> *From: \"{}\"*", anchor.text));
                lines.push(String::new());
            }
            lines.push(node.content.ai_response.clone());
            lines.push(String::new());
            lines.push("---".to_string());
            lines.push(String::new());
        }
        Ok(lines.join("\n"))
    }
}

// ── Tests ───────────────────────────────────────────────────────────
