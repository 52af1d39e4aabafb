//! Self-contained HTML viewer: the canvas data is embedded as JSON and drawn
//! by a small inline script, so the file works offline.

use crate::error::ExportError;
use crate::types::CanvasSnapshot;

use super::{ExportOptions, Exporter, ensure_not_empty};

const TEMPLATE: &str = include_str!("template.html");

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlExporter;

impl Exporter for HtmlExporter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn extension(&self) -> &'static str {
        "html"
    }

    fn render(&self, snapshot: &CanvasSnapshot, options: &ExportOptions) -> crate::error::Result<String> {
        ensure_not_empty(snapshot)?;
        let nodes = embed_json(&snapshot.nodes)?;
        let edges = embed_json(&snapshot.edges)?;
        let title = escape_html(&options.title);
        Ok(fill_template(
            TEMPLATE,
            &[
                ("TITLE", title.as_str()),
                ("THEME", options.theme.as_str()),
                ("NODES_JSON", nodes.as_str()),
                ("EDGES_JSON", edges.as_str()),
            ],
        ))
    }
}

/// Serialize `value` for a `<script type="application/json">` block.
///
/// `</script` in any case would close the block early, and U+2028/U+2029
/// are line terminators to older script parsers.
pub fn embed_json<T: serde::Serialize>(value: &T) -> Result<String, ExportError> {
    let json = serde_json::to_string(value).map_err(|e| ExportError::Template(e.to_string()))?;
    Ok(escape_script_close(&json)
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

fn escape_script_close(json: &str) -> String {
    const NEEDLE: &str = "</script";
    let mut out = String::with_capacity(json.len());
    let mut rest = json;
    while let Some(pos) = rest.to_ascii_lowercase().find(NEEDLE) {
        out.push_str(&rest[..pos]);
        out.push_str("<\\/");
        // Keep the original casing of "script".
        out.push_str(&rest[pos + 2..pos + NEEDLE.len()]);
        rest = &rest[pos + NEEDLE.len()..];
    }
    out.push_str(rest);
    out
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace `{{KEY}}` placeholders in one pass, so substituted values are
/// never scanned for further placeholders. Unknown keys are left as is.
fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match values.iter().find(|(k, _)| *k == key) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    out
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Theme;
    use crate::export::tests::options;
    use crate::types::{Edge, Node, NodeContent, NodeId, Position, SourceAnchor};

    fn snapshot_with_answer(answer: &str) -> CanvasSnapshot {
        let mut content = NodeContent::question("What is entropy?");
        content.ai_response = answer.to_string();
        let child = Node {
            id: NodeId::from("b"),
            position: Position::new(550.0, 0.0),
            content: NodeContent::question("Why?"),
            parent_id: Some(NodeId::from("a")),
            source_anchor: Some(SourceAnchor::from_text("disorder")),
        };
        CanvasSnapshot {
            nodes: vec![
                Node {
                    id: NodeId::from("a"),
                    position: Position::ORIGIN,
                    content,
                    parent_id: None,
                    source_anchor: None,
                },
                child,
            ],
            edges: vec![Edge::link(&NodeId::from("a"), &NodeId::from("b"))],
        }
    }

    fn embedded(html: &str, id: &str) -> String {
        let open = format!("<script type=\"application/json\" id=\"{id}\">");
        let start = html.find(&open).unwrap() + open.len();
        let end = start + html[start..].find("</script>").unwrap();
        html[start..end].to_string()
    }

    #[test]
    fn embeds_nodes_and_edges_as_json() {
        let html = HtmlExporter
            .render(&snapshot_with_answer("Disorder."), &options())
            .unwrap();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<title>ariadne-export-2026-03-14</title>"));
        assert!(html.contains("data-theme=\"light\""));

        let nodes: Vec<Node> = serde_json::from_str(&embedded(&html, "nodes-data")).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].source_anchor.as_ref().unwrap().text, "disorder");
        let edges: Vec<Edge> = serde_json::from_str(&embedded(&html, "edges-data")).unwrap();
        assert_eq!(edges[0].id.as_str(), "edge-a-b");
        assert!(!html.contains("{{"));
    }

    #[test]
    fn script_close_in_answer_cannot_break_out() {
        let answer = "Try <script>alert(1)</script> or </SCRIPT> \u{2028}here\u{2029}";
        let html = HtmlExporter
            .render(&snapshot_with_answer(answer), &options())
            .unwrap();
        let data = embedded(&html, "nodes-data");
        assert!(!data.to_ascii_lowercase().contains("</script"));
        assert!(!data.contains('\u{2028}') && !data.contains('\u{2029}'));

        // The escaped payload is still valid JSON carrying the original text.
        let nodes: Vec<Node> = serde_json::from_str(&data).unwrap();
        assert_eq!(nodes[0].content.ai_response, answer);
    }

    #[test]
    fn dark_theme_and_escaped_title() {
        let mut opts = options();
        opts.theme = Theme::Dark;
        opts.title = "Entropy & <friends>".into();
        let html = HtmlExporter.render(&snapshot_with_answer("x"), &opts).unwrap();
        assert!(html.contains("data-theme=\"dark\""));
        assert!(html.contains("<title>Entropy &amp; &lt;friends&gt;</title>"));
    }

    #[test]
    fn placeholders_are_filled_once() {
        let out = fill_template("a {{X}} b {{Y}} {{Z}}", &[("X", "{{Y}}"), ("Y", "y")]);
        assert_eq!(out, "a {{Y}} b y {{Z}}");
    }

    #[test]
    fn script_close_keeps_case() {
        assert_eq!(escape_script_close("x</ScRiPt>y"), "x<\\/ScRiPt>y");
    }
}
