// System-instruction assembly for answer generation.

use std::fmt::Write as _;

use crate::types::Node;

/// Fixed opening of every system instruction.
pub const BASE_INSTRUCTION: &str = "\
You are a well-read assistant helping someone explore a topic one question at a time. \
Each answer becomes a node on a canvas the reader can branch from.

## How to answer
- Answer the question fully, with the background needed to follow it.
- Explain why things hold, not only what holds.
- Use precise terminology and define it the first time it appears.
- Break complex topics into clear steps or parts.

## Formatting
- Organise the answer with Markdown headings, lists, and tables where they help.
- Put **bold** on key terms and keep a space on either side of bold text.
- Use `code` spans and fenced code blocks for code.
- Use LaTeX for mathematics: inline $E = mc^2$ or display $$\\int_a^b f(x)\\,dx$$.
- Use blockquotes for definitions. Do not separate sections with horizontal rules.

## Curiosity
- Mention one or two deeper concepts or connections worth exploring next.
- Point out open debates or alternative views where they exist.

## Language
- Reply in the language of the question, for the whole answer.";

/// The follow-up half of a prompt: what the reader highlighted and the answer
/// it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowUpContext {
    pub anchor: String,
    pub parent_answer: String,
}

/// Optional pieces appended to [`BASE_INSTRUCTION`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptContext {
    pub custom_instruction: Option<String>,
    /// Rendered dump of the other nodes on the canvas.
    pub project_context: Option<String>,
    pub follow_up: Option<FollowUpContext>,
}

/// Build the full system instruction.
///
/// The follow-up block is only added when both the anchor and the parent's
/// answer are non-empty.
pub fn build_system_instruction(context: &PromptContext) -> String {
    let mut instruction = BASE_INSTRUCTION.to_string();

    if let Some(custom) = non_blank(context.custom_instruction.as_deref()) {
        let _ = write!(instruction, "\n\n## Additional instructions from the reader\n{custom}");
    }

    if let Some(project) = non_blank(context.project_context.as_deref()) {
        let _ = write!(
            instruction,
            "\n\n## Other questions on this canvas\n\
             Refer back to these when it helps connect ideas.\n\n{project}"
        );
    }

    if let Some(follow_up) = &context.follow_up {
        if !follow_up.anchor.is_empty() && !follow_up.parent_answer.is_empty() {
            let _ = write!(
                instruction,
                "\n\nThe reader was going through an earlier answer, highlighted \"{anchor}\", \
                 and asked a new question from there.\n\n\
                 Answer the NEW question directly. The highlighted text is a starting \
                 point, so do not just explain it again.\n\n\
                 Earlier answer, for reference:\n{answer}",
                anchor = follow_up.anchor,
                answer = follow_up.parent_answer,
            );
        }
    }

    instruction
}

/// Render every node's question and answer as project context. Returns
/// `None` when there is nothing to show.
pub fn render_project_context(nodes: &[Node]) -> Option<String> {
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        let _ = writeln!(out, "### Q{}: {}", i + 1, node.content.user_prompt);
        if node.content.ai_response.is_empty() {
            out.push_str("(no answer yet)\n\n");
        } else {
            let _ = writeln!(out, "{}\n", node.content.ai_response);
        }
    }
    let trimmed = out.trim_end();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeContent, NodeId, Position};

    fn answered(id: &str, q: &str, a: &str) -> Node {
        let mut content = NodeContent::question(q);
        content.ai_response = a.to_string();
        Node {
            id: NodeId::from(id),
            position: Position::ORIGIN,
            content,
            parent_id: None,
            source_anchor: None,
        }
    }

    #[test]
    fn base_only_when_context_empty() {
        assert_eq!(build_system_instruction(&PromptContext::default()), BASE_INSTRUCTION);
    }

    #[test]
    fn custom_instruction_appended() {
        let prompt = build_system_instruction(&PromptContext {
            custom_instruction: Some("Answer like a pirate.".into()),
            ..PromptContext::default()
        });
        assert!(prompt.starts_with(BASE_INSTRUCTION));
        assert!(prompt.ends_with("Answer like a pirate."));
    }

    #[test]
    fn blank_custom_instruction_ignored() {
        let prompt = build_system_instruction(&PromptContext {
            custom_instruction: Some("   ".into()),
            ..PromptContext::default()
        });
        assert_eq!(prompt, BASE_INSTRUCTION);
    }

    #[test]
    fn follow_up_includes_anchor_and_parent_answer() {
        let prompt = build_system_instruction(&PromptContext {
            follow_up: Some(FollowUpContext {
                anchor: "disorder".into(),
                parent_answer: "Entropy measures disorder.".into(),
            }),
            ..PromptContext::default()
        });
        assert!(prompt.contains("highlighted \"disorder\""));
        assert!(prompt.ends_with("Entropy measures disorder."));
    }

    #[test]
    fn follow_up_with_empty_parent_answer_is_skipped() {
        let prompt = build_system_instruction(&PromptContext {
            follow_up: Some(FollowUpContext {
                anchor: "disorder".into(),
                parent_answer: String::new(),
            }),
            ..PromptContext::default()
        });
        assert_eq!(prompt, BASE_INSTRUCTION);
    }

    #[test]
    fn project_context_lists_every_node() {
        let nodes = vec![
            answered("a", "What is entropy?", "A measure of disorder."),
            answered("b", "Who coined it?", ""),
        ];
        let rendered = render_project_context(&nodes).unwrap();
        assert!(rendered.contains("### Q1: What is entropy?\nA measure of disorder."));
        assert!(rendered.contains("### Q2: Who coined it?\n(no answer yet)"));
        assert!(render_project_context(&[]).is_none());
    }
}
