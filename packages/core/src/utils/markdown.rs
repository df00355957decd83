//! Markdown export for page documents
//!
//! Renders a [`Document`] as CommonMark-flavoured text for copy/export.
//! The rendering is lossy where Markdown has no equivalent: alignment is
//! dropped and underline falls back to inline HTML.

use crate::models::{Document, Mark, MarkKind, Node, NodeKind};
use regex::Regex;
use std::sync::LazyLock;

/// Characters that would otherwise be read as Markdown syntax
static MARKDOWN_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\\`*_\[\]#~<>|])").unwrap());

const THEMATIC_BREAK: &str = "---";

/// Render a document as Markdown
///
/// # Examples
///
/// ```
/// use folio_core::models::{Document, Node};
/// use folio_core::utils::document_to_markdown;
///
/// let doc = Document::new(vec![
///     Node::heading(1, vec![Node::text("Plan")]),
///     Node::paragraph_with_text("Ship it"),
/// ]);
/// assert_eq!(document_to_markdown(&doc), "# Plan\n\nShip it\n");
/// ```
pub fn document_to_markdown(document: &Document) -> String {
    let blocks = render_blocks(&document.children);
    if blocks.is_empty() {
        return String::new();
    }
    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn render_blocks(nodes: &[Node]) -> Vec<String> {
    let mut blocks = Vec::new();
    for (index, node) in nodes.iter().enumerate() {
        if node.kind == NodeKind::Section {
            blocks.push(THEMATIC_BREAK.to_string());
            blocks.extend(render_blocks(node.children()));
            let next_is_section = nodes
                .get(index + 1)
                .map(|next| next.kind == NodeKind::Section);
            if next_is_section == Some(false) {
                blocks.push(THEMATIC_BREAK.to_string());
            }
        } else {
            blocks.push(render_block(node));
        }
    }
    blocks
}

fn render_block(node: &Node) -> String {
    match node.kind {
        NodeKind::Paragraph => render_inline(node.children()),
        NodeKind::Heading => {
            let level = node.heading_level().unwrap_or(1) as usize;
            format!("{} {}", "#".repeat(level), render_inline(node.children()))
        }
        NodeKind::CodeBlock => format!("```\n{}\n```", node.text_content()),
        NodeKind::Blockquote => prefix_lines(&render_blocks(node.children()).join("\n\n"), "> "),
        NodeKind::BulletList => render_list(node, |_, _| "- ".to_string()),
        NodeKind::OrderedList => render_list(node, |index, _| format!("{}. ", index + 1)),
        NodeKind::TaskList => render_list(node, |_, item| {
            if item.is_checked() {
                "- [x] ".to_string()
            } else {
                "- [ ] ".to_string()
            }
        }),
        NodeKind::ListItem | NodeKind::TaskItem | NodeKind::Section => {
            render_blocks(node.children()).join("\n\n")
        }
        NodeKind::Text => render_inline(std::slice::from_ref(node)),
    }
}

/// Items are separated by single newlines; continuation lines are indented
/// to the width of the item marker
fn render_list<F>(list: &Node, marker: F) -> String
where
    F: Fn(usize, &Node) -> String,
{
    list.children()
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = marker(index, item);
            let indent = " ".repeat(marker.len());
            let body = render_blocks(item.children()).join("\n");
            let mut lines = body.lines();
            let mut rendered = format!("{}{}", marker, lines.next().unwrap_or_default());
            for line in lines {
                rendered.push('\n');
                if !line.is_empty() {
                    rendered.push_str(&indent);
                    rendered.push_str(line);
                }
            }
            rendered.trim_end().to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_lines(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{}{}", prefix, line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_inline(nodes: &[Node]) -> String {
    nodes.iter().map(render_text).collect()
}

fn render_text(node: &Node) -> String {
    let text = node.text.as_deref().unwrap_or_default();
    if text.is_empty() {
        return String::new();
    }

    let has = |kind: MarkKind| node.marks.iter().any(|mark| mark.kind() == kind);
    let mut out = if has(MarkKind::Code) {
        format!("`{}`", text)
    } else {
        escape(text)
    };

    for mark in &node.marks {
        out = match mark {
            Mark::Strike => format!("~~{}~~", out),
            Mark::Italic => format!("*{}*", out),
            _ => out,
        };
    }
    if has(MarkKind::Bold) {
        out = format!("**{}**", out);
    }
    if has(MarkKind::Underline) {
        out = format!("<u>{}</u>", out);
    }
    if let Some(Mark::Link { href }) = node
        .marks
        .iter()
        .find(|mark| matches!(mark, Mark::Link { .. }))
    {
        out = format!("[{}]({})", out, href);
    }
    out
}

fn escape(text: &str) -> String {
    MARKDOWN_SPECIAL.replace_all(text, r"\$1").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(text: &str) -> Node {
        Node::paragraph_with_text(text)
    }

    fn markdown(children: Vec<Node>) -> String {
        document_to_markdown(&Document::new(children))
    }

    #[test]
    fn test_headings_and_paragraphs() {
        let md = markdown(vec![
            Node::heading(2, vec![Node::text("Agenda")]),
            p("First item"),
        ]);
        assert_eq!(md, "## Agenda\n\nFirst item\n");
    }

    #[test]
    fn test_lists_and_tasks() {
        let md = markdown(vec![
            Node::with_children(
                NodeKind::BulletList,
                vec![Node::list_item(vec![p("one")]), Node::list_item(vec![p("two")])],
            ),
            Node::with_children(
                NodeKind::OrderedList,
                vec![Node::list_item(vec![p("first")]), Node::list_item(vec![p("second")])],
            ),
            Node::with_children(
                NodeKind::TaskList,
                vec![
                    Node::task_item(true, vec![p("done")]),
                    Node::task_item(false, vec![p("todo")]),
                ],
            ),
        ]);
        assert_eq!(
            md,
            "- one\n- two\n\n1. first\n2. second\n\n- [x] done\n- [ ] todo\n"
        );
    }

    #[test]
    fn test_nested_list_is_indented() {
        let nested = Node::with_children(
            NodeKind::BulletList,
            vec![Node::list_item(vec![p("inner")])],
        );
        let md = markdown(vec![Node::with_children(
            NodeKind::BulletList,
            vec![Node::list_item(vec![p("outer"), nested])],
        )]);
        assert_eq!(md, "- outer\n  - inner\n");
    }

    #[test]
    fn test_blockquote_and_code_block() {
        let md = markdown(vec![
            Node::with_children(NodeKind::Blockquote, vec![p("quoted"), p("twice")]),
            Node::code_block("let x = 1 * 2;"),
        ]);
        assert_eq!(md, "> quoted\n>\n> twice\n\n```\nlet x = 1 * 2;\n```\n");
    }

    #[test]
    fn test_sections_are_fenced_by_breaks() {
        let mut section = Node::section();
        section.children = Some(vec![p("inside")]);
        let md = markdown(vec![p("before"), section, p("after")]);
        assert_eq!(md, "before\n\n---\n\ninside\n\n---\n\nafter\n");
    }

    #[test]
    fn test_inline_marks() {
        let md = markdown(vec![Node::paragraph_with(vec![
            Node::text_with_marks("bold", vec![Mark::Bold]),
            Node::text(" and "),
            Node::text_with_marks("code", vec![Mark::Code]),
            Node::text(" and "),
            Node::text_with_marks("site", vec![Mark::Italic, Mark::link("https://x.io")]),
        ])]);
        assert_eq!(md, "**bold** and `code` and [*site*](https://x.io)\n");
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let md = markdown(vec![p("2 * 3 = 6 #notes [x]")]);
        assert_eq!(md, "2 \\* 3 = 6 \\#notes \\[x\\]\n");
    }

    #[test]
    fn test_empty_paragraph_renders_blank() {
        assert_eq!(document_to_markdown(&Document::empty()), "\n");
        assert_eq!(markdown(vec![]), "");
    }
}
