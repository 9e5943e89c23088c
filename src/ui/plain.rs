//! Minimal terminal projection of the display tree.
//!
//! This is the bundled display collaborator: it flattens a rendered tree into
//! ANSI-decorated text for a line-oriented terminal. The per-node overrides
//! the renderer fixed (code treatment, list semantics, link targets) surface
//! here as text decorations; `rel`/new-context attributes have no terminal
//! equivalent and are carried for DOM-style collaborators instead.

use crate::ui::markdown::{Block, Inline, ListKind};

const BOLD: &str = "\x1b[1m";
const ITALIC: &str = "\x1b[3m";
const STRIKE: &str = "\x1b[9m";
const RESET: &str = "\x1b[0m";

/// Flatten a display tree to terminal text.
pub fn render_blocks(blocks: &[Block]) -> String {
    let mut out = String::new();
    write_blocks(&mut out, blocks);
    // Blocks are blank-line separated; the last separator is noise.
    out.truncate(out.trim_end_matches('\n').len());
    out
}

fn write_blocks(out: &mut String, blocks: &[Block]) {
    for block in blocks {
        match block {
            Block::Paragraph(inlines) => {
                write_inlines(out, inlines);
                out.push_str("\n\n");
            }
            Block::Heading { content, .. } => {
                out.push_str(BOLD);
                write_inlines(out, content);
                out.push_str(RESET);
                out.push_str("\n\n");
            }
            Block::CodeBlock { text, .. } => {
                for line in text.lines() {
                    out.push_str("    ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
            Block::List { kind, items } => {
                for (index, item) in items.iter().enumerate() {
                    let marker = match kind {
                        ListKind::Unordered => "- ".to_string(),
                        ListKind::Ordered { start } => format!("{}. ", start + index as u64),
                    };
                    let mut body = String::new();
                    write_blocks(&mut body, item);
                    push_prefixed(out, &body, &marker, &" ".repeat(marker.len()));
                }
                out.push('\n');
            }
            Block::Quote(inner) => {
                let mut body = String::new();
                write_blocks(&mut body, inner);
                push_prefixed(out, &body, "> ", "> ");
                out.push('\n');
            }
            Block::Rule => out.push_str("----\n\n"),
        }
    }
}

/// Write a nested body with a marker on its first line and a continuation
/// prefix on the rest.
fn push_prefixed(out: &mut String, body: &str, first: &str, rest: &str) {
    for (index, line) in body.trim_end_matches('\n').lines().enumerate() {
        out.push_str(if index == 0 { first } else { rest });
        out.push_str(line);
        out.push('\n');
    }
}

fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push_str(text),
            Inline::Code(code) => {
                out.push('`');
                out.push_str(code);
                out.push('`');
            }
            Inline::Emphasis(children) => {
                out.push_str(ITALIC);
                write_inlines(out, children);
                out.push_str(RESET);
            }
            Inline::Strong(children) => {
                out.push_str(BOLD);
                write_inlines(out, children);
                out.push_str(RESET);
            }
            Inline::Strikethrough(children) => {
                out.push_str(STRIKE);
                write_inlines(out, children);
                out.push_str(RESET);
            }
            Inline::Link {
                destination,
                children,
                ..
            } => {
                write_inlines(out, children);
                out.push_str(" (");
                out.push_str(destination);
                out.push(')');
            }
            Inline::Image { source, alt, .. } => {
                out.push_str("[image: ");
                out.push_str(alt);
                out.push_str("] (");
                out.push_str(source);
                out.push(')');
            }
            Inline::SoftBreak => out.push(' '),
            Inline::HardBreak => out.push('\n'),
        }
    }
}
