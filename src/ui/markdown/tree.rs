//! The display tree handed to the display collaborator.
//!
//! Nodes are plain data: no markup, no callbacks, nothing executable. Text is
//! inert by construction, which is what makes raw-HTML demotion in the
//! renderer a complete sanitization story.

/// Referrer policy attached to every link node, preventing tab-napping from
/// rendered transcript content.
pub const LINK_REL: &str = "noopener noreferrer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered { start: u64 },
}

/// Block-level display node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Vec<Inline>),
    Heading { level: u8, content: Vec<Inline> },
    CodeBlock { language: Option<String>, text: String },
    List { kind: ListKind, items: Vec<Vec<Block>> },
    Quote(Vec<Block>),
    Rule,
}

/// Inline display node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    /// Inline code span; gets a distinguishing visual treatment downstream.
    Code(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    /// `opens_new_context` and `rel` are fixed by the renderer: links always
    /// open in a new browsing context with the referrer policy stripped.
    Link {
        destination: String,
        title: String,
        rel: String,
        opens_new_context: bool,
        children: Vec<Inline>,
    },
    /// `width_bounded` is always set by the renderer: images never overflow
    /// their container.
    Image {
        source: String,
        title: String,
        alt: String,
        width_bounded: bool,
    },
    SoftBreak,
    HardBreak,
}

impl Inline {
    /// Flatten an inline subtree to its plain text, e.g. for image alt text.
    pub fn collect_text(inlines: &[Inline]) -> String {
        let mut out = String::new();
        for inline in inlines {
            match inline {
                Inline::Text(text) | Inline::Code(text) => out.push_str(text),
                Inline::Emphasis(children)
                | Inline::Strong(children)
                | Inline::Strikethrough(children)
                | Inline::Link { children, .. } => {
                    out.push_str(&Self::collect_text(children));
                }
                Inline::Image { alt, .. } => out.push_str(alt),
                Inline::SoftBreak | Inline::HardBreak => out.push(' '),
            }
        }
        out
    }
}
