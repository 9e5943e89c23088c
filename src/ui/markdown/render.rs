use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

use super::tree::{Block, Inline, ListKind, LINK_REL};

/// Project markdown-flavored message content into a display tree.
///
/// Pure and side-effect free: rendering the same content twice produces
/// structurally identical trees, so re-rendering is always safe. Raw HTML in
/// the source is demoted to literal text and never becomes a markup node.
pub fn render_markdown(content: &str) -> Vec<Block> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(content, options);

    let mut builder = TreeBuilder::default();
    for event in parser {
        builder.handle(event);
    }
    builder.finish()
}

fn language_hint(kind: CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Indented => None,
        CodeBlockKind::Fenced(info) => info
            .split_ascii_whitespace()
            .next()
            .filter(|token| !token.is_empty())
            .map(str::to_owned),
    }
}

/// Open block container (quote, list, or list item) awaiting its end tag.
enum Container {
    Quote(Vec<Block>),
    List {
        kind: ListKind,
        items: Vec<Vec<Block>>,
    },
    Item(Vec<Block>),
}

/// Open inline construct awaiting its end tag.
enum InlineFrame {
    Emphasis,
    Strong,
    Strikethrough,
    Link { destination: String, title: String },
    Image { source: String, title: String },
}

/// Stack machine over the pulldown-cmark event stream.
///
/// `inline_frames` holds the current block's inline accumulation: the bottom
/// entry (frame `None`) is the block root, entries above it are open inline
/// constructs. Tight list items emit inline events without a surrounding
/// paragraph, so the root frame is opened lazily on first use.
#[derive(Default)]
struct TreeBuilder {
    top: Vec<Block>,
    containers: Vec<Container>,
    inline_frames: Vec<(Option<InlineFrame>, Vec<Inline>)>,
    heading: Option<u8>,
    code_block: Option<(Option<String>, String)>,
}

impl TreeBuilder {
    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => {
                if let Some((_, buffer)) = self.code_block.as_mut() {
                    buffer.push_str(&text);
                } else {
                    self.sink().push(Inline::Text(text.into_string()));
                }
            }
            Event::Code(code) => self.sink().push(Inline::Code(code.into_string())),
            Event::Html(html) | Event::InlineHtml(html) => {
                // Untrusted markup: demoted to literal text, never interpreted.
                self.sink().push(Inline::Text(html.into_string()));
            }
            Event::SoftBreak => self.sink().push(Inline::SoftBreak),
            Event::HardBreak => self.sink().push(Inline::HardBreak),
            Event::Rule => {
                self.close_implicit_paragraph();
                self.push_block(Block::Rule);
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        // A tight list item may leave an implicit paragraph open; any
        // block-level construct starting under it closes that paragraph.
        if matches!(
            tag,
            Tag::Paragraph
                | Tag::Heading { .. }
                | Tag::BlockQuote(_)
                | Tag::List(_)
                | Tag::Item
                | Tag::CodeBlock(_)
        ) {
            self.close_implicit_paragraph();
        }

        match tag {
            Tag::Paragraph => self.inline_frames.push((None, Vec::new())),
            Tag::Heading { level, .. } => {
                self.heading = Some(level as u8);
                self.inline_frames.push((None, Vec::new()));
            }
            Tag::BlockQuote(_) => self.containers.push(Container::Quote(Vec::new())),
            Tag::List(start) => self.containers.push(Container::List {
                kind: match start {
                    Some(start) => ListKind::Ordered { start },
                    None => ListKind::Unordered,
                },
                items: Vec::new(),
            }),
            Tag::Item => self.containers.push(Container::Item(Vec::new())),
            Tag::CodeBlock(kind) => {
                self.code_block = Some((language_hint(kind), String::new()));
            }
            Tag::Emphasis => self.open_inline(InlineFrame::Emphasis),
            Tag::Strong => self.open_inline(InlineFrame::Strong),
            Tag::Strikethrough => self.open_inline(InlineFrame::Strikethrough),
            Tag::Link {
                dest_url, title, ..
            } => self.open_inline(InlineFrame::Link {
                destination: dest_url.into_string(),
                title: title.into_string(),
            }),
            Tag::Image {
                dest_url, title, ..
            } => self.open_inline(InlineFrame::Image {
                source: dest_url.into_string(),
                title: title.into_string(),
            }),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::HtmlBlock => {
                self.close_inline_block();
            }
            TagEnd::BlockQuote(_) => {
                self.close_implicit_paragraph();
                if let Some(Container::Quote(blocks)) = self.containers.pop() {
                    self.push_block(Block::Quote(blocks));
                }
            }
            TagEnd::List(_) => {
                if let Some(Container::List { kind, items }) = self.containers.pop() {
                    self.push_block(Block::List { kind, items });
                }
            }
            TagEnd::Item => {
                self.close_implicit_paragraph();
                if let Some(Container::Item(blocks)) = self.containers.pop() {
                    if let Some(Container::List { items, .. }) = self.containers.last_mut() {
                        items.push(blocks);
                    }
                }
            }
            TagEnd::CodeBlock => {
                if let Some((language, mut text)) = self.code_block.take() {
                    if text.ends_with('\n') {
                        text.pop();
                    }
                    self.push_block(Block::CodeBlock { language, text });
                }
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Link
            | TagEnd::Image => self.close_inline_frame(),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_implicit_paragraph();
        self.top
    }

    /// Inline accumulator for the innermost open frame, opening an implicit
    /// block root when needed (tight list items, stray inline HTML).
    fn sink(&mut self) -> &mut Vec<Inline> {
        if self.inline_frames.is_empty() {
            self.inline_frames.push((None, Vec::new()));
        }
        let last = self.inline_frames.len() - 1;
        &mut self.inline_frames[last].1
    }

    fn open_inline(&mut self, frame: InlineFrame) {
        self.sink();
        self.inline_frames.push((Some(frame), Vec::new()));
    }

    fn close_inline_frame(&mut self) {
        let Some((frame, children)) = self.inline_frames.pop() else {
            return;
        };
        let node = match frame {
            Some(InlineFrame::Emphasis) => Inline::Emphasis(children),
            Some(InlineFrame::Strong) => Inline::Strong(children),
            Some(InlineFrame::Strikethrough) => Inline::Strikethrough(children),
            Some(InlineFrame::Link { destination, title }) => Inline::Link {
                destination,
                title,
                rel: LINK_REL.to_string(),
                opens_new_context: true,
                children,
            },
            Some(InlineFrame::Image { source, title }) => Inline::Image {
                alt: Inline::collect_text(&children),
                source,
                title,
                width_bounded: true,
            },
            None => {
                // Block root popped without a matching frame; put it back.
                self.inline_frames.push((None, children));
                return;
            }
        };
        self.sink().push(node);
    }

    /// Close the current block's inline accumulation into a paragraph or
    /// heading, unwinding any inline frames a malformed stream left open.
    fn close_inline_block(&mut self) {
        while self.inline_frames.len() > 1 {
            self.close_inline_frame();
        }
        let Some((_, inlines)) = self.inline_frames.pop() else {
            return;
        };
        if inlines.is_empty() && self.heading.is_none() {
            return;
        }
        let block = match self.heading.take() {
            Some(level) => Block::Heading {
                level,
                content: inlines,
            },
            None => Block::Paragraph(inlines),
        };
        self.push_block(block);
    }

    fn close_implicit_paragraph(&mut self) {
        if !self.inline_frames.is_empty() {
            self.close_inline_block();
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.containers.last_mut() {
            Some(Container::Quote(blocks) | Container::Item(blocks)) => blocks.push(block),
            _ => self.top.push(block),
        }
    }
}
