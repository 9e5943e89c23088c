mod render;
mod tree;

pub use render::render_markdown;
pub use tree::{Block, Inline, ListKind, LINK_REL};
