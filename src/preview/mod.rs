//! Markdown preview: HTML rendering, heading anchors and table of contents

mod anchor;
pub mod block_renderer;
pub mod escape;
pub mod links;
pub mod markdown_blocks;
pub mod pipeline;
pub mod toc;

pub use anchor::anchor;
pub use block_renderer::{BlockRenderer, DispatchTable, RenderContext, RenderError};
pub use links::{LinkClassifier, LinkTarget};
pub use markdown_blocks::{Block, BlockKind};
pub use pipeline::{MarkdownRenderer, PLACEHOLDER};
pub use toc::{extract_toc, Toc, TocEntry};
