//! Block rendering dispatch
//!
//! Every [`BlockKind`] maps to one [`BlockRenderer`] in a [`DispatchTable`].
//! The default table installs the preview's custom chrome for each kind;
//! callers can swap an entry with [`DispatchTable::register`] or drop it with
//! [`DispatchTable::unregister`] to get plain CommonMark output.

use std::collections::HashMap;

use pulldown_cmark::Alignment;
use thiserror::Error;
use uuid::Uuid;

use super::anchor::anchor;
use super::escape::escape_html;
use super::links::{LinkClassifier, LinkTarget};
use super::markdown_blocks::{Block, BlockKind};

/// Shared state for one render call
pub struct RenderContext<'a> {
    pub links: &'a LinkClassifier,
}

impl RenderContext<'_> {
    /// A fresh element id such as `chart-1b4e28ba2fa1...`
    pub fn block_id(&self, prefix: &str) -> String {
        format!("{prefix}-{}", Uuid::new_v4().simple())
    }
}

/// Renders one block type to HTML
pub trait BlockRenderer: Send + Sync {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String;
}

/// Errors contained to a single block
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{0}")]
    ChartJson(#[from] serde_json::Error),
    #[error("chart configuration is null")]
    ChartNull,
}

/// Mapping from block type to renderer
pub struct DispatchTable {
    renderers: HashMap<BlockKind, Box<dyn BlockRenderer>>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        let mut table = Self::empty();
        table.register(BlockKind::Chart, Box::new(ChartBlock));
        table.register(BlockKind::ExecutableCode, Box::new(ExecutableCodeBlock));
        table.register(BlockKind::Code, Box::new(PlainBlock));
        table.register(BlockKind::Table, Box::new(TableBlock));
        table.register(BlockKind::Heading, Box::new(HeadingBlock));
        table.register(BlockKind::Link, Box::new(LinkBlock));
        table
    }
}

impl DispatchTable {
    /// A table without entries; every block renders as plain CommonMark
    pub fn empty() -> Self {
        Self {
            renderers: HashMap::new(),
        }
    }

    /// Install a renderer, returning the one it replaces
    pub fn register(
        &mut self,
        kind: BlockKind,
        renderer: Box<dyn BlockRenderer>,
    ) -> Option<Box<dyn BlockRenderer>> {
        self.renderers.insert(kind, renderer)
    }

    pub fn unregister(&mut self, kind: BlockKind) -> Option<Box<dyn BlockRenderer>> {
        self.renderers.remove(&kind)
    }

    pub fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        match self.renderers.get(&block.kind()) {
            Some(renderer) => renderer.render(block, ctx),
            None => PlainBlock.render(block, ctx),
        }
    }
}

/// Plain CommonMark output for any block
pub struct PlainBlock;

impl BlockRenderer for PlainBlock {
    fn render(&self, block: &Block, _ctx: &RenderContext<'_>) -> String {
        match block {
            Block::CodeFence { lang, code } => format!(
                "<pre><code class=\"language-{}\">{}</code></pre>",
                escape_html(lang.as_deref().unwrap_or("text")),
                escape_html(code)
            ),
            Block::Table {
                alignments,
                head,
                rows,
            } => table_html(alignments, head, rows),
            Block::Heading {
                level, inner_html, ..
            } => format!("<h{level}>{inner_html}</h{level}>"),
            Block::Link {
                href,
                title,
                inner_html,
            } => format!(
                "<a href=\"{}\"{}>{inner_html}</a>",
                escape_html(href),
                title_attr(title)
            ),
        }
    }
}

/// `chart` fences: a container for the chart widget, or an inline error
pub struct ChartBlock;

impl ChartBlock {
    fn parse(code: &str) -> Result<serde_json::Value, RenderError> {
        let config: serde_json::Value = serde_json::from_str(code)?;
        if config.is_null() {
            return Err(RenderError::ChartNull);
        }
        Ok(config)
    }
}

impl BlockRenderer for ChartBlock {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        let Block::CodeFence { code, .. } = block else {
            return PlainBlock.render(block, ctx);
        };

        let config = match Self::parse(code) {
            Ok(config) => config,
            Err(err) => {
                tracing::debug!("Chart block failed to parse: {}", err);
                return format!(
                    "<div class=\"error-block\">Chart configuration error: {}</div>",
                    escape_html(&err.to_string())
                );
            }
        };

        let id = ctx.block_id("chart");
        let chart_type = config
            .get("type")
            .and_then(|t| t.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or("Chart");

        format!(
            concat!(
                "<div class=\"chart-container\" data-chart-id=\"{id}\">",
                "<div class=\"chart-header\">",
                "<span class=\"chart-type\">{chart_type}</span>",
                "<button class=\"chart-edit-btn\" data-chart-id=\"{id}\" title=\"Edit chart\">Edit</button>",
                "</div>",
                "<div id=\"{id}\" class=\"chart-canvas\" data-config=\"{config}\"></div>",
                "</div>"
            ),
            id = id,
            chart_type = escape_html(chart_type),
            config = escape_html(&config.to_string()),
        )
    }
}

/// Runnable-language fences: label, copy and run affordances. Nothing is
/// executed here; the buttons only carry the target element id.
pub struct ExecutableCodeBlock;

impl BlockRenderer for ExecutableCodeBlock {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        let Block::CodeFence {
            lang: Some(lang),
            code,
        } = block
        else {
            return PlainBlock.render(block, ctx);
        };

        let id = ctx.block_id("code");
        let label = escape_html(lang);
        let class = escape_html(&lang.to_ascii_lowercase());

        format!(
            concat!(
                "<div class=\"code-block-container\" data-block-id=\"{id}\">",
                "<div class=\"code-block-header\">",
                "<span class=\"language-label\">{label}</span>",
                "<div class=\"code-block-actions\">",
                "<button class=\"code-copy-btn\" data-target=\"{id}\" title=\"Copy code\">Copy</button>",
                "<button class=\"code-run-btn\" data-target=\"{id}\" data-language=\"{class}\" title=\"Run code\">Run</button>",
                "</div>",
                "</div>",
                "<pre><code id=\"{id}\" class=\"language-{class}\">{code}</code></pre>",
                "</div>"
            ),
            id = id,
            label = label,
            class = class,
            code = escape_html(code),
        )
    }
}

/// Tables wrapped in a horizontally scrollable container
pub struct TableBlock;

impl BlockRenderer for TableBlock {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        match block {
            Block::Table {
                alignments,
                head,
                rows,
            } => format!(
                "<div class=\"table-wrapper\">{}</div>",
                table_html(alignments, head, rows).replacen(
                    "<table>",
                    "<table class=\"markdown-table\">",
                    1
                )
            ),
            _ => PlainBlock.render(block, ctx),
        }
    }
}

/// Headings with an anchor id and a self-link
pub struct HeadingBlock;

impl BlockRenderer for HeadingBlock {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        let Block::Heading {
            level,
            text,
            inner_html,
        } = block
        else {
            return PlainBlock.render(block, ctx);
        };

        let id = escape_html(&anchor(text));
        format!(
            "<h{level} id=\"{id}\" class=\"heading-{level}\"><a href=\"#{id}\" class=\"heading-anchor\" aria-hidden=\"true\">#</a>{inner_html}</h{level}>"
        )
    }
}

/// Links, with external ones opening in a new context
pub struct LinkBlock;

impl BlockRenderer for LinkBlock {
    fn render(&self, block: &Block, ctx: &RenderContext<'_>) -> String {
        let Block::Link {
            href,
            title,
            inner_html,
        } = block
        else {
            return PlainBlock.render(block, ctx);
        };

        match ctx.links.classify(href) {
            LinkTarget::External => format!(
                "<a href=\"{}\"{} target=\"_blank\" rel=\"noopener noreferrer\" class=\"external-link\">{inner_html} <span class=\"external-link-icon\">↗</span></a>",
                escape_html(href),
                title_attr(title)
            ),
            LinkTarget::Internal => PlainBlock.render(block, ctx),
        }
    }
}

fn title_attr(title: &str) -> String {
    if title.is_empty() {
        String::new()
    } else {
        format!(" title=\"{}\"", escape_html(title))
    }
}

fn table_html(alignments: &[Alignment], head: &[String], rows: &[Vec<String>]) -> String {
    let mut out = String::from("<table><thead><tr>");
    for (i, cell) in head.iter().enumerate() {
        push_cell(&mut out, "th", alignments.get(i), cell);
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for (i, cell) in row.iter().enumerate() {
            push_cell(&mut out, "td", alignments.get(i), cell);
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

fn push_cell(out: &mut String, tag: &str, alignment: Option<&Alignment>, inner_html: &str) {
    let style = match alignment {
        Some(Alignment::Left) => " style=\"text-align: left\"",
        Some(Alignment::Center) => " style=\"text-align: center\"",
        Some(Alignment::Right) => " style=\"text-align: right\"",
        Some(Alignment::None) | None => "",
    };
    out.push_str(&format!("<{tag}{style}>{inner_html}</{tag}>"));
}
