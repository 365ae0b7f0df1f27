//! Markdown to HTML rendering pipeline

use pulldown_cmark::{Event, Parser};
use tokio::sync::watch;

use super::block_renderer::{DispatchTable, RenderContext};
use super::links::LinkClassifier;
use super::markdown_blocks::{events_to_html, fold_blocks, markdown_options};
use super::toc::{extract_toc, Toc};
use crate::core::config::{AppConfig, PreviewSettings};

/// Shown in place of an empty document
pub const PLACEHOLDER: &str =
    "<div class=\"preview-placeholder\">Start typing markdown in the editor to see the preview...</div>";

/// Renders markdown to preview HTML through a block dispatch table.
///
/// Rendering is a pure function of the input and the renderer's settings;
/// failures inside a single block are rendered in place and never abort the
/// rest of the document.
pub struct MarkdownRenderer {
    breaks: bool,
    links: LinkClassifier,
    dispatch: DispatchTable,
}

impl MarkdownRenderer {
    pub fn new(settings: &PreviewSettings) -> Self {
        Self {
            breaks: settings.breaks,
            links: LinkClassifier::new(&settings.base_url),
            dispatch: DispatchTable::default(),
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchTable) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn dispatch_mut(&mut self) -> &mut DispatchTable {
        &mut self.dispatch
    }

    /// Pick up the rendering fields of changed preview settings
    pub fn apply_settings(&mut self, settings: &PreviewSettings) {
        self.breaks = settings.breaks;
        self.links = LinkClassifier::new(&settings.base_url);
    }

    /// Apply the preview section of a published settings change, if there is
    /// one. Returns whether anything was applied.
    pub fn sync_settings(&mut self, settings: &mut watch::Receiver<AppConfig>) -> bool {
        if !settings.has_changed().unwrap_or(false) {
            return false;
        }
        let preview = settings.borrow_and_update().preview.clone();
        self.apply_settings(&preview);
        true
    }

    pub fn render(&self, source: &str) -> String {
        if source.trim().is_empty() {
            return PLACEHOLDER.to_string();
        }

        let breaks = self.breaks;
        let events = Parser::new_ext(source, markdown_options()).map(move |event| match event {
            Event::SoftBreak if breaks => Event::HardBreak,
            event => event,
        });

        let ctx = RenderContext { links: &self.links };
        let events = fold_blocks(events, |block| self.dispatch.render(block, &ctx));
        events_to_html(events)
    }

    /// The outline of `source`, with ids matching [`render`](Self::render)
    pub fn toc<'a>(&self, source: &'a str) -> Toc<'a> {
        extract_toc(source)
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new(&PreviewSettings::default())
    }
}
