//! Table of contents extraction
//!
//! A lexical pass over the markdown source, independent of rendering. It
//! shares parser options, heading text flattening and the anchor generator
//! with the renderer so outline ids match the rendered heading ids.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use serde::Serialize;

use super::anchor::anchor;
use super::markdown_blocks::{markdown_options, plain_text};

/// One heading in the outline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

/// Lazily yields the headings of a document in source order
pub struct Toc<'a> {
    parser: Parser<'a>,
}

/// Extract the outline of `source`. The result is consumed once; call again
/// to start over.
pub fn extract_toc(source: &str) -> Toc<'_> {
    Toc {
        parser: Parser::new_ext(source, markdown_options()),
    }
}

impl Iterator for Toc<'_> {
    type Item = TocEntry;

    fn next(&mut self) -> Option<TocEntry> {
        let level = loop {
            match self.parser.next()? {
                Event::Start(Tag::Heading { level, .. }) => break level as u8,
                _ => continue,
            }
        };

        let mut text = String::new();
        for event in self.parser.by_ref() {
            if let Event::End(TagEnd::Heading(_)) = event {
                break;
            }
            if let Some(fragment) = plain_text(&event) {
                text.push_str(fragment);
            }
        }

        let id = anchor(&text);
        Some(TocEntry { level, text, id })
    }
}
