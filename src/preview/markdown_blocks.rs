//! Markdown block grouping for the rendering pipeline
//!
//! The pulldown-cmark event stream is scanned once. Events belonging to a
//! construct with a custom renderer (code fences, tables, headings, links)
//! are gathered into a [`Block`], handed to a render callback, and replaced
//! by the HTML it returns. Everything else passes through untouched and is
//! rendered by pulldown-cmark's default HTML writer.
//!
//! Constructs nest: a link inside a heading or table cell is replaced first,
//! and its HTML becomes part of the enclosing block.

use pulldown_cmark::{html, Alignment, CodeBlockKind, CowStr, Event, Options, Tag, TagEnd};

/// Parser options shared by the render pass and the TOC pass
pub fn markdown_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_FOOTNOTES);
    options
}

/// Text carried by an event when flattening a heading to plain text
pub(crate) fn plain_text<'e>(event: &'e Event<'_>) -> Option<&'e str> {
    match event {
        Event::Text(text) | Event::Code(text) => Some(text),
        _ => None,
    }
}

/// Block types with an entry in the dispatch table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Code fence labelled `chart`
    Chart,
    /// Code fence in a runnable language
    ExecutableCode,
    /// Any other code block
    Code,
    Table,
    Heading,
    Link,
}

/// Languages that get the runnable code chrome
pub const EXECUTABLE_LANGUAGES: &[&str] = &["javascript", "js", "typescript", "ts", "html", "css"];

/// A construct gathered from the event stream
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Fenced or indented code
    CodeFence {
        /// First word of the fence info string
        lang: Option<String>,
        code: String,
    },

    Table {
        alignments: Vec<Alignment>,
        /// Rendered inner HTML of each header cell
        head: Vec<String>,
        /// Rendered inner HTML of each body cell
        rows: Vec<Vec<String>>,
    },

    Heading {
        level: u8,
        /// Plain text, the input of the anchor generator
        text: String,
        inner_html: String,
    },

    Link {
        href: String,
        title: String,
        inner_html: String,
    },
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self {
            Block::CodeFence { lang: Some(lang), .. } if lang.eq_ignore_ascii_case("chart") => {
                BlockKind::Chart
            }
            Block::CodeFence { lang: Some(lang), .. }
                if EXECUTABLE_LANGUAGES.iter().any(|l| lang.eq_ignore_ascii_case(l)) =>
            {
                BlockKind::ExecutableCode
            }
            Block::CodeFence { .. } => BlockKind::Code,
            Block::Table { .. } => BlockKind::Table,
            Block::Heading { .. } => BlockKind::Heading,
            Block::Link { .. } => BlockKind::Link,
        }
    }

    /// Whether the rendered HTML sits inside a paragraph
    fn is_inline(&self) -> bool {
        matches!(self, Block::Link { .. })
    }
}

enum FrameKind {
    Code(Option<String>),
    Table {
        alignments: Vec<Alignment>,
        head: Vec<String>,
        rows: Vec<Vec<String>>,
        row: Vec<String>,
    },
    Heading(u8),
    Link { href: String, title: String },
}

/// A construct still being gathered
struct Frame<'a> {
    kind: FrameKind,
    events: Vec<Event<'a>>,
    text: String,
}

impl<'a> Frame<'a> {
    fn new(kind: FrameKind) -> Self {
        Self {
            kind,
            events: Vec::new(),
            text: String::new(),
        }
    }

    fn into_block(self) -> Block {
        match self.kind {
            FrameKind::Code(lang) => Block::CodeFence {
                lang,
                code: self.text,
            },
            FrameKind::Table {
                alignments,
                head,
                rows,
                ..
            } => Block::Table {
                alignments,
                head,
                rows,
            },
            FrameKind::Heading(level) => Block::Heading {
                level,
                text: self.text,
                inner_html: events_to_html(self.events),
            },
            FrameKind::Link { href, title } => Block::Link {
                href,
                title,
                inner_html: events_to_html(self.events),
            },
        }
    }
}

/// Render a run of events with the default HTML writer
pub fn events_to_html<'a>(events: impl IntoIterator<Item = Event<'a>>) -> String {
    let mut out = String::new();
    html::push_html(&mut out, events.into_iter());
    out
}

fn fence_language(kind: &CodeBlockKind<'_>) -> Option<String> {
    match kind {
        CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
        CodeBlockKind::Indented => None,
    }
}

/// Replace every custom-rendered construct in `events` with the HTML produced
/// by `render`
pub fn fold_blocks<'a, I, F>(events: I, mut render: F) -> Vec<Event<'a>>
where
    I: IntoIterator<Item = Event<'a>>,
    F: FnMut(&Block) -> String,
{
    let mut output: Vec<Event<'a>> = Vec::new();
    let mut stack: Vec<Frame<'a>> = Vec::new();

    for event in events {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                stack.push(Frame::new(FrameKind::Code(fence_language(&kind))));
            }
            Event::Start(Tag::Table(alignments)) => {
                stack.push(Frame::new(FrameKind::Table {
                    alignments,
                    head: Vec::new(),
                    rows: Vec::new(),
                    row: Vec::new(),
                }));
            }
            Event::Start(Tag::Heading { level, .. }) => {
                stack.push(Frame::new(FrameKind::Heading(level as u8)));
            }
            Event::Start(Tag::Link {
                dest_url, title, ..
            }) => {
                stack.push(Frame::new(FrameKind::Link {
                    href: dest_url.to_string(),
                    title: title.to_string(),
                }));
            }

            // Table structure is tracked in the frame itself
            Event::Start(Tag::TableHead | Tag::TableRow | Tag::TableCell) => {}
            Event::End(TagEnd::TableCell) => {
                if let Some(frame) = stack.last_mut() {
                    let cell = events_to_html(std::mem::take(&mut frame.events));
                    if let FrameKind::Table { row, .. } = &mut frame.kind {
                        row.push(cell);
                    }
                }
            }
            Event::End(TagEnd::TableHead) => {
                if let Some(Frame {
                    kind: FrameKind::Table { head, row, .. },
                    ..
                }) = stack.last_mut()
                {
                    *head = std::mem::take(row);
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some(Frame {
                    kind: FrameKind::Table { rows, row, .. },
                    ..
                }) = stack.last_mut()
                {
                    rows.push(std::mem::take(row));
                }
            }

            Event::End(TagEnd::CodeBlock | TagEnd::Table | TagEnd::Heading(_) | TagEnd::Link) => {
                let Some(frame) = stack.pop() else {
                    continue;
                };
                let text = frame.text.clone();
                let block = frame.into_block();
                let mut html = render(&block);

                let replacement = if block.is_inline() {
                    Event::InlineHtml(CowStr::from(html))
                } else {
                    html.push('\n');
                    Event::Html(CowStr::from(html))
                };

                match stack.last_mut() {
                    Some(parent) => {
                        parent.text.push_str(&text);
                        parent.events.push(replacement);
                    }
                    None => output.push(replacement),
                }
            }

            event => match stack.last_mut() {
                Some(frame) => {
                    if let Some(text) = plain_text(&event) {
                        frame.text.push_str(text);
                    }
                    frame.events.push(event);
                }
                None => output.push(event),
            },
        }
    }

    // The parser always balances tags; anything left is passed through as-is
    for frame in stack {
        output.extend(frame.events);
    }

    output
}
