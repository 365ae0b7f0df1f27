//! Inkdraft - local-first markdown documents with live HTML preview
//!
//! Documents and autosaved drafts are kept in a local SQLite database; the
//! preview module turns markdown into HTML with heading anchors, classified
//! links, and custom rendering for chart, code, and table blocks.

pub mod core;
pub mod preview;

pub use crate::core::config::AppConfig;
pub use crate::core::document::{Document, Snapshot};
pub use crate::core::drafts::DraftManager;
pub use crate::core::error::{StoreError, StoreResult};
pub use crate::core::session::EditorSession;
pub use crate::core::settings::SettingsBus;
pub use crate::core::store::DocumentStore;
pub use crate::preview::{anchor, extract_toc, MarkdownRenderer, TocEntry};
