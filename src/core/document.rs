//! Document records and export snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::preview::toc::extract_toc;

pub const UNTITLED: &str = "Untitled Document";

/// A titled, tagged markdown record
///
/// Values handed out by the store are detached copies; changing one has no
/// effect until it is saved again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Primary key; empty until assigned by the caller or the store
    #[serde(default)]
    pub id: String,
    pub title: String,
    /// Markdown source
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Ordered, duplicates allowed
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

/// The full export/import payload spanning both collections
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub drafts: Vec<Document>,
}

/// Generate a fresh document id
pub fn generate_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Document {
    /// Create a new document with a generated id
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_id(),
            title: title.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
            tags: Vec::new(),
            is_public: false,
        }
    }

    /// The starter document of a fresh editor session
    pub fn untitled() -> Self {
        Self::new(UNTITLED, "# New Document\n\nStart writing...")
    }

    /// Create a document titled after the first heading of its content
    pub fn from_markdown(content: impl Into<String>) -> Self {
        let content = content.into();
        let title = extract_toc(&content)
            .map(|entry| entry.text)
            .find(|text| !text.trim().is_empty())
            .unwrap_or_else(|| UNTITLED.to_string());
        Self::new(title.trim(), content)
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Bump `updated_at` to now without ever moving it backwards
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(Utc::now());
    }

    /// Case-insensitive substring match on title, content or any tag.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.title.to_lowercase().contains(needle)
            || self.content.to_lowercase().contains(needle)
            || self.tags.iter().any(|tag| tag.to_lowercase().contains(needle))
    }
}
