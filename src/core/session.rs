//! Editor session state
//!
//! Holds the in-memory document being edited. Every edit is published on a
//! watch channel that feeds the autosave timer; loading a different document
//! replaces the buffer without counting as an edit.

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::document::Document;
use super::drafts::DraftManager;
use super::error::StoreResult;
use super::store::DocumentStore;

pub const WELCOME: &str = "# Welcome to Inkdraft\n\n\
Start writing your markdown here...\n\n\
```javascript\nconsole.log(\"Hello World!\");\n```\n\n\
## Features\n\n\
- Live preview\n\
- Charts\n\
- Local storage\n\
- Dark mode\n";

pub struct EditorSession {
    current: Document,
    modified: bool,
    last_saved: Option<DateTime<Utc>>,
    edits: watch::Sender<Document>,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// Start a session on the welcome document
    pub fn new() -> Self {
        let mut document = Document::untitled();
        document.content = WELCOME.to_string();
        Self::with_document(document)
    }

    pub fn with_document(document: Document) -> Self {
        let (edits, _rx) = watch::channel(document.clone());
        Self {
            current: document,
            modified: false,
            last_saved: None,
            edits,
        }
    }

    pub fn document(&self) -> &Document {
        &self.current
    }

    pub fn title(&self) -> &str {
        &self.current.title
    }

    pub fn content(&self) -> &str {
        &self.current.content
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn last_saved(&self) -> Option<DateTime<Utc>> {
        self.last_saved
    }

    /// Edits published by this session, for the autosave timer
    pub fn subscribe(&self) -> watch::Receiver<Document> {
        self.edits.subscribe()
    }

    /// Content changed in the editing widget
    pub fn update_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        if self.current.content == content {
            return;
        }
        self.current.content = content;
        self.modified = true;
        self.edits.send_replace(self.current.clone());
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.current.title = title.into();
        self.modified = true;
        self.edits.send_replace(self.current.clone());
    }

    /// Replace the buffer with another document. Subscribers see the new value
    /// but are not notified, so autosave does not treat it as an edit.
    pub fn set_document(&mut self, document: Document) {
        self.last_saved = Some(document.updated_at);
        self.current = document;
        self.modified = false;
        let replacement = self.current.clone();
        self.edits.send_if_modified(|value| {
            *value = replacement;
            false
        });
    }

    pub fn new_document(&mut self) {
        self.set_document(Document::untitled());
        self.last_saved = None;
    }

    /// Load a stored document into the session. Returns `false` if it does not exist.
    pub async fn open(&mut self, store: &DocumentStore, id: &str) -> StoreResult<bool> {
        match store.get(id).await? {
            Some(document) => {
                tracing::info!("Opened document: {}", document.title);
                self.set_document(document);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist the current buffer and clear the modified flag
    pub async fn save(&mut self, store: &DocumentStore) -> StoreResult<String> {
        let mut document = self.current.clone();
        document.touch();

        let id = store.save(&document).await?;
        document.id = id.clone();
        self.last_saved = Some(document.updated_at);
        self.current = document;
        self.modified = false;
        Ok(id)
    }

    /// Load the most recent draft under its owner's id. Returns `false` if
    /// there is none.
    pub async fn restore_draft(&mut self, drafts: &DraftManager) -> StoreResult<bool> {
        let Some(mut draft) = drafts.recent_draft().await? else {
            return Ok(false);
        };
        if let Some(owner) = DraftManager::owner_id(&draft.id) {
            draft.id = owner.to_string();
        }
        self.set_document(draft);
        // recovered content has not been saved as a document yet
        self.modified = true;
        self.last_saved = None;
        Ok(true)
    }
}
