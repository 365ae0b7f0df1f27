//! Draft autosave and retention
//!
//! Drafts live in their own collection under `draft-<owner id>` (or
//! `draft-<millis>` for documents without an id), so they never collide with
//! stored documents. Cleanup keeps the most recently updated drafts and is
//! best-effort: failures are logged and never reach the caller.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use super::config::{AppConfig, AutosaveConfig};
use super::document::Document;
use super::error::StoreResult;
use super::store::DocumentStore;

pub const DRAFT_PREFIX: &str = "draft-";
pub const DEFAULT_RETENTION: usize = 10;
const MIN_INTERVAL_MS: u64 = 100;

pub struct DraftManager {
    store: Arc<DocumentStore>,
    retention: usize,
}

impl DraftManager {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self {
            store,
            retention: DEFAULT_RETENTION,
        }
    }

    pub fn from_config(store: Arc<DocumentStore>, config: &AutosaveConfig) -> Self {
        Self::new(store).with_retention(config.draft_retention)
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention;
        self
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    /// Draft id for a document
    pub fn draft_id(document: &Document) -> String {
        if document.id.is_empty() {
            format!("{DRAFT_PREFIX}{}", Utc::now().timestamp_millis())
        } else {
            format!("{DRAFT_PREFIX}{}", document.id)
        }
    }

    /// Owner document id encoded in a draft id
    pub fn owner_id(draft_id: &str) -> Option<&str> {
        draft_id
            .strip_prefix(DRAFT_PREFIX)
            .filter(|owner| !owner.is_empty())
    }

    /// Store a copy of `document` in the drafts collection
    pub async fn save_draft(&self, document: &Document) -> StoreResult<String> {
        let draft = Document {
            id: Self::draft_id(document),
            ..document.clone()
        };
        let id = self.store.put_draft(&draft).await?;
        tracing::debug!("Saved draft: {}", id);
        Ok(id)
    }

    /// The most recently updated draft, if any
    pub async fn recent_draft(&self) -> StoreResult<Option<Document>> {
        self.store.recent_draft().await
    }

    pub async fn discard(&self, draft_id: &str) -> StoreResult<()> {
        self.store.delete_draft(draft_id).await
    }

    /// Delete every draft beyond the retention limit, newest kept
    pub async fn cleanup(&self) {
        let drafts = match self.store.list_drafts().await {
            Ok(drafts) => drafts,
            Err(e) => {
                tracing::warn!("Draft cleanup failed: {}", e);
                return;
            }
        };
        if drafts.len() <= self.retention {
            return;
        }

        let stale: Vec<String> = drafts
            .into_iter()
            .skip(self.retention)
            .map(|draft| draft.id)
            .collect();
        match self.store.delete_drafts(&stale).await {
            Ok(()) => tracing::debug!("Removed {} stale drafts", stale.len()),
            Err(e) => tracing::warn!("Draft cleanup failed: {}", e),
        }
    }

    /// Run [`cleanup`](Self::cleanup) in the background without waiting for it
    pub fn spawn_cleanup(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            manager.cleanup().await;
        });
    }

    /// Periodically save the latest edited document as a draft.
    ///
    /// A tick saves only if `edits` changed since the previous save, stamping
    /// the draft with the save time. Autosave settings are re-read whenever
    /// `settings` publishes. Once the editor side of `edits` is dropped, any
    /// unsaved edit is written out and the loop returns.
    pub async fn run_autosave(
        self: Arc<Self>,
        mut edits: watch::Receiver<Document>,
        mut settings: watch::Receiver<AppConfig>,
    ) {
        let mut autosave = settings.borrow_and_update().autosave.clone();
        let mut ticker = ticker_from_now(autosave.interval_ms);
        let mut settings_open = true;
        let mut dirty = false;

        tracing::info!(interval_ms = autosave.interval_ms, "Autosave started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if dirty && autosave.enabled {
                        self.save_latest(&edits).await;
                        dirty = false;
                    }
                }
                changed = edits.changed() => {
                    if changed.is_err() {
                        if dirty && autosave.enabled {
                            self.save_latest(&edits).await;
                        }
                        break;
                    }
                    dirty = true;
                }
                changed = settings.changed(), if settings_open => {
                    if changed.is_err() {
                        settings_open = false;
                        continue;
                    }
                    let next = settings.borrow_and_update().autosave.clone();
                    if next.interval_ms != autosave.interval_ms {
                        ticker = ticker_from_now(next.interval_ms);
                    }
                    autosave = next;
                }
            }
        }
        tracing::info!("Autosave stopped");
    }

    async fn save_latest(self: &Arc<Self>, edits: &watch::Receiver<Document>) {
        let mut document = edits.borrow().clone();
        document.touch();
        if let Err(e) = self.save_draft(&document).await {
            tracing::warn!("Autosave failed: {}", e);
        }
        self.spawn_cleanup();
    }
}

fn period(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.max(MIN_INTERVAL_MS))
}

/// First tick one full period from now
fn ticker_from_now(interval_ms: u64) -> Interval {
    let period = period(interval_ms);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::EditorSession;
    use chrono::{Duration as ChronoDuration, TimeZone};

    async fn manager() -> Arc<DraftManager> {
        let store = Arc::new(DocumentStore::in_memory());
        store.init().await.unwrap();
        Arc::new(DraftManager::new(store))
    }

    #[test]
    fn test_draft_ids() {
        let doc = Document::new("t", "c");
        assert_eq!(DraftManager::draft_id(&doc), format!("draft-{}", doc.id));

        let mut anonymous = doc.clone();
        anonymous.id.clear();
        let id = DraftManager::draft_id(&anonymous);
        assert!(id.strip_prefix("draft-").unwrap().parse::<i64>().is_ok());

        assert_eq!(DraftManager::owner_id("draft-abc"), Some("abc"));
        assert_eq!(DraftManager::owner_id("draft-"), None);
        assert_eq!(DraftManager::owner_id("abc"), None);
    }

    #[tokio::test]
    async fn test_save_draft_leaves_documents_alone() {
        let manager = manager().await;
        let doc = Document::new("t", "work in progress");

        let id = manager.save_draft(&doc).await.unwrap();
        assert_eq!(id, format!("draft-{}", doc.id));
        assert!(manager.store.get(&doc.id).await.unwrap().is_none());
        assert!(manager.store.list().await.unwrap().is_empty());

        let draft = manager.store.get_draft(&id).await.unwrap().unwrap();
        assert_eq!(draft.content, "work in progress");
    }

    #[tokio::test]
    async fn test_autosave_cycles_supersede_the_draft() {
        let manager = manager().await;
        let mut doc = Document::new("t", "v1");
        manager.save_draft(&doc).await.unwrap();
        doc.content = "v2".to_string();
        doc.touch();
        manager.save_draft(&doc).await.unwrap();

        let drafts = manager.store.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].content, "v2");
    }

    #[tokio::test]
    async fn test_recent_draft() {
        let manager = manager().await;
        assert!(manager.recent_draft().await.unwrap().is_none());

        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for (i, title) in ["old", "newest", "middle"].iter().enumerate() {
            let mut doc = Document::new(*title, "");
            doc.updated_at = base
                + ChronoDuration::minutes(match i {
                    0 => 1,
                    1 => 3,
                    _ => 2,
                });
            manager.save_draft(&doc).await.unwrap();
        }

        assert_eq!(manager.recent_draft().await.unwrap().unwrap().title, "newest");
    }

    #[tokio::test]
    async fn test_cleanup_keeps_ten_most_recent() {
        let manager = manager().await;
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        for i in 0..15 {
            let mut doc = Document::new(format!("draft {i}"), "");
            doc.updated_at = base + ChronoDuration::seconds(i);
            manager.save_draft(&doc).await.unwrap();
        }

        manager.cleanup().await;

        let titles: Vec<_> = manager
            .store
            .list_drafts()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.title)
            .collect();
        let expected: Vec<_> = (5..15).rev().map(|i| format!("draft {i}")).collect();
        assert_eq!(titles, expected);
    }

    #[tokio::test]
    async fn test_cleanup_under_limit_is_noop() {
        let manager = manager().await;
        for i in 0..3 {
            manager.save_draft(&Document::new(format!("{i}"), "")).await.unwrap();
        }
        manager.cleanup().await;
        assert_eq!(manager.store.list_drafts().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cleanup_swallows_errors() {
        let store = Arc::new(DocumentStore::in_memory());
        let manager = DraftManager::new(Arc::clone(&store));
        // not initialised: the failure is logged and recorded only
        manager.cleanup().await;
        assert!(store.last_error().is_some());
    }

    #[tokio::test]
    async fn test_discard() {
        let manager = manager().await;
        let id = manager.save_draft(&Document::new("t", "")).await.unwrap();
        manager.discard(&id).await.unwrap();
        assert!(manager.recent_draft().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_saves_edits_on_tick() {
        let manager = manager().await;
        let mut config = AppConfig::default();
        config.autosave.interval_ms = 1000;
        let (settings_tx, settings_rx) = watch::channel(config);
        let doc = Document::new("t", "first");
        let (edits_tx, edits_rx) = watch::channel(doc.clone());

        let task = tokio::spawn(Arc::clone(&manager).run_autosave(edits_rx, settings_rx));

        // nothing edited yet
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(manager.recent_draft().await.unwrap().is_none());

        edits_tx.send_modify(|d| d.content = "edited".to_string());
        tokio::time::sleep(Duration::from_millis(1000)).await;
        let draft = manager.recent_draft().await.unwrap().unwrap();
        assert_eq!(draft.id, format!("draft-{}", doc.id));
        assert_eq!(draft.content, "edited");

        // disabled autosave leaves the draft alone
        settings_tx.send_modify(|c| c.autosave.enabled = false);
        edits_tx.send_modify(|d| d.content = "ignored".to_string());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(manager.recent_draft().await.unwrap().unwrap().content, "edited");

        drop(edits_tx);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_stamps_drafts_with_save_time() {
        let manager = manager().await;
        let settings = watch::channel(AppConfig::default()).1;

        let mut other = Document::new("Other", "older work");
        other.updated_at = Utc::now() - ChronoDuration::days(1);
        manager.save_draft(&other).await.unwrap();

        let mut stored = Document::new("Old", "saved long ago");
        stored.updated_at = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        manager.store.save(&stored).await.unwrap();

        let mut session = EditorSession::new();
        assert!(session.open(&manager.store, &stored.id).await.unwrap());
        let before = Utc::now();
        let task = tokio::spawn(Arc::clone(&manager).run_autosave(session.subscribe(), settings));

        session.update_content("typed just now");
        tokio::time::sleep(Duration::from_millis(5500)).await;

        let recent = manager.recent_draft().await.unwrap().unwrap();
        assert_eq!(recent.title, "Old");
        assert_eq!(recent.content, "typed just now");
        assert!(recent.updated_at >= before);

        // the fresh draft survives a tight retention
        let tight = DraftManager::new(Arc::clone(&manager.store)).with_retention(1);
        tight.cleanup().await;
        let drafts = manager.store.list_drafts().await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].content, "typed just now");

        drop(session);
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_flushes_pending_edit_on_close() {
        let manager = manager().await;
        let settings = watch::channel(AppConfig::default()).1;
        let doc = Document::new("t", "first");
        let (edits_tx, edits_rx) = watch::channel(doc.clone());

        let task = tokio::spawn(Arc::clone(&manager).run_autosave(edits_rx, settings));
        edits_tx.send_modify(|d| d.content = "last words".to_string());
        tokio::task::yield_now().await;
        drop(edits_tx);

        task.await.unwrap();
        let draft = manager.recent_draft().await.unwrap().unwrap();
        assert_eq!(draft.id, format!("draft-{}", doc.id));
        assert_eq!(draft.content, "last words");
    }
}
