//! Transactional local persistence for documents and drafts
//!
//! Both collections live in one SQLite database. Every multi-statement write
//! (document upsert with its tag index, bulk draft delete, import, clear) is a
//! single transaction, so a failed call leaves no partial state behind.
//!
//! The store owns a single connection behind an async mutex. Operations
//! suspend on the lock; no extra threads are spawned.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex as StdMutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::Mutex;

use super::config::AppConfig;
use super::document::{generate_id, Document, Snapshot};
use super::error::{StorageCause, StoreError, StoreResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    is_public INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_documents_title ON documents(title);
CREATE INDEX IF NOT EXISTS idx_documents_created_at ON documents(created_at);
CREATE INDEX IF NOT EXISTS idx_documents_updated_at ON documents(updated_at);
CREATE INDEX IF NOT EXISTS idx_documents_is_public ON documents(is_public);

CREATE TABLE IF NOT EXISTS document_tags (
    document_id TEXT NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    position INTEGER NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (document_id, position)
);
CREATE INDEX IF NOT EXISTS idx_document_tags_tag ON document_tags(tag);

CREATE TABLE IF NOT EXISTS drafts (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    tags TEXT NOT NULL DEFAULT '[]',
    is_public INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_drafts_title ON drafts(title);
CREATE INDEX IF NOT EXISTS idx_drafts_created_at ON drafts(created_at);
CREATE INDEX IF NOT EXISTS idx_drafts_updated_at ON drafts(updated_at);
";

const COLUMNS: &str = "id, title, content, created_at, updated_at, tags, is_public";

/// Where the database lives
#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::File(path) => write!(f, "{}", path.display()),
            Location::Memory => f.write_str(":memory:"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Documents,
    Drafts,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Documents => "documents",
            Collection::Drafts => "drafts",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Order {
    /// Store iteration order
    Insertion,
    /// `updated_at` descending, ties by insertion
    RecentFirst,
}

impl Order {
    fn clause(self) -> &'static str {
        match self {
            Order::Insertion => "seq ASC",
            Order::RecentFirst => "updated_at DESC, seq ASC",
        }
    }
}

/// Document store over the `documents` and `drafts` collections
pub struct DocumentStore {
    location: Location,
    conn: Mutex<Option<Connection>>,
    ready: AtomicBool,
    last_error: StdMutex<Option<String>>,
}

impl DocumentStore {
    /// Create a store backed by a database file. Call [`init`](Self::init) before use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::File(path.into()))
    }

    /// Create a store backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    /// Create a store at the configured database path
    pub fn from_config(config: &AppConfig) -> Self {
        Self::open(config.database_path())
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            conn: Mutex::new(None),
            ready: AtomicBool::new(false),
            last_error: StdMutex::new(None),
        }
    }

    /// Open the connection and create the schema. Calling it again is a no-op.
    pub async fn init(&self) -> StoreResult<()> {
        let mut guard = self.conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        match connect(&self.location) {
            Ok(conn) => {
                *guard = Some(conn);
                self.ready.store(true, Ordering::Release);
                self.clear_error();
                tracing::info!("Opened document store: {}", self.location);
                Ok(())
            }
            Err(source) => {
                let err = StoreError::Storage {
                    operation: "open document store",
                    source,
                };
                tracing::error!("Database initialization failed: {}", err);
                self.record_error(&err);
                Err(err)
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Message of the most recent failure, for passive display
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn record_error(&self, err: &StoreError) {
        *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(err.to_string());
    }

    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageCause>,
    {
        let mut guard = self.conn.lock().await;
        let result = match guard.as_mut() {
            Some(conn) => f(conn).map_err(|source| StoreError::Storage { operation, source }),
            None => Err(StoreError::NotReady),
        };
        drop(guard);

        if let Err(err) = &result {
            tracing::error!(operation, "{}", err);
            self.record_error(err);
        }
        result
    }

    /// Upsert a document by id, generating one if it is empty. Returns the id.
    pub async fn save(&self, document: &Document) -> StoreResult<String> {
        let id = self
            .with_conn("save document", |conn| {
                let tx = conn.transaction()?;
                let id = upsert(&tx, Collection::Documents, document)?;
                tx.commit()?;
                Ok(id)
            })
            .await?;
        tracing::debug!("Saved document: {}", id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> StoreResult<Option<Document>> {
        self.with_conn("get document", |conn| {
            select_one(conn, Collection::Documents, id)
        })
        .await
    }

    /// All documents, most recently updated first
    pub async fn list(&self) -> StoreResult<Vec<Document>> {
        self.with_conn("list documents", |conn| {
            select_all(conn, Collection::Documents, Order::RecentFirst)
        })
        .await
    }

    /// Remove a document. Unknown ids are ignored.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        self.with_conn("delete document", |conn| {
            conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
    }

    /// Case-insensitive substring search over title, content and tags.
    ///
    /// The query is matched as given, whitespace included; an empty query
    /// matches nothing.
    pub async fn search(&self, query: &str) -> StoreResult<Vec<Document>> {
        let needle = query.to_lowercase();
        self.with_conn("search documents", |conn| {
            if needle.is_empty() {
                return Ok(Vec::new());
            }
            let documents = select_all(conn, Collection::Documents, Order::Insertion)?;
            Ok(documents
                .into_iter()
                .filter(|doc| doc.matches(&needle))
                .collect())
        })
        .await
    }

    /// Documents carrying exactly `tag`, most recently updated first
    pub async fn find_by_tag(&self, tag: &str) -> StoreResult<Vec<Document>> {
        self.with_conn("find documents by tag", |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM documents d WHERE EXISTS \
                 (SELECT 1 FROM document_tags t WHERE t.document_id = d.id AND t.tag = ?1) \
                 ORDER BY {}",
                Order::RecentFirst.clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![tag], read_document)?;
            let documents = rows.collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(documents)
        })
        .await
    }

    /// Read both collections in one consistent transaction
    pub async fn export_snapshot(&self) -> StoreResult<Snapshot> {
        self.with_conn("export data", |conn| {
            let tx = conn.transaction()?;
            let documents = select_all(&tx, Collection::Documents, Order::Insertion)?;
            let drafts = select_all(&tx, Collection::Drafts, Order::Insertion)?;
            tx.commit()?;
            Ok(Snapshot { documents, drafts })
        })
        .await
    }

    /// Upsert every record of `snapshot`; either all of them apply or none do
    pub async fn import_snapshot(&self, snapshot: &Snapshot) -> StoreResult<()> {
        self.with_conn("import data", |conn| {
            let tx = conn.transaction()?;
            for document in &snapshot.documents {
                upsert(&tx, Collection::Documents, document)?;
            }
            for draft in &snapshot.drafts {
                upsert(&tx, Collection::Drafts, draft)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await?;

        tracing::info!(
            documents = snapshot.documents.len(),
            drafts = snapshot.drafts.len(),
            "Imported snapshot"
        );
        Ok(())
    }

    /// Empty both collections atomically
    pub async fn clear(&self) -> StoreResult<()> {
        self.with_conn("clear database", |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM document_tags", [])?;
            tx.execute("DELETE FROM documents", [])?;
            tx.execute("DELETE FROM drafts", [])?;
            tx.commit()?;
            Ok(())
        })
        .await?;
        tracing::info!("Cleared document store");
        Ok(())
    }

    /// Upsert a record into the drafts collection under its own id
    pub async fn put_draft(&self, draft: &Document) -> StoreResult<String> {
        self.with_conn("save draft", |conn| {
            let tx = conn.transaction()?;
            let id = upsert(&tx, Collection::Drafts, draft)?;
            tx.commit()?;
            Ok(id)
        })
        .await
    }

    pub async fn get_draft(&self, id: &str) -> StoreResult<Option<Document>> {
        self.with_conn("get draft", |conn| select_one(conn, Collection::Drafts, id))
            .await
    }

    /// All drafts, most recently updated first
    pub async fn list_drafts(&self) -> StoreResult<Vec<Document>> {
        self.with_conn("list drafts", |conn| {
            select_all(conn, Collection::Drafts, Order::RecentFirst)
        })
        .await
    }

    pub async fn recent_draft(&self) -> StoreResult<Option<Document>> {
        self.with_conn("get recent draft", |conn| {
            let sql = format!(
                "SELECT {COLUMNS} FROM drafts ORDER BY {} LIMIT 1",
                Order::RecentFirst.clause()
            );
            let draft = conn.query_row(&sql, [], read_document).optional()?;
            Ok(draft)
        })
        .await
    }

    pub async fn delete_draft(&self, id: &str) -> StoreResult<()> {
        self.delete_drafts(&[id.to_string()]).await
    }

    /// Remove several drafts in one transaction
    pub async fn delete_drafts(&self, ids: &[String]) -> StoreResult<()> {
        self.with_conn("delete drafts", |conn| {
            let tx = conn.transaction()?;
            {
                let mut stmt = tx.prepare("DELETE FROM drafts WHERE id = ?1")?;
                for id in ids {
                    stmt.execute(params![id])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

fn connect(location: &Location) -> Result<Connection, StorageCause> {
    let conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let conn = Connection::open(path)?;
            conn.busy_timeout(Duration::from_secs(5))?;
            conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))?;
            conn
        }
        Location::Memory => Connection::open_in_memory()?,
    };
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    conn.execute_batch(SCHEMA)?;
    Ok(conn)
}

fn to_nanos(ts: &DateTime<Utc>) -> Result<i64, StorageCause> {
    ts.timestamp_nanos_opt()
        .ok_or_else(|| StorageCause::TimestampOutOfRange(ts.to_rfc3339()))
}

fn read_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let tags: String = row.get(5)?;
    let tags = serde_json::from_str(&tags).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: DateTime::from_timestamp_nanos(row.get(3)?),
        updated_at: DateTime::from_timestamp_nanos(row.get(4)?),
        tags,
        is_public: row.get(6)?,
    })
}

/// Insert or replace a record by id. `updated_at` never moves backwards and
/// the original insertion position is kept.
fn upsert(conn: &Connection, collection: Collection, doc: &Document) -> Result<String, StorageCause> {
    let id = if doc.id.is_empty() {
        generate_id()
    } else {
        doc.id.clone()
    };
    let table = collection.table();
    let sql = format!(
        "INSERT INTO {table} ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
             title = excluded.title,
             content = excluded.content,
             created_at = excluded.created_at,
             updated_at = MAX({table}.updated_at, excluded.updated_at),
             tags = excluded.tags,
             is_public = excluded.is_public"
    );
    conn.execute(
        &sql,
        params![
            id,
            doc.title,
            doc.content,
            to_nanos(&doc.created_at)?,
            to_nanos(&doc.updated_at)?,
            serde_json::to_string(&doc.tags)?,
            doc.is_public,
        ],
    )?;

    if collection == Collection::Documents {
        conn.execute("DELETE FROM document_tags WHERE document_id = ?1", params![id])?;
        let mut stmt = conn.prepare_cached(
            "INSERT INTO document_tags (document_id, position, tag) VALUES (?1, ?2, ?3)",
        )?;
        for (position, tag) in doc.tags.iter().enumerate() {
            stmt.execute(params![id, position as i64, tag])?;
        }
    }

    Ok(id)
}

fn select_one(
    conn: &Connection,
    collection: Collection,
    id: &str,
) -> Result<Option<Document>, StorageCause> {
    let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = ?1", collection.table());
    let document = conn.query_row(&sql, params![id], read_document).optional()?;
    Ok(document)
}

fn select_all(
    conn: &Connection,
    collection: Collection,
    order: Order,
) -> Result<Vec<Document>, StorageCause> {
    let sql = format!(
        "SELECT {COLUMNS} FROM {} ORDER BY {}",
        collection.table(),
        order.clause()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], read_document)?;
    let documents = rows.collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};

    async fn ready_store() -> DocumentStore {
        let store = DocumentStore::in_memory();
        store.init().await.unwrap();
        store
    }

    fn doc_at(title: &str, content: &str, offset_secs: i64) -> Document {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut doc = Document::new(title, content);
        doc.created_at = base;
        doc.updated_at = base + ChronoDuration::seconds(offset_secs);
        doc
    }

    #[tokio::test]
    async fn test_operations_before_init_are_not_ready() {
        let store = DocumentStore::in_memory();
        assert!(!store.is_ready());

        let err = store.save(&Document::untitled()).await.unwrap_err();
        assert!(err.is_not_ready());
        assert!(store.list().await.unwrap_err().is_not_ready());
        assert!(store.search("").await.unwrap_err().is_not_ready());
        assert!(store.clear().await.unwrap_err().is_not_ready());
        assert_eq!(store.last_error().as_deref(), Some("document store is not ready"));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let store = ready_store().await;
        store.init().await.unwrap();
        assert!(store.is_ready());
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips() {
        let store = ready_store().await;
        let mut doc = Document::new("Notes", "# Notes\n\nbody").with_tags(["rust", "rust", "db"]);
        doc.is_public = true;

        let id = store.save(&doc).await.unwrap();
        assert_eq!(id, doc.id);

        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded, doc);
    }

    #[tokio::test]
    async fn test_save_without_id_generates_one() {
        let store = ready_store().await;
        let mut doc = Document::new("t", "c");
        doc.id.clear();

        let id = store.save(&doc).await.unwrap();
        assert!(!id.is_empty());
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "t");
        // the caller's value is left untouched
        assert!(doc.id.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_is_none() {
        let store = ready_store().await;
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_returned_documents_are_detached() {
        let store = ready_store().await;
        let doc = Document::new("t", "original");
        store.save(&doc).await.unwrap();

        let mut copy = store.get(&doc.id).await.unwrap().unwrap();
        copy.content = "changed".to_string();

        let again = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(again.content, "original");
    }

    #[tokio::test]
    async fn test_list_orders_by_updated_at_descending() {
        let store = ready_store().await;
        let a = doc_at("a", "", 10);
        let b = doc_at("b", "", 30);
        let c = doc_at("c", "", 20);
        for doc in [&a, &b, &c] {
            store.save(doc).await.unwrap();
        }

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, ["b", "c", "a"]);
    }

    #[tokio::test]
    async fn test_list_ties_keep_insertion_order() {
        let store = ready_store().await;
        let first = doc_at("first", "", 5);
        let second = doc_at("second", "", 5);
        store.save(&first).await.unwrap();
        store.save(&second).await.unwrap();
        // re-saving keeps the original insertion position
        store.save(&first).await.unwrap();

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, ["first", "second"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_fields_and_keeps_updated_at_monotonic() {
        let store = ready_store().await;
        let mut doc = doc_at("v1", "first", 60);
        store.save(&doc).await.unwrap();

        doc.title = "v2".to_string();
        doc.content = "second".to_string();
        doc.updated_at -= ChronoDuration::seconds(30);
        store.save(&doc).await.unwrap();

        let loaded = store.get(&doc.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "v2");
        assert_eq!(loaded.content, "second");
        assert_eq!(loaded.updated_at, doc.updated_at + ChronoDuration::seconds(30));
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = ready_store().await;
        let doc = Document::new("t", "c").with_tags(["x"]);
        store.save(&doc).await.unwrap();

        store.delete(&doc.id).await.unwrap();
        store.delete(&doc.id).await.unwrap();
        store.delete("never-existed").await.unwrap();
        assert!(store.get(&doc.id).await.unwrap().is_none());
        assert!(store.find_by_tag("x").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_matches_title_content_and_tags() {
        let store = ready_store().await;
        let by_title = Document::new("Rust Ownership", "borrowing");
        let by_content = Document::new("Misc", "Notes about OWNERSHIP rules");
        let by_tag = Document::new("Other", "nothing").with_tags(["ownership-model"]);
        let unrelated = Document::new("Cooking", "pasta").with_tags(["food"]);
        for doc in [&by_title, &by_content, &by_tag, &unrelated] {
            store.save(doc).await.unwrap();
        }

        let ids: Vec<_> = store
            .search("Ownership")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&by_title.id));
        assert!(ids.contains(&by_content.id));
        assert!(ids.contains(&by_tag.id));
        assert!(!ids.contains(&unrelated.id));
    }

    #[tokio::test]
    async fn test_empty_query_matches_nothing() {
        let store = ready_store().await;
        store.save(&Document::new("t", "c")).await.unwrap();
        assert!(store.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_whitespace_is_significant() {
        let store = ready_store().await;
        let bare = Document::new("world", "world");
        let spaced = Document::new("hello world", "");
        store.save(&bare).await.unwrap();
        store.save(&spaced).await.unwrap();

        let ids: Vec<_> = store
            .search(" World")
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, [spaced.id.clone()]);

        // whitespace-only queries are searched literally
        let ids: Vec<_> = store.search(" ").await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, [spaced.id]);
    }

    #[tokio::test]
    async fn test_find_by_tag_uses_exact_match() {
        let store = ready_store().await;
        let tagged = Document::new("a", "").with_tags(["draft", "rust"]);
        let partial = Document::new("b", "").with_tags(["rustacean"]);
        store.save(&tagged).await.unwrap();
        store.save(&partial).await.unwrap();

        let found = store.find_by_tag("rust").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, tagged.id);

        // re-saving rebuilds the index
        let retagged = tagged.clone().with_tags(["other"]);
        store.save(&retagged).await.unwrap();
        assert!(store.find_by_tag("rust").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_export_clear_import_restores() {
        let store = ready_store().await;
        let a = doc_at("a", "alpha", 1).with_tags(["t"]);
        let b = doc_at("b", "beta", 2);
        store.save(&a).await.unwrap();
        store.save(&b).await.unwrap();
        let mut draft = doc_at("a", "alpha edited", 3);
        draft.id = format!("draft-{}", a.id);
        store.put_draft(&draft).await.unwrap();

        let snapshot = store.export_snapshot().await.unwrap();
        assert_eq!(snapshot.documents.len(), 2);
        assert_eq!(snapshot.drafts.len(), 1);

        store.clear().await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.list_drafts().await.unwrap().is_empty());

        store.import_snapshot(&snapshot).await.unwrap();
        assert_eq!(store.export_snapshot().await.unwrap(), snapshot);
        assert_eq!(store.find_by_tag("t").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_survives_json() {
        let store = ready_store().await;
        store.save(&Document::new("t", "c").with_tags(["x"])).await.unwrap();
        let snapshot = store.export_snapshot().await.unwrap();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[tokio::test]
    async fn test_import_is_all_or_nothing() {
        let store = ready_store().await;
        let existing = Document::new("existing", "kept");
        store.save(&existing).await.unwrap();

        let mut unstorable = Document::new("bad", "");
        unstorable.updated_at = Utc.with_ymd_and_hms(3000, 1, 1, 0, 0, 0).unwrap();
        let snapshot = Snapshot {
            documents: vec![Document::new("new", "should not appear")],
            drafts: vec![unstorable],
        };

        let err = store.import_snapshot(&snapshot).await.unwrap_err();
        assert!(matches!(err, StoreError::Storage { operation: "import data", .. }));
        assert!(store.last_error().unwrap().contains("import data"));

        let titles: Vec<_> = store.list().await.unwrap().into_iter().map(|d| d.title).collect();
        assert_eq!(titles, ["existing"]);
        assert!(store.list_drafts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drafts_are_a_separate_keyspace() {
        let store = ready_store().await;
        let doc = Document::new("doc", "in documents");
        store.save(&doc).await.unwrap();
        let mut draft = doc.clone();
        draft.content = "in drafts".to_string();
        store.put_draft(&draft).await.unwrap();

        assert_eq!(store.get(&doc.id).await.unwrap().unwrap().content, "in documents");
        assert_eq!(store.get_draft(&doc.id).await.unwrap().unwrap().content, "in drafts");

        store.delete_draft(&doc.id).await.unwrap();
        assert!(store.get_draft(&doc.id).await.unwrap().is_none());
        assert!(store.get(&doc.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("docs.db");
        let doc = Document::new("durable", "content");

        {
            let store = DocumentStore::open(&path);
            store.init().await.unwrap();
            store.save(&doc).await.unwrap();
        }

        let store = DocumentStore::open(&path);
        store.init().await.unwrap();
        assert_eq!(store.get(&doc.id).await.unwrap().unwrap(), doc);
    }

    #[tokio::test]
    async fn test_unopenable_path_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path());

        let err = store.init().await.unwrap_err();
        assert!(matches!(err, StoreError::Storage { .. }));
        assert!(!store.is_ready());
        assert!(store.last_error().is_some());
        assert!(store.get("x").await.unwrap_err().is_not_ready());
    }
}
