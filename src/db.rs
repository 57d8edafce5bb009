use crate::error::Result;
use crate::markdown;
use crate::models::{Author, Document, DocumentPatch, DocumentSource, NewDocument};
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// How long a connection waits for another writer before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const DOCUMENT_COLUMNS: &str =
    "id, title, content, folder, author, pinned, tags, created_at, updated_at";

/// Handle to the SQLite document store.
///
/// Constructed once at startup and shared by cloning. Every operation opens
/// its own short-lived connection; concurrency is left to SQLite's WAL mode.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: PathBuf,
}

impl Store {
    /// Open (and if needed create) the database and its `documents` table.
    /// The `settings` table belongs to [`crate::config::ConfigManager`].
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        create_schema(&conn)?;

        log::info!("Database initialized at {}", db_path.display());
        Ok(Self { db_path })
    }

    /// Get a database connection
    pub fn connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// Flush the write-ahead log back into the main database file.
    pub fn close(self) -> Result<()> {
        let conn = self.connection()?;
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        log::info!("Database closed: {}", self.db_path.display());
        Ok(())
    }

    /// All documents, pinned first, then most recently updated.
    pub fn get_documents(&self) -> Result<Vec<Document>> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT {} FROM documents ORDER BY pinned DESC, updated_at DESC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let docs = stmt
            .query_map([], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    pub fn get_documents_by_folder(&self, folder: &str) -> Result<Vec<Document>> {
        let conn = self.connection()?;
        let sql = format!(
            "SELECT {} FROM documents WHERE folder = ?1 ORDER BY pinned DESC, updated_at DESC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let docs = stmt
            .query_map(params![folder], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(docs)
    }

    /// Case-insensitive substring search over title, content and tags.
    pub fn search_documents(&self, query: &str) -> Result<Vec<Document>> {
        let conn = self.connection()?;
        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));
        let sql = format!(
            "SELECT {} FROM documents
             WHERE LOWER(title) LIKE ?1 ESCAPE '\\'
                OR LOWER(content) LIKE ?1 ESCAPE '\\'
                OR LOWER(tags) LIKE ?1 ESCAPE '\\'
             ORDER BY pinned DESC, updated_at DESC",
            DOCUMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let docs = stmt
            .query_map(params![pattern], row_to_document)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        log::debug!("Database search for {:?} matched {} documents", query, docs.len());
        Ok(docs)
    }

    /// Distinct folder names, alphabetically.
    pub fn get_folders(&self) -> Result<Vec<String>> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare("SELECT DISTINCT folder FROM documents ORDER BY folder ASC")?;
        let folders = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(folders)
    }

    pub fn get_document(&self, id: &str) -> Result<Option<Document>> {
        let conn = self.connection()?;
        fetch_document(&conn, id)
    }

    pub fn create_document(&self, doc: NewDocument) -> Result<Document> {
        let conn = self.connection()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = now();
        let tags = serde_json::to_string(&doc.tags)?;

        conn.execute(
            "INSERT INTO documents (id, title, content, folder, author, pinned, tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                id,
                doc.title,
                doc.content,
                doc.folder,
                doc.author.as_str(),
                doc.pinned,
                tags,
                format_timestamp(&now),
                format_timestamp(&now),
            ],
        )?;

        log::info!("Created document {} in folder {:?}", id, doc.folder);

        Ok(Document {
            preview: markdown::extract_preview(&doc.content),
            id,
            title: doc.title,
            content: doc.content,
            folder: doc.folder,
            author: doc.author,
            pinned: doc.pinned,
            tags: doc.tags,
            created_at: now,
            updated_at: now,
            source: DocumentSource::Database,
        })
    }

    /// Apply a partial update. Returns `None` if no such document exists.
    pub fn update_document(&self, id: &str, patch: DocumentPatch) -> Result<Option<Document>> {
        let mut conn = self.connection()?;
        // Take the write lock up front; a deferred read-then-write upgrade
        // fails immediately with SQLITE_BUSY instead of waiting.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut doc) = fetch_document(&tx, id)? else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(content) = patch.content {
            doc.preview = markdown::extract_preview(&content);
            doc.content = content;
        }
        if let Some(folder) = patch.folder {
            doc.folder = folder;
        }
        if let Some(author) = patch.author {
            doc.author = author;
        }
        if let Some(pinned) = patch.pinned {
            doc.pinned = pinned;
        }
        if let Some(tags) = patch.tags {
            doc.tags = tags;
        }
        doc.updated_at = now();

        tx.execute(
            "UPDATE documents SET
                title = ?1,
                content = ?2,
                folder = ?3,
                author = ?4,
                pinned = ?5,
                tags = ?6,
                updated_at = ?7
             WHERE id = ?8",
            params![
                doc.title,
                doc.content,
                doc.folder,
                doc.author.as_str(),
                doc.pinned,
                serde_json::to_string(&doc.tags)?,
                format_timestamp(&doc.updated_at),
                id,
            ],
        )?;
        tx.commit()?;

        log::info!("Updated document {}", id);
        Ok(Some(doc))
    }

    /// Returns whether a row was deleted.
    pub fn delete_document(&self, id: &str) -> Result<bool> {
        let conn = self.connection()?;
        let deleted = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        if deleted > 0 {
            log::info!("Deleted document {}", id);
        }
        Ok(deleted > 0)
    }
}

/// Create all database tables
fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            folder TEXT NOT NULL DEFAULT 'general',
            author TEXT NOT NULL DEFAULT 'system',
            pinned INTEGER NOT NULL DEFAULT 0,
            tags TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_folder
         ON documents(folder)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_rank
         ON documents(pinned DESC, updated_at DESC)",
        [],
    )?;

    log::info!("Database schema created successfully");
    Ok(())
}

fn fetch_document(conn: &Connection, id: &str) -> Result<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE id = ?1", DOCUMENT_COLUMNS);
    let doc = conn
        .query_row(&sql, params![id], row_to_document)
        .optional()?;
    Ok(doc)
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    let content: String = row.get(2)?;
    let author: String = row.get(4)?;
    let tags: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(Document {
        id: row.get(0)?,
        title: row.get(1)?,
        preview: markdown::extract_preview(&content),
        content,
        folder: row.get(3)?,
        author: author
            .parse::<Author>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, e.into()))?,
        pinned: row.get(5)?,
        tags: serde_json::from_str(&tags)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e)))?,
        created_at: parse_timestamp(7, &created_at)?,
        updated_at: parse_timestamp(8, &updated_at)?,
        source: DocumentSource::Database,
    })
}

/// Current time at the precision stored in the database.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width RFC 3339 so that text order equals time order.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
