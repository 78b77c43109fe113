use rusqlite::{Connection, Result as SqliteResult, params};
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

pub struct DocumentStore {
    conn: Connection,
}

#[derive(Debug)]
pub struct StoredDocument {
    pub uid: String,
    pub contributor: String,
    pub filename: String,
    pub insurer: Option<String>,
    pub asset_type: Option<String>,
    pub ocr_text: Option<String>,
    pub has_entities: bool,
    pub is_processed: bool,
}

#[derive(Debug)]
pub struct StoredExtraction {
    pub id: Option<i64>,
    pub document_uid: String,
    pub field: String,
    pub value: Option<String>,
    pub source_anchor: String,
    pub notes: String,
}

impl DocumentStore {
    /// Create a new document store with SQLite backend
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS documents (
                uid TEXT PRIMARY KEY,
                contributor TEXT NOT NULL,
                filename TEXT NOT NULL,
                insurer TEXT,
                asset_type TEXT,
                ocr_text TEXT,
                has_entities INTEGER NOT NULL DEFAULT 0,
                is_processed INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS field_extractions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_uid TEXT NOT NULL,
                field TEXT NOT NULL,
                value TEXT,
                source_anchor TEXT NOT NULL DEFAULT '',
                notes TEXT NOT NULL DEFAULT '',
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (document_uid) REFERENCES documents(uid) ON DELETE CASCADE
            )",
            [],
        )?;

        // Processed tracking, kept separate so reprocessing history survives
        conn.execute(
            "CREATE TABLE IF NOT EXISTS processed_documents (
                uid TEXT PRIMARY KEY,
                processed_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (uid) REFERENCES documents(uid)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_contributor ON documents(contributor)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_documents_is_processed ON documents(is_processed)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_extractions_document_uid
             ON field_extractions(document_uid)",
            [],
        )?;

        info!("Database initialized successfully");
        Ok(Self { conn })
    }

    /// Generate a unique ID from filename, date, and contributor
    pub fn generate_uid(filename: &str, date: &str, contributor: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(filename.as_bytes());
        hasher.update(date.as_bytes());
        hasher.update(contributor.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Insert or update a document
    pub fn upsert_document(&self, doc: &StoredDocument) -> SqliteResult<()> {
        self.conn.execute(
            "INSERT INTO documents
                (uid, contributor, filename, insurer, asset_type, ocr_text, has_entities, is_processed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(uid) DO UPDATE SET
                insurer = excluded.insurer,
                asset_type = excluded.asset_type,
                ocr_text = excluded.ocr_text,
                has_entities = excluded.has_entities",
            params![
                doc.uid,
                doc.contributor,
                doc.filename,
                doc.insurer,
                doc.asset_type,
                doc.ocr_text,
                doc.has_entities,
                doc.is_processed,
            ],
        )?;
        info!(uid = %doc.uid, "Document stored");
        Ok(())
    }

    /// Insert an extracted field for a document
    pub fn insert_extraction(&self, extraction: &StoredExtraction) -> SqliteResult<i64> {
        self.conn.execute(
            "INSERT INTO field_extractions
                (document_uid, field, value, source_anchor, notes)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                extraction.document_uid,
                extraction.field,
                extraction.value,
                extraction.source_anchor,
                extraction.notes,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(extraction_id = id, field = %extraction.field, "Extraction stored");
        Ok(id)
    }

    /// Drop all extracted fields for a document. Reprocessing a document
    /// replaces its extractions; without this they accumulate per run.
    pub fn clear_extractions_for_document(&self, document_uid: &str) -> SqliteResult<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM field_extractions WHERE document_uid = ?1",
            params![document_uid],
        )?;
        if deleted > 0 {
            info!(uid = %document_uid, deleted = deleted, "Stale extractions cleared");
        }
        Ok(deleted)
    }

    /// Mark a document as processed
    pub fn mark_document_as_processed(&self, uid: &str) -> SqliteResult<()> {
        self.conn.execute(
            "UPDATE documents SET is_processed = 1 WHERE uid = ?1",
            params![uid],
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO processed_documents (uid) VALUES (?1)",
            params![uid],
        )?;

        info!(uid = %uid, "Document marked as processed");
        Ok(())
    }

    /// Get all unprocessed documents
    pub fn get_unprocessed_documents(&self) -> SqliteResult<Vec<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, contributor, filename, insurer, asset_type, ocr_text, has_entities, is_processed
             FROM documents
             WHERE is_processed = 0
             ORDER BY created_at DESC",
        )?;

        let documents = stmt.query_map([], |row| Self::row_to_document(row))?;
        documents.collect()
    }

    /// Get document by UID
    pub fn get_document_by_uid(&self, uid: &str) -> SqliteResult<Option<StoredDocument>> {
        let mut stmt = self.conn.prepare(
            "SELECT uid, contributor, filename, insurer, asset_type, ocr_text, has_entities, is_processed
             FROM documents
             WHERE uid = ?1",
        )?;

        let mut rows = stmt.query(params![uid])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_document(row)?)),
            None => Ok(None),
        }
    }

    /// Get all extracted fields for a document, in insertion order
    pub fn get_extractions_for_document(
        &self,
        document_uid: &str,
    ) -> SqliteResult<Vec<StoredExtraction>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, document_uid, field, value, source_anchor, notes
             FROM field_extractions
             WHERE document_uid = ?1
             ORDER BY id",
        )?;

        let extractions = stmt.query_map(params![document_uid], |row| {
            Ok(StoredExtraction {
                id: Some(row.get(0)?),
                document_uid: row.get(1)?,
                field: row.get(2)?,
                value: row.get(3)?,
                source_anchor: row.get(4)?,
                notes: row.get(5)?,
            })
        })?;

        extractions.collect()
    }

    /// Helper: map the 8-column document projection to `StoredDocument`.
    fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredDocument> {
        Ok(StoredDocument {
            uid: row.get(0)?,
            contributor: row.get(1)?,
            filename: row.get(2)?,
            insurer: row.get(3)?,
            asset_type: row.get(4)?,
            ocr_text: row.get(5)?,
            has_entities: row.get(6)?,
            is_processed: row.get(7)?,
        })
    }

    /// Get counts of documents by processing status plus stored extractions
    pub fn get_counts(&self) -> SqliteResult<(usize, usize, usize)> {
        let total_documents: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;

        let processed_documents: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE is_processed = 1",
            [],
            |row| row.get(0),
        )?;

        let total_extractions: usize =
            self.conn
                .query_row("SELECT COUNT(*) FROM field_extractions", [], |row| {
                    row.get(0)
                })?;

        Ok((total_documents, processed_documents, total_extractions))
    }
}
