//! Vector storage for the knowledge base: an async trait generalizing a
//! chunk-store abstraction from document chunks to [`VulnerabilityDocument`]
//! entries, plus an in-memory implementation and a persistent SQLite-backed
//! one built directly on `tokio-rusqlite`.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rusqlite::{params, OptionalExtension};

use crate::embedder::{cosine_similarity, Embedder};
use crate::error::RagError;
use crate::types::{ScoredDocument, VulnerabilityDocument};

/// Storage and similarity search over embedded [`VulnerabilityDocument`]s.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Inserts or replaces a document and its embedding.
    async fn upsert(&self, document: VulnerabilityDocument, embedding: Vec<f32>) -> Result<(), RagError>;

    async fn get(&self, id: &str) -> Result<Option<VulnerabilityDocument>, RagError>;

    async fn delete(&self, id: &str) -> Result<(), RagError>;

    async fn count(&self) -> Result<usize, RagError>;

    /// Returns the `top_k` documents by cosine similarity to `query_embedding`.
    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError>;
}

#[derive(Clone)]
struct Entry {
    document: VulnerabilityDocument,
    embedding: Vec<f32>,
}

/// An in-process vector store backed by a `Vec`, sufficient for a knowledge
/// base of hundreds of documents and for tests that don't want file I/O.
#[derive(Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<Entry>>,
}

impl InMemoryVectorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, document: VulnerabilityDocument, embedding: Vec<f32>) -> Result<(), RagError> {
        let mut entries = self.entries.write();
        if let Some(existing) = entries.iter_mut().find(|e| e.document.id == document.id) {
            existing.document = document;
            existing.embedding = embedding;
        } else {
            entries.push(Entry { document, embedding });
        }
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<VulnerabilityDocument>, RagError> {
        Ok(self
            .entries
            .read()
            .iter()
            .find(|e| e.document.id == id)
            .map(|e| e.document.clone()))
    }

    async fn delete(&self, id: &str) -> Result<(), RagError> {
        self.entries.write().retain(|e| e.document.id != id);
        Ok(())
    }

    async fn count(&self) -> Result<usize, RagError> {
        Ok(self.entries.read().len())
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let entries = self.entries.read();
        let mut scored: Vec<ScoredDocument> = entries
            .iter()
            .map(|e| ScoredDocument {
                document: e.document.clone(),
                score: cosine_similarity(query_embedding, &e.embedding),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// A persistent vector store backed by plain SQLite, so a knowledge base
/// built up across runs (including custom entries added at runtime)
/// survives process restarts. Embeddings are stored as a packed
/// little-endian `f32` BLOB; similarity search runs in-process over the
/// full loaded working set rather than through a vector index extension,
/// since the knowledge base here is small enough that the simplicity is
/// worth more than the extra complexity that would avoid.
pub struct SqliteVectorStore {
    conn: Arc<tokio_rusqlite::Connection>,
}

impl SqliteVectorStore {
    /// Opens (creating if necessary) a SQLite-backed store at `path`.
    ///
    /// # Errors
    /// Returns [`RagError::Storage`] if the database cannot be opened or
    /// the schema cannot be created.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RagError> {
        let conn = tokio_rusqlite::Connection::open(path.as_ref())
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS vuln_documents (
                    id TEXT PRIMARY KEY,
                    title TEXT NOT NULL,
                    taxonomy_ids TEXT NOT NULL,
                    summary TEXT NOT NULL,
                    detail TEXT NOT NULL,
                    remediation TEXT NOT NULL,
                    tags TEXT NOT NULL,
                    embedding BLOB NOT NULL
                );",
            )?;
            Ok(())
        })
        .await
        .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(Self { conn: Arc::new(conn) })
    }

    fn encode_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn decode_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn upsert(&self, document: VulnerabilityDocument, embedding: Vec<f32>) -> Result<(), RagError> {
        let taxonomy_ids = serde_json::to_string(&document.taxonomy_ids)
            .map_err(|e| RagError::Storage(e.to_string()))?;
        let tags = serde_json::to_string(&document.tags).map_err(|e| RagError::Storage(e.to_string()))?;
        let embedding_bytes = Self::encode_embedding(&embedding);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO vuln_documents
                     (id, title, taxonomy_ids, summary, detail, remediation, tags, embedding)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                        title=excluded.title, taxonomy_ids=excluded.taxonomy_ids,
                        summary=excluded.summary, detail=excluded.detail,
                        remediation=excluded.remediation, tags=excluded.tags,
                        embedding=excluded.embedding",
                    params![
                        document.id,
                        document.title,
                        taxonomy_ids,
                        document.summary,
                        document.detail,
                        document.remediation,
                        tags,
                        embedding_bytes,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<VulnerabilityDocument>, RagError> {
        let id = id.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, taxonomy_ids, summary, detail, remediation, tags
                     FROM vuln_documents WHERE id = ?1",
                )?;
                let result = stmt
                    .query_row(params![id], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    })
                    .optional()?;
                Ok(result)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        Ok(row.map(|(id, title, taxonomy_ids, summary, detail, remediation, tags)| {
            VulnerabilityDocument {
                id,
                title,
                taxonomy_ids: serde_json::from_str(&taxonomy_ids).unwrap_or_default(),
                summary,
                detail,
                remediation,
                tags: serde_json::from_str(&tags).unwrap_or_default(),
            }
        }))
    }

    async fn delete(&self, id: &str) -> Result<(), RagError> {
        let id = id.to_string();
        self.conn
            .call(move |conn| {
                conn.execute("DELETE FROM vuln_documents WHERE id = ?1", params![id])?;
                Ok(())
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;
        Ok(())
    }

    async fn count(&self) -> Result<usize, RagError> {
        self.conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM vuln_documents", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))
    }

    async fn search_similar(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, title, taxonomy_ids, summary, detail, remediation, tags, embedding
                     FROM vuln_documents",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, Vec<u8>>(7)?,
                        ))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(|err| RagError::Storage(err.to_string()))?;

        let mut scored: Vec<ScoredDocument> = rows
            .into_iter()
            .map(
                |(id, title, taxonomy_ids, summary, detail, remediation, tags, embedding_bytes)| {
                    let embedding = Self::decode_embedding(&embedding_bytes);
                    let document = VulnerabilityDocument {
                        id,
                        title,
                        taxonomy_ids: serde_json::from_str(&taxonomy_ids).unwrap_or_default(),
                        summary,
                        detail,
                        remediation,
                        tags: serde_json::from_str(&tags).unwrap_or_default(),
                    };
                    let score = cosine_similarity(query_embedding, &embedding);
                    ScoredDocument { document, score }
                },
            )
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Helper used by callers that want to embed-and-store in one step.
pub async fn embed_and_upsert(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    document: VulnerabilityDocument,
) -> Result<(), RagError> {
    let embedding = embedder.embed(&document.embedding_text());
    store.upsert(document, embedding).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;

    fn sample_doc(id: &str, title: &str) -> VulnerabilityDocument {
        VulnerabilityDocument {
            id: id.to_string(),
            title: title.to_string(),
            taxonomy_ids: vec!["SWC-107".to_string()],
            summary: "A reentrancy weakness.".to_string(),
            detail: "External call before state update.".to_string(),
            remediation: "Use checks-effects-interactions.".to_string(),
            tags: vec!["reentrancy".to_string()],
        }
    }

    #[tokio::test]
    async fn in_memory_store_roundtrips_and_searches() {
        let store = InMemoryVectorStore::new();
        let embedder = HashingEmbedder::new();
        embed_and_upsert(&store, &embedder, sample_doc("d1", "Reentrancy")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let query = embedder.embed("reentrancy external call");
        let hits = store.search_similar(&query, 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, "d1");
    }

    #[tokio::test]
    async fn sqlite_store_persists_across_handles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kb.sqlite3");
        let embedder = HashingEmbedder::new();

        {
            let store = SqliteVectorStore::open(&path).await.unwrap();
            embed_and_upsert(&store, &embedder, sample_doc("d1", "Reentrancy")).await.unwrap();
        }

        let store = SqliteVectorStore::open(&path).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let doc = store.get("d1").await.unwrap().unwrap();
        assert_eq!(doc.title, "Reentrancy");
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryVectorStore::new();
        let embedder = HashingEmbedder::new();
        embed_and_upsert(&store, &embedder, sample_doc("d1", "Reentrancy")).await.unwrap();
        store.delete("d1").await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
