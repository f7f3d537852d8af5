//! Retrieval orchestration: [`EmbeddingRag`] does plain embedding similarity
//! search, [`HybridRag`] adds the BM25 leg and fuses the two. Both sit on
//! top of a [`VectorStore`] + [`Embedder`] pair and share a [`SearchCache`]
//! so that repeated lookups for the same finding don't redo work.

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::bm25::Bm25Index;
use crate::cache::{cache_key, SearchCache};
use crate::embedder::Embedder;
use crate::error::RagError;
use crate::hybrid::{hybrid_search, hybrid_search_with_embedding};
use crate::types::{LlmContext, ScoredDocument, VulnerabilityDocument};
use crate::vector_store::{embed_and_upsert, VectorStore};
use miesc_core::finding::Finding;

/// Builds the query text used to look up context for a given finding: its
/// normalized type, title, description, and taxonomy IDs concatenated, so
/// the retrieval query carries both the human-readable framing and the
/// exact registry identifiers an LLM pass can cross-reference.
fn query_text_for_finding(finding: &Finding) -> String {
    let taxonomy = finding
        .taxonomy
        .iter()
        .map(std::string::ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "{} {} {} {}",
        finding.normalized_type, finding.title, finding.description, taxonomy
    )
}

/// Renders a set of scored hits into a single string suitable for splicing
/// into an LLM prompt.
fn render_context(hits: &[ScoredDocument]) -> String {
    hits.iter()
        .map(|hit| {
            format!(
                "## {} (relevance {:.2})\n{}\n\nRemediation: {}\n",
                hit.document.title, hit.score, hit.document.summary, hit.document.remediation
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `normalized_type` group: a representative finding to build the shared
/// query from, and every finding id in the group the resulting context
/// should be attached to.
struct FindingGroup<'a> {
    representative: &'a Finding,
    ids: Vec<uuid::Uuid>,
}

/// Groups `findings` by `normalized_type` in first-seen order, so that a
/// batch lookup issues one RAG query per distinct vulnerability type instead
/// of one per finding.
fn group_by_normalized_type(findings: &[Finding]) -> Vec<FindingGroup<'_>> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: FxHashMap<&str, FindingGroup<'_>> = FxHashMap::default();

    for finding in findings {
        let key = finding.normalized_type.as_str();
        groups
            .entry(key)
            .and_modify(|group| group.ids.push(finding.id))
            .or_insert_with(|| {
                order.push(key);
                FindingGroup {
                    representative: finding,
                    ids: vec![finding.id],
                }
            });
    }

    order.into_iter().map(|key| groups.remove(key).expect("key was just inserted")).collect()
}

/// Deduplicates `queries` in first-seen order, returning the unique query
/// strings plus, for each original position, the index into that unique
/// list it maps to. Used by `batch_search` so repeated queries share one
/// encoder call and one vector/lexical lookup instead of redoing both per
/// occurrence.
fn dedupe_queries(queries: &[String]) -> (Vec<String>, Vec<usize>) {
    let mut unique: Vec<String> = Vec::new();
    let mut first_index: FxHashMap<&str, usize> = FxHashMap::default();
    let mut positions = Vec::with_capacity(queries.len());

    for query in queries {
        let index = *first_index.entry(query.as_str()).or_insert_with(|| {
            unique.push(query.clone());
            unique.len() - 1
        });
        positions.push(index);
    }

    (unique, positions)
}

/// Embedding-only retrieval over the knowledge base.
pub struct EmbeddingRag {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    cache: SearchCache,
}

impl EmbeddingRag {
    #[must_use]
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            cache: SearchCache::default(),
        }
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        let key = cache_key(query, top_k);
        if let Some(hits) = self.cache.get(&key) {
            return Ok(hits);
        }
        let embedding = self.embedder.embed(query);
        let hits = self.store.search_similar(&embedding, top_k).await?;
        self.cache.put(key, hits.clone());
        Ok(hits)
    }

    /// Runs `queries` as a batch: identical query strings are deduplicated
    /// before anything else runs, the embedder is invoked exactly once over
    /// the unique set (`Embedder::embed_batch`), and a vector query is
    /// dispatched only for each distinct string not already cache-hit
    /// (spec.md §4.6's batch contract; ≥ 50% fewer encoder/vector calls than
    /// the naive per-query loop whenever queries repeat).
    pub async fn batch_search(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<ScoredDocument>>, RagError> {
        let (unique_queries, positions) = dedupe_queries(queries);
        let embeddings = self.embedder.embed_batch(&unique_queries);

        let mut unique_results = Vec::with_capacity(unique_queries.len());
        for (query, embedding) in unique_queries.iter().zip(embeddings.iter()) {
            let key = cache_key(query, top_k);
            let hits = if let Some(cached) = self.cache.get(&key) {
                cached
            } else {
                let hits = self.store.search_similar(embedding, top_k).await?;
                self.cache.put(key, hits.clone());
                hits
            };
            unique_results.push(hits);
        }

        Ok(positions.into_iter().map(|index| unique_results[index].clone()).collect())
    }

    pub async fn search_by_finding(
        &self,
        finding: &Finding,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        self.search(&query_text_for_finding(finding), top_k).await
    }

    pub async fn get_context_for_llm(&self, query: &str, top_k: usize) -> Result<LlmContext, RagError> {
        let hits = self.search(query, top_k).await?;
        Ok(LlmContext {
            rendered: render_context(&hits),
            hits,
        })
    }

    /// Resolves context for every finding in `findings`, grouping by
    /// `normalized_type` so that findings of the same kind share one RAG
    /// query and one rendered context block instead of paying for a lookup
    /// per finding.
    pub async fn batch_get_context_for_findings(
        &self,
        findings: &[Finding],
        top_k: usize,
    ) -> Result<FxHashMap<uuid::Uuid, LlmContext>, RagError> {
        let mut contexts = FxHashMap::default();
        for group in group_by_normalized_type(findings) {
            let context = self
                .get_context_for_llm(&query_text_for_finding(group.representative), top_k)
                .await?;
            for id in group.ids {
                contexts.insert(id, context.clone());
            }
        }
        Ok(contexts)
    }

    pub async fn add_custom_vulnerability(&self, document: VulnerabilityDocument) -> Result<(), RagError> {
        embed_and_upsert(self.store.as_ref(), self.embedder.as_ref(), document).await
    }

    #[must_use]
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.cache_stats()
    }
}

/// Hybrid retrieval: fuses embedding similarity with an in-process BM25
/// lexical index, rebuilt whenever the document set changes.
pub struct HybridRag {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    cache: SearchCache,
    documents_by_id: RwLock<FxHashMap<String, VulnerabilityDocument>>,
    bm25: RwLock<Bm25Index>,
}

impl HybridRag {
    /// Builds a hybrid retriever over `initial_documents`, embedding and
    /// upserting each into `store` and constructing the initial BM25 index.
    pub async fn new(
        store: Arc<dyn VectorStore>,
        embedder: Arc<dyn Embedder>,
        initial_documents: Vec<VulnerabilityDocument>,
    ) -> Result<Self, RagError> {
        for document in &initial_documents {
            embed_and_upsert(store.as_ref(), embedder.as_ref(), document.clone()).await?;
        }
        let bm25 = Bm25Index::build(&initial_documents);
        let documents_by_id = initial_documents
            .into_iter()
            .map(|doc| (doc.id.clone(), doc))
            .collect();

        Ok(Self {
            store,
            embedder,
            cache: SearchCache::default(),
            documents_by_id: RwLock::new(documents_by_id),
            bm25: RwLock::new(bm25),
        })
    }

    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<ScoredDocument>, RagError> {
        let key = cache_key(query, top_k);
        if let Some(hits) = self.cache.get(&key) {
            return Ok(hits);
        }
        let hits = {
            let documents_by_id = self.documents_by_id.read();
            let bm25 = self.bm25.read();
            hybrid_search(
                self.store.as_ref(),
                self.embedder.as_ref(),
                &bm25,
                query,
                top_k,
                &documents_by_id,
            )
            .await?
        };
        self.cache.put(key, hits.clone());
        Ok(hits)
    }

    /// Same batch contract as [`EmbeddingRag::batch_search`]: dedupe first,
    /// one encoder pass over the unique query set, then one hybrid
    /// (embedding + BM25) lookup per distinct string not already cached.
    pub async fn batch_search(
        &self,
        queries: &[String],
        top_k: usize,
    ) -> Result<Vec<Vec<ScoredDocument>>, RagError> {
        let (unique_queries, positions) = dedupe_queries(queries);
        let embeddings = self.embedder.embed_batch(&unique_queries);

        let mut unique_results = Vec::with_capacity(unique_queries.len());
        for (query, embedding) in unique_queries.iter().zip(embeddings.iter()) {
            let key = cache_key(query, top_k);
            let hits = if let Some(cached) = self.cache.get(&key) {
                cached
            } else {
                let documents_by_id = self.documents_by_id.read();
                let bm25 = self.bm25.read();
                let hits = hybrid_search_with_embedding(
                    self.store.as_ref(),
                    embedding,
                    &bm25,
                    query,
                    top_k,
                    &documents_by_id,
                )
                .await?;
                self.cache.put(key, hits.clone());
                hits
            };
            unique_results.push(hits);
        }

        Ok(positions.into_iter().map(|index| unique_results[index].clone()).collect())
    }

    pub async fn search_by_finding(
        &self,
        finding: &Finding,
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>, RagError> {
        self.search(&query_text_for_finding(finding), top_k).await
    }

    pub async fn get_context_for_llm(&self, query: &str, top_k: usize) -> Result<LlmContext, RagError> {
        let hits = self.search(query, top_k).await?;
        Ok(LlmContext {
            rendered: render_context(&hits),
            hits,
        })
    }

    /// Resolves context for every finding in `findings`, grouping by
    /// `normalized_type` so that findings of the same kind share one RAG
    /// query and one rendered context block instead of paying for a lookup
    /// per finding.
    pub async fn batch_get_context_for_findings(
        &self,
        findings: &[Finding],
        top_k: usize,
    ) -> Result<FxHashMap<uuid::Uuid, LlmContext>, RagError> {
        let mut contexts = FxHashMap::default();
        for group in group_by_normalized_type(findings) {
            let context = self
                .get_context_for_llm(&query_text_for_finding(group.representative), top_k)
                .await?;
            for id in group.ids {
                contexts.insert(id, context.clone());
            }
        }
        Ok(contexts)
    }

    /// Adds a document at runtime, re-embedding into the store and rebuilding
    /// the BM25 index. Rebuilding the whole index on every insert is fine at
    /// this corpus size; it would need to become incremental well before a
    /// few thousand documents.
    pub async fn add_custom_vulnerability(&self, document: VulnerabilityDocument) -> Result<(), RagError> {
        embed_and_upsert(self.store.as_ref(), self.embedder.as_ref(), document.clone()).await?;
        let mut documents_by_id = self.documents_by_id.write();
        documents_by_id.insert(document.id.clone(), document);
        let all_documents: Vec<VulnerabilityDocument> = documents_by_id.values().cloned().collect();
        *self.bm25.write() = Bm25Index::build(&all_documents);
        Ok(())
    }

    #[must_use]
    pub fn cache_stats(&self) -> crate::cache::CacheStats {
        self.cache.cache_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::HashingEmbedder;
    use crate::vector_store::InMemoryVectorStore;
    use miesc_core::finding::{Confidence, FindingStatus, Location, Provenance, Severity};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps [`HashingEmbedder`] to count how many times `embed` vs.
    /// `embed_batch` get called, so `batch_search` tests can assert exactly
    /// one encoder pass ran over a batch instead of one call per query.
    struct CountingEmbedder {
        inner: HashingEmbedder,
        embed_calls: AtomicUsize,
        embed_batch_calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::new(),
                embed_calls: AtomicUsize::new(0),
                embed_batch_calls: AtomicUsize::new(0),
            }
        }
    }

    impl crate::embedder::Embedder for CountingEmbedder {
        fn dim(&self) -> usize {
            self.inner.dim()
        }

        fn embed(&self, text: &str) -> Vec<f32> {
            self.embed_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.embed(text)
        }

        fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
            self.embed_batch_calls.fetch_add(1, Ordering::SeqCst);
            texts.iter().map(|t| self.inner.embed(t)).collect()
        }
    }

    fn doc(id: &str, title: &str, summary: &str) -> VulnerabilityDocument {
        VulnerabilityDocument {
            id: id.to_string(),
            title: title.to_string(),
            taxonomy_ids: vec!["SWC-107".to_string()],
            summary: summary.to_string(),
            detail: "External call before state update.".to_string(),
            remediation: "Use checks-effects-interactions.".to_string(),
            tags: vec!["reentrancy".to_string()],
        }
    }

    fn sample_finding() -> Finding {
        Finding {
            id: uuid::Uuid::new_v4(),
            normalized_type: "reentrancy".to_string(),
            title: "Reentrancy in withdraw".to_string(),
            description: "External call occurs before balance is zeroed.".to_string(),
            severity: Severity::High,
            confidence: Confidence::new(0.8),
            taxonomy: vec![],
            location: Location {
                file: "Vault.sol".to_string(),
                line: 42,
                column: None,
                function_name: Some("withdraw".to_string()),
            },
            provenance: vec![Provenance {
                adapter: "pattern_static".to_string(),
                layer: 1,
                tool_version: None,
                raw_rule_id: None,
            }],
            status: FindingStatus::Raw,
            corroboration_count: 1,
        }
    }

    #[tokio::test]
    async fn embedding_rag_searches_and_caches() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let rag = EmbeddingRag::new(store, embedder);
        rag.add_custom_vulnerability(doc("d1", "Reentrancy", "classic reentrancy bug")).await.unwrap();

        let hits = rag.search("reentrancy", 5).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(rag.cache_stats().misses, 1);

        rag.search("reentrancy", 5).await.unwrap();
        assert_eq!(rag.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn embedding_rag_resolves_context_from_a_finding() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let rag = EmbeddingRag::new(store, embedder);
        rag.add_custom_vulnerability(doc("d1", "Reentrancy", "classic reentrancy bug pattern")).await.unwrap();

        let hits = rag.search_by_finding(&sample_finding(), 3).await.unwrap();
        assert_eq!(hits[0].document.id, "d1");
    }

    #[tokio::test]
    async fn hybrid_rag_fuses_and_rebuilds_on_insert() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let rag = HybridRag::new(store, embedder, vec![doc("d1", "Reentrancy", "classic reentrancy bug")])
            .await
            .unwrap();

        let hits = rag.search("reentrancy bug", 5).await.unwrap();
        assert_eq!(hits[0].document.id, "d1");

        rag.add_custom_vulnerability(doc("d2", "Floating pragma", "compiler version not pinned"))
            .await
            .unwrap();
        let hits = rag.search("compiler version", 5).await.unwrap();
        assert_eq!(hits[0].document.id, "d2");
    }

    #[tokio::test]
    async fn hybrid_rag_context_renders_remediation() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let rag = HybridRag::new(store, embedder, vec![doc("d1", "Reentrancy", "classic reentrancy bug")])
            .await
            .unwrap();

        let context = rag.get_context_for_llm("reentrancy", 3).await.unwrap();
        assert!(context.rendered.contains("checks-effects-interactions"));
    }

    #[tokio::test]
    async fn embedding_rag_batch_search_dedupes_with_one_encoder_pass() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(CountingEmbedder::new());
        let rag = EmbeddingRag::new(store, embedder.clone());
        rag.add_custom_vulnerability(doc("d1", "Reentrancy", "classic reentrancy bug")).await.unwrap();
        rag.add_custom_vulnerability(doc("d2", "Floating pragma", "compiler version not pinned"))
            .await
            .unwrap();

        let queries = vec![
            "reentrancy".to_string(),
            "floating pragma".to_string(),
            "reentrancy".to_string(),
        ];
        let results = rag.batch_search(&queries, 3).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(
            results[0].iter().map(|h| (h.document.id.clone(), h.score)).collect::<Vec<_>>(),
            results[2].iter().map(|h| (h.document.id.clone(), h.score)).collect::<Vec<_>>(),
        );
        // One encoder pass over the two distinct queries, not three.
        assert_eq!(embedder.embed_batch_calls.load(Ordering::SeqCst), 1);
        assert_eq!(embedder.embed_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn hybrid_rag_batch_search_dedupes_with_one_encoder_pass() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(CountingEmbedder::new());
        let rag = HybridRag::new(
            store,
            embedder.clone(),
            vec![doc("d1", "Reentrancy", "classic reentrancy bug")],
        )
        .await
        .unwrap();

        let queries = vec!["reentrancy bug".to_string(), "reentrancy bug".to_string()];
        let results = rag.batch_search(&queries, 3).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].iter().map(|h| (h.document.id.clone(), h.score)).collect::<Vec<_>>(),
            results[1].iter().map(|h| (h.document.id.clone(), h.score)).collect::<Vec<_>>(),
        );
        assert_eq!(embedder.embed_batch_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn batch_context_shares_one_lookup_per_normalized_type() {
        let store = Arc::new(InMemoryVectorStore::new());
        let embedder = Arc::new(HashingEmbedder::new());
        let rag = EmbeddingRag::new(store, embedder);
        rag.add_custom_vulnerability(doc("d1", "Reentrancy", "classic reentrancy bug")).await.unwrap();

        let first = sample_finding();
        let mut second = sample_finding();
        second.id = uuid::Uuid::new_v4();
        second.location.line = 90;

        let contexts = rag
            .batch_get_context_for_findings(&[first.clone(), second.clone()], 3)
            .await
            .unwrap();

        assert_eq!(contexts.len(), 2);
        assert_eq!(
            contexts.get(&first.id).unwrap().rendered,
            contexts.get(&second.id).unwrap().rendered
        );
        // only one query should have been issued: the second lookup is a cache hit
        assert_eq!(rag.cache_stats().misses, 1);
    }
}
