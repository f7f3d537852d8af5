//! Hybrid retrieval: fuses embedding similarity and BM25 lexical scores so
//! that queries with distinctive vocabulary (which BM25 rewards) and queries
//! that are semantically close but lexically different (which the embedder
//! rewards) both retrieve well.

use rustc_hash::FxHashMap;

use crate::bm25::Bm25Index;
use crate::embedder::Embedder;
use crate::types::{ScoredDocument, VulnerabilityDocument};
use crate::vector_store::VectorStore;

/// Weight given to embedding similarity in the fused score; the remainder
/// goes to the BM25 score. `0.7` favors semantic closeness while still
/// letting an exact keyword match pull a document up.
pub const EMBEDDING_WEIGHT: f32 = 0.7;
pub const BM25_WEIGHT: f32 = 0.3;

/// Min-max normalizes a set of scores into `[0, 1]`. An empty set normalizes
/// to nothing; a set with a zero range (a single candidate, or every
/// candidate tied) has nothing to rank relative to, so each score is kept as
/// its own already-bounded value (clamped into `[0, 1]`) instead of
/// collapsing every tie to zero — a lone or saturated match should still
/// carry its raw signal into the fused score.
fn normalize(scores: &FxHashMap<String, f32>) -> FxHashMap<String, f32> {
    let Some(max) = scores.values().copied().fold(None, |acc: Option<f32>, v| {
        Some(acc.map_or(v, |a| a.max(v)))
    }) else {
        return FxHashMap::default();
    };
    let min = scores
        .values()
        .copied()
        .fold(max, |acc, v| acc.min(v));
    let range = max - min;
    scores
        .iter()
        .map(|(id, &score)| {
            let normalized = if range > f32::EPSILON {
                (score - min) / range
            } else {
                score.clamp(0.0, 1.0)
            };
            (id.clone(), normalized)
        })
        .collect()
}

/// Fuses an embedding-search result set with a BM25 result set over the
/// same corpus into a single ranked list.
///
/// Both inputs are independently min-max normalized before fusion so that
/// the different native scales of cosine similarity and BM25 scores don't
/// let one signal dominate purely by magnitude.
#[must_use]
pub fn fuse_scores(
    embedding_hits: &[ScoredDocument],
    bm25_hits: &[(String, f32)],
    documents_by_id: &FxHashMap<String, VulnerabilityDocument>,
    top_k: usize,
) -> Vec<ScoredDocument> {
    let embedding_scores: FxHashMap<String, f32> = embedding_hits
        .iter()
        .map(|hit| (hit.document.id.clone(), hit.score))
        .collect();
    let bm25_scores: FxHashMap<String, f32> = bm25_hits.iter().cloned().collect();

    let embedding_normalized = normalize(&embedding_scores);
    let bm25_normalized = normalize(&bm25_scores);

    let mut ids: Vec<String> = embedding_scores.keys().chain(bm25_scores.keys()).cloned().collect();
    ids.sort();
    ids.dedup();

    let mut fused: Vec<ScoredDocument> = ids
        .into_iter()
        .filter_map(|id| {
            let document = documents_by_id.get(&id)?.clone();
            let embed_component = embedding_normalized.get(&id).copied().unwrap_or(0.0);
            let bm25_component = bm25_normalized.get(&id).copied().unwrap_or(0.0);
            let score = EMBEDDING_WEIGHT * embed_component + BM25_WEIGHT * bm25_component;
            Some(ScoredDocument { document, score })
        })
        .collect();

    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(top_k);
    fused
}

/// Runs embedding search against `store` and lexical search against `bm25`,
/// then fuses the two result sets.
pub async fn hybrid_search(
    store: &dyn VectorStore,
    embedder: &dyn Embedder,
    bm25: &Bm25Index,
    query: &str,
    top_k: usize,
    documents_by_id: &FxHashMap<String, VulnerabilityDocument>,
) -> Result<Vec<ScoredDocument>, crate::error::RagError> {
    let query_embedding = embedder.embed(query);
    hybrid_search_with_embedding(store, &query_embedding, bm25, query, top_k, documents_by_id).await
}

/// Same as [`hybrid_search`] but takes an already-computed query embedding,
/// so a batch caller can run one encoder pass over a set of unique queries
/// up front instead of re-embedding per query.
pub async fn hybrid_search_with_embedding(
    store: &dyn VectorStore,
    query_embedding: &[f32],
    bm25: &Bm25Index,
    query: &str,
    top_k: usize,
    documents_by_id: &FxHashMap<String, VulnerabilityDocument>,
) -> Result<Vec<ScoredDocument>, crate::error::RagError> {
    // Pull a wider candidate window from each leg than top_k, since fusion
    // can reorder enough that a document ranked 15th by one signal alone
    // still belongs in the final top 5.
    let candidate_window = (top_k * 4).max(20);
    let embedding_hits = store.search_similar(query_embedding, candidate_window).await?;
    let bm25_hits = bm25.search(query, candidate_window);
    Ok(fuse_scores(&embedding_hits, &bm25_hits, documents_by_id, top_k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> VulnerabilityDocument {
        VulnerabilityDocument {
            id: id.to_string(),
            title: "t".into(),
            taxonomy_ids: vec![],
            summary: "s".into(),
            detail: "d".into(),
            remediation: "r".into(),
            tags: vec![],
        }
    }

    #[test]
    fn fusion_favors_document_strong_in_both_signals() {
        let mut docs = FxHashMap::default();
        docs.insert("a".to_string(), doc("a"));
        docs.insert("b".to_string(), doc("b"));

        let embedding_hits = vec![
            ScoredDocument { document: doc("a"), score: 0.9 },
            ScoredDocument { document: doc("b"), score: 0.2 },
        ];
        let bm25_hits = vec![("a".to_string(), 5.0), ("b".to_string(), 4.9)];

        let fused = fuse_scores(&embedding_hits, &bm25_hits, &docs, 2);
        assert_eq!(fused[0].document.id, "a");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let docs = FxHashMap::default();
        let fused = fuse_scores(&[], &[], &docs, 5);
        assert!(fused.is_empty());
    }

    #[test]
    fn normalize_preserves_raw_score_without_dividing_by_zero() {
        let mut scores = FxHashMap::default();
        scores.insert("a".to_string(), 3.0);
        let normalized = normalize(&scores);
        assert_eq!(normalized.get("a"), Some(&1.0));
    }

    #[test]
    fn normalize_clamps_a_tied_negative_score_to_zero() {
        let mut scores = FxHashMap::default();
        scores.insert("a".to_string(), -0.5);
        scores.insert("b".to_string(), -0.5);
        let normalized = normalize(&scores);
        assert_eq!(normalized.get("a"), Some(&0.0));
        assert_eq!(normalized.get("b"), Some(&0.0));
    }

    #[test]
    fn agreeing_single_candidate_at_full_score_fuses_to_one() {
        let mut docs = FxHashMap::default();
        docs.insert("a".to_string(), doc("a"));

        let embedding_hits = vec![ScoredDocument { document: doc("a"), score: 1.0 }];
        let bm25_hits = vec![("a".to_string(), 1.0)];

        let fused = fuse_scores(&embedding_hits, &bm25_hits, &docs, 5);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn disagreeing_single_candidate_preserves_weighted_mean() {
        let mut docs = FxHashMap::default();
        docs.insert("a".to_string(), doc("a"));

        let embedding_hits = vec![ScoredDocument { document: doc("a"), score: 1.0 }];
        let bm25_hits = vec![("a".to_string(), 0.0)];

        let fused = fuse_scores(&embedding_hits, &bm25_hits, &docs, 5);
        assert_eq!(fused.len(), 1);
        assert!((fused[0].score - EMBEDDING_WEIGHT).abs() < 1e-6);
    }
}
