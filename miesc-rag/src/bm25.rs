//! An in-process BM25 lexical index over the knowledge base, used as the
//! second leg of hybrid retrieval. A dedicated search-engine dependency
//! would be overkill for a corpus of a few hundred documents, so this is a
//! small hand-rolled inverted index with the standard BM25 scoring formula
//! (k1 = 1.2, b = 0.75).

use rustc_hash::FxHashMap;

use crate::types::VulnerabilityDocument;

const K1: f32 = 1.2;
const B: f32 = 0.75;

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

struct IndexedDocument {
    id: String,
    term_counts: FxHashMap<String, u32>,
    length: u32,
}

/// A BM25 index built once over the knowledge base corpus.
pub struct Bm25Index {
    documents: Vec<IndexedDocument>,
    document_frequency: FxHashMap<String, u32>,
    avg_doc_length: f32,
}

impl Bm25Index {
    #[must_use]
    pub fn build(documents: &[VulnerabilityDocument]) -> Self {
        let mut indexed = Vec::with_capacity(documents.len());
        let mut document_frequency: FxHashMap<String, u32> = FxHashMap::default();

        for doc in documents {
            let tokens = tokenize(&doc.embedding_text());
            let mut term_counts: FxHashMap<String, u32> = FxHashMap::default();
            for token in &tokens {
                *term_counts.entry(token.clone()).or_insert(0) += 1;
            }
            for term in term_counts.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            indexed.push(IndexedDocument {
                id: doc.id.clone(),
                term_counts,
                length: u32::try_from(tokens.len()).unwrap_or(u32::MAX),
            });
        }

        let avg_doc_length = if indexed.is_empty() {
            0.0
        } else {
            indexed.iter().map(|d| d.length as f32).sum::<f32>() / indexed.len() as f32
        };

        Self {
            documents: indexed,
            document_frequency,
            avg_doc_length,
        }
    }

    /// Scores every document against `query`, returning `(document_id,
    /// score)` pairs sorted descending. Documents with a zero score (no
    /// matching terms) are omitted.
    #[must_use]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let query_terms = tokenize(query);
        let n = self.documents.len() as f32;

        let mut scores: Vec<(String, f32)> = self
            .documents
            .iter()
            .map(|doc| {
                let score: f32 = query_terms
                    .iter()
                    .map(|term| {
                        let Some(&term_count) = doc.term_counts.get(term) else {
                            return 0.0;
                        };
                        let df = *self.document_frequency.get(term).unwrap_or(&0) as f32;
                        if df == 0.0 {
                            return 0.0;
                        }
                        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
                        let tf = term_count as f32;
                        let length_norm = 1.0 - B + B * (doc.length as f32 / self.avg_doc_length.max(1.0));
                        idf * (tf * (K1 + 1.0)) / (tf + K1 * length_norm)
                    })
                    .sum();
                (doc.id.clone(), score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scores.truncate(top_k);
        scores
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, summary: &str) -> VulnerabilityDocument {
        VulnerabilityDocument {
            id: id.to_string(),
            title: "title".to_string(),
            taxonomy_ids: vec![],
            summary: summary.to_string(),
            detail: String::new(),
            remediation: String::new(),
            tags: vec![],
        }
    }

    #[test]
    fn matching_document_scores_above_zero() {
        let docs = vec![
            doc("d1", "reentrancy external call state update"),
            doc("d2", "floating pragma compiler version"),
        ];
        let index = Bm25Index::build(&docs);
        let results = index.search("reentrancy call", 5);
        assert_eq!(results[0].0, "d1");
        assert!(results.iter().all(|(_, score)| *score > 0.0));
    }

    #[test]
    fn query_with_no_matching_terms_returns_empty() {
        let docs = vec![doc("d1", "reentrancy external call")];
        let index = Bm25Index::build(&docs);
        assert!(index.search("unrelated gibberish zzz", 5).is_empty());
    }

    #[test]
    fn empty_corpus_returns_empty_results() {
        let index = Bm25Index::build(&[]);
        assert!(index.search("anything", 5).is_empty());
    }
}
