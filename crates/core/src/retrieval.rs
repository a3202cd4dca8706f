//! Retrieval provider trait: the ranked-passage source.
//!
//! The pipeline treats retrieval as an opaque collaborator: query in, ranked
//! passages with source metadata out. It passes through whatever `top_k` and
//! filter the caller supplies and imposes no filtering of its own.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// A chunk of source-document text returned by retrieval, paired with
/// metadata identifying its origin document. Read-only to the pipeline;
/// lives for a single query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    /// The passage text.
    pub text: String,

    /// Origin metadata (e.g., "filename", "chunk_index").
    #[serde(default)]
    pub source_metadata: HashMap<String, String>,
}

/// Ranked retrieval output. The three sequences are parallel: entry `i` of
/// each describes the same passage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    /// Passage texts, best match first.
    pub passages: Vec<String>,

    /// Per-passage source metadata.
    pub source_metadata: Vec<HashMap<String, String>>,

    /// Per-passage relevance scores.
    pub relevance_scores: Vec<f32>,
}

impl SearchResults {
    /// Zip the parallel sequences into owned passages.
    pub fn into_passages(self) -> Vec<RetrievedPassage> {
        let mut metadata = self.source_metadata.into_iter();
        self.passages
            .into_iter()
            .map(|text| RetrievedPassage {
                text,
                source_metadata: metadata.next().unwrap_or_default(),
            })
            .collect()
    }
}

/// The retrieval collaborator interface.
#[async_trait]
pub trait RetrievalProvider: Send + Sync {
    /// Search for the `top_k` passages most relevant to `query`, optionally
    /// restricted by a metadata filter.
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> std::result::Result<SearchResults, RetrievalError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_passages_zips_metadata() {
        let results = SearchResults {
            passages: vec!["A".into(), "B".into()],
            source_metadata: vec![
                HashMap::from([("filename".to_string(), "a.pdf".to_string())]),
                HashMap::from([("filename".to_string(), "b.pdf".to_string())]),
            ],
            relevance_scores: vec![0.9, 0.4],
        };

        let passages = results.into_passages();
        assert_eq!(passages.len(), 2);
        assert_eq!(passages[0].text, "A");
        assert_eq!(passages[1].source_metadata["filename"], "b.pdf");
    }

    #[test]
    fn into_passages_tolerates_short_metadata() {
        let results = SearchResults {
            passages: vec!["A".into(), "B".into()],
            source_metadata: vec![HashMap::from([(
                "filename".to_string(),
                "a.pdf".to_string(),
            )])],
            relevance_scores: vec![0.9, 0.4],
        };

        let passages = results.into_passages();
        assert!(passages[1].source_metadata.is_empty());
    }
}
