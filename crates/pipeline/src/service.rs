//! Query service: retrieval composed with the response pipeline.
//!
//! This is the piece the surrounding service calls for one inbound query:
//! translate an optional document filter, fetch ranked passages, run the
//! two-stage protocol, and collect source filenames for attribution.

use std::collections::HashMap;
use std::sync::Arc;

use ragline_core::error::Error;
use ragline_core::message::ConversationTurn;
use ragline_core::retrieval::RetrievalProvider;
use ragline_core::store::DocumentStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::pipeline::ResponsePipeline;

/// The caller-facing outcome of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// The final conversational answer.
    pub response: String,

    /// The raw passage texts the answer was grounded in.
    pub context_used: Vec<String>,

    /// Distinct source filenames, first-seen order.
    pub sources: Vec<String>,

    /// The conversation key the exchange was remembered under.
    pub conversation_key: String,
}

/// Composes a retrieval provider with the response pipeline.
pub struct QueryService {
    retrieval: Arc<dyn RetrievalProvider>,
    pipeline: Arc<ResponsePipeline>,
    store: Option<Arc<dyn DocumentStore>>,
    /// Minimum passages fetched per query regardless of the caller's
    /// `top_k`: queries answer better with wider context.
    top_k_floor: usize,
}

impl QueryService {
    pub fn new(
        retrieval: Arc<dyn RetrievalProvider>,
        pipeline: Arc<ResponsePipeline>,
        top_k_floor: usize,
    ) -> Self {
        Self {
            retrieval,
            pipeline,
            store: None,
            top_k_floor,
        }
    }

    /// Attach a document store so document filters can be resolved to
    /// filename filters.
    pub fn with_store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Answer one query.
    ///
    /// `document_filter` optionally narrows retrieval to one uploaded
    /// document by ID; an unknown ID falls back to unfiltered search.
    pub async fn query(
        &self,
        query: &str,
        top_k: usize,
        document_filter: Option<&str>,
        history: &[ConversationTurn],
    ) -> Result<QueryOutcome, Error> {
        let filter = self.resolve_filter(document_filter).await?;

        let effective_top_k = top_k.max(self.top_k_floor);
        debug!(top_k = effective_top_k, filtered = filter.is_some(), "Query: retrieving passages");

        let results = self
            .retrieval
            .search(query, effective_top_k, filter.as_ref())
            .await?;

        let sources = distinct_sources(&results.source_metadata);

        let pipeline_result = self
            .pipeline
            .process_query(query, &results.passages, history)
            .await?;

        info!(
            sources = sources.len(),
            key = %pipeline_result.conversation_key,
            "Query: answered"
        );

        Ok(QueryOutcome {
            response: pipeline_result.final_response,
            context_used: pipeline_result.context_used,
            sources,
            conversation_key: pipeline_result.conversation_key,
        })
    }

    async fn resolve_filter(
        &self,
        document_filter: Option<&str>,
    ) -> Result<Option<HashMap<String, String>>, Error> {
        let (Some(document_id), Some(store)) = (document_filter, &self.store) else {
            return Ok(None);
        };

        match store.get_document(document_id).await? {
            Some(record) => Ok(Some(HashMap::from([(
                "filename".to_string(),
                record.filename,
            )]))),
            None => Ok(None),
        }
    }
}

/// Distinct source filenames in first-seen order; missing metadata shows
/// as "Unknown".
fn distinct_sources(metadata: &[HashMap<String, String>]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    metadata
        .iter()
        .map(|m| {
            m.get("filename")
                .cloned()
                .unwrap_or_else(|| "Unknown".to_string())
        })
        .filter(|name| seen.insert(name.clone()))
        .collect()
}
