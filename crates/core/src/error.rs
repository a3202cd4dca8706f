//! Error types for the ragline domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.
//!
//! Propagation policy: no component performs local recovery. Every failure
//! aborts the query it belongs to and surfaces to the caller as a structured
//! error. The one exception is model listing on the gateway, which backs a
//! liveness probe and degrades to an empty list instead of failing.

use thiserror::Error;

/// The top-level error type for all ragline operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Pipeline errors ---
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Document store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures at the generation-backend boundary.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The backend call itself failed (network, auth, quota, bad payload).
    /// Never retried; the pipeline stage that issued it sees it as-is.
    #[error("Backend request failed: {0}")]
    BackendFailure(String),

    /// The backend answered but carried zero candidates. A failure,
    /// not "no answer".
    #[error("Backend returned an empty candidate list")]
    EmptyResponse,
}

/// Failures of the two-stage response pipeline. Each wraps the gateway
/// error that caused it; the query aborts with no partial output.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("First generation pass failed: {0}")]
    FirstPassFailed(#[source] GatewayError),

    #[error("Refinement pass failed: {0}")]
    RefinementFailed(#[source] GatewayError),

    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
}

/// Collaborator-originated retrieval failure. The pipeline does not
/// interpret it, only forwards it.
#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Retrieval provider failed: {0}")]
    ProviderFailure(String),
}

/// Document store failures.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),
}
