//! # ragline core
//!
//! Domain types, traits, and error definitions for the ragline
//! retrieval-augmented answering pipeline. This crate carries no HTTP or
//! runtime dependencies: it defines the domain model that the other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator the pipeline talks to (generation backend, retrieval
//! provider, document store) is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping backends via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod gateway;
pub mod message;
pub mod retrieval;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayError, PipelineError, Result, RetrievalError, StoreError};
pub use gateway::{ChatMessage, Gateway, GatewayRequest, GenerationResult, ModelInfo, TokenUsage};
pub use message::{ConversationTurn, Role};
pub use retrieval::{RetrievalProvider, RetrievedPassage, SearchResults};
pub use store::{DocumentRecord, DocumentStore, StoredMessage};
