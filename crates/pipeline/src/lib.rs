//! The ragline response pipeline.
//!
//! One query flows through a strictly sequential protocol:
//!
//! 1. **Assemble context**: retrieved passages and trailing history become
//!    two bounded text blocks
//! 2. **First pass**: a grounded answering call that must stay inside the
//!    document context
//! 3. **Refinement**: a second call rewrites the draft for natural tone
//!    without inventing facts
//! 4. **Memory update**: the exchange is appended to the bounded
//!    per-conversation memory under a derived key
//!
//! Any stage failure aborts the whole query; failed queries leave no trace
//! in conversation memory.

pub mod context;
pub mod memory;
pub mod pipeline;
pub mod service;

pub use context::{ContextAssembler, NO_CONTEXT_SENTINEL};
pub use memory::{ConversationMemory, PipelineExchange};
pub use pipeline::{
    NEW_CONVERSATION_KEY, PipelineResult, ResponsePipeline, StageOutcome, StageStatus,
    conversation_key,
};
pub use service::{QueryOutcome, QueryService};

#[cfg(test)]
pub(crate) mod test_helpers;
