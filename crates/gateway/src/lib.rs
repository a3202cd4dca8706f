//! Generation gateway implementations for ragline.
//!
//! All gateways implement the `ragline_core::Gateway` trait. The pipeline
//! calls `complete()` without knowing which backend answers.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatGateway;
