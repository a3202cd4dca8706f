//! Shared test helpers for pipeline tests.

use std::sync::Mutex;

use async_trait::async_trait;
use ragline_core::error::GatewayError;
use ragline_core::gateway::{Gateway, GatewayRequest, GenerationResult, TokenUsage};

/// A mock gateway that returns a sequence of scripted outcomes.
///
/// Each call to `complete` consumes the next outcome in the queue and
/// records the request it was given. Panics if more calls are made than
/// outcomes provided.
pub struct SequentialMockGateway {
    outcomes: Mutex<Vec<Result<GenerationResult, GatewayError>>>,
    requests: Mutex<Vec<GatewayRequest>>,
    cursor: Mutex<usize>,
}

impl SequentialMockGateway {
    pub fn new(outcomes: Vec<Result<GenerationResult, GatewayError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes),
            requests: Mutex::new(Vec::new()),
            cursor: Mutex::new(0),
        }
    }

    /// A gateway that answers each call with the next text in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_result(t))).collect())
    }

    /// A gateway that answers the first call, then fails the second.
    pub fn text_then_failure(text: &str, error: GatewayError) -> Self {
        Self::new(vec![Ok(make_result(text)), Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.cursor.lock().unwrap()
    }

    /// The requests seen so far, in call order.
    pub fn requests(&self) -> Vec<GatewayRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for SequentialMockGateway {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(
        &self,
        request: GatewayRequest,
    ) -> Result<GenerationResult, GatewayError> {
        let mut cursor = self.cursor.lock().unwrap();
        let outcomes = self.outcomes.lock().unwrap();

        if *cursor >= outcomes.len() {
            panic!(
                "SequentialMockGateway: no more outcomes (call #{}, have {})",
                *cursor,
                outcomes.len()
            );
        }

        self.requests.lock().unwrap().push(request);
        let outcome = outcomes[*cursor].clone();
        *cursor += 1;
        outcome
    }
}

/// Build a canonical result carrying the given text.
pub fn make_result(text: &str) -> GenerationResult {
    GenerationResult {
        text: text.into(),
        finish_reason: "stop".into(),
        usage: TokenUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        },
        model_name: "mock-model".into(),
    }
}
