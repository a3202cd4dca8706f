//! The two-stage response pipeline.
//!
//! One query moves through a fixed sequence with no branching and no retry:
//! first a grounded answering pass, then a tone-refinement pass over the
//! draft, then a memory update under the derived conversation key. A stage
//! failure aborts the query before the memory update, so failed queries
//! leave no trace in conversation memory.

use std::sync::Arc;

use ragline_config::{AppConfig, GenerationConfig, PromptConfig, RefinementFailurePolicy};
use ragline_core::error::PipelineError;
use ragline_core::gateway::{ChatMessage, Gateway, GatewayRequest, GenerationResult};
use ragline_core::message::{ConversationTurn, Role};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::context::ContextAssembler;
use crate::memory::{ConversationMemory, PipelineExchange};

/// The key used when history is empty or contains no user turn.
pub const NEW_CONVERSATION_KEY: &str = "new_conversation";

/// Outcome of one generation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    Failed,
}

/// Per-stage outcomes reported with every successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageStatus {
    pub first_pass: StageOutcome,
    pub refinement: StageOutcome,
}

/// The terminal output of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The refined answer returned to the caller.
    pub final_response: String,

    /// The raw retrieved passage texts, unmodified.
    pub context_used: Vec<String>,

    /// The derived conversation key this exchange was remembered under.
    pub conversation_key: String,

    /// The unrefined first-pass answer, exposed for caller-side
    /// transparency and debugging.
    pub first_stage_response: String,

    /// What happened in each stage.
    pub stage_status: StageStatus,
}

/// Orchestrates the two-stage generation protocol over one gateway and one
/// injected conversation memory.
pub struct ResponsePipeline {
    gateway: Arc<dyn Gateway>,
    memory: Arc<ConversationMemory>,
    assembler: ContextAssembler,
    generation: GenerationConfig,
    prompts: PromptConfig,
    on_refinement_failure: RefinementFailurePolicy,
    /// Model override; `None` uses the gateway's configured default.
    model: Option<String>,
}

impl ResponsePipeline {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        memory: Arc<ConversationMemory>,
        config: &AppConfig,
    ) -> Self {
        Self {
            gateway,
            memory,
            assembler: ContextAssembler::new(config.pipeline.history_window),
            generation: config.generation.clone(),
            prompts: config.prompts.clone(),
            on_refinement_failure: config.pipeline.on_refinement_failure,
            model: None,
        }
    }

    /// Pin a specific model instead of the gateway default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Run one query through the full protocol.
    ///
    /// `retrieved_context` is the ranked passage list for this query;
    /// `history` is caller-ordered, oldest-first. Both may be empty.
    pub async fn process_query(
        &self,
        query: &str,
        retrieved_context: &[String],
        history: &[ConversationTurn],
    ) -> Result<PipelineResult, PipelineError> {
        let document_block = self.assembler.document_block(retrieved_context);
        let history_block = self.assembler.history_block(history);

        // ── First pass: answer strictly from the given context ──
        info!(passages = retrieved_context.len(), "Pipeline: first pass");
        let first = self
            .first_pass(query, &document_block, &history_block)
            .await
            .map_err(PipelineError::FirstPassFailed)?;

        debug!(draft_len = first.text.len(), "Pipeline: first pass complete");

        // ── Refinement: rewrite the draft for tone, same grounding ──
        let (final_text, refinement_outcome) = match self
            .refine(query, &first.text, &document_block, &history_block)
            .await
        {
            Ok(refined) => (refined.text, StageOutcome::Completed),
            Err(cause) => match self.on_refinement_failure {
                RefinementFailurePolicy::Fail => {
                    return Err(PipelineError::RefinementFailed(cause));
                }
                RefinementFailurePolicy::FallBackToFirstPass => {
                    info!(error = %cause, "Pipeline: refinement failed, degrading to first pass");
                    (first.text.clone(), StageOutcome::Failed)
                }
            },
        };

        // ── Memory update ──
        let conversation_key = conversation_key(history);
        self.memory
            .append(
                &conversation_key,
                PipelineExchange {
                    query: query.to_string(),
                    context_used: retrieved_context.to_vec(),
                    first_stage_response: first.text.clone(),
                    final_response: final_text.clone(),
                },
            )
            .await;

        info!(key = %conversation_key, "Pipeline: query complete");

        Ok(PipelineResult {
            final_response: final_text,
            context_used: retrieved_context.to_vec(),
            conversation_key,
            first_stage_response: first.text,
            stage_status: StageStatus {
                first_pass: StageOutcome::Completed,
                refinement: refinement_outcome,
            },
        })
    }

    /// Read-only view of the remembered exchanges for a key.
    pub async fn exchanges(&self, conversation_key: &str) -> Vec<PipelineExchange> {
        self.memory.exchanges(conversation_key).await
    }

    async fn first_pass(
        &self,
        query: &str,
        document_block: &str,
        history_block: &str,
    ) -> Result<GenerationResult, ragline_core::error::GatewayError> {
        let prompt = format!(
            "{}\n\n\
Previous conversation context:\n{}\n\n\
Document context to answer from:\n{}\n\n\
User's question: {}\n\n\
Answer the question based on the document context above. If the information \
isn't in the context, say so clearly. Give a natural, conversational response.",
            self.prompts.first_pass_system, history_block, document_block, query
        );

        let request = GatewayRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(&self.prompts.first_pass_system),
                ChatMessage::user(prompt),
            ],
            temperature: self.generation.first_pass.temperature,
            max_tokens: Some(self.generation.first_pass.max_tokens),
            options: serde_json::Map::new(),
        };

        self.gateway.complete(request).await
    }

    async fn refine(
        &self,
        query: &str,
        draft: &str,
        document_block: &str,
        history_block: &str,
    ) -> Result<GenerationResult, ragline_core::error::GatewayError> {
        let prompt = format!(
            "{}\n\n\
Previous conversation:\n{}\n\n\
Document context:\n{}\n\n\
Original question: {}\n\n\
Current response to improve:\n{}\n\n\
Make this response sound more natural and conversational. Remove any formal \
or robotic language. Keep it concise but friendly.",
            self.prompts.refinement_system, history_block, document_block, query, draft
        );

        let request = GatewayRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(&self.prompts.refinement_system),
                ChatMessage::user(prompt),
            ],
            temperature: self.generation.refinement.temperature,
            max_tokens: Some(self.generation.refinement.max_tokens),
            options: serde_json::Map::new(),
        };

        self.gateway.complete(request).await
    }
}

/// Derive the conversation key from supplied history.
///
/// The key is a stable hash of the first user turn's content, reduced to a
/// bounded numeric range, so identical leading user content always maps to
/// the same key: within a process and across restarts. History without a
/// user turn maps to the fixed [`NEW_CONVERSATION_KEY`].
pub fn conversation_key(history: &[ConversationTurn]) -> String {
    let Some(first_user) = history.iter().find(|turn| turn.role == Role::User) else {
        return NEW_CONVERSATION_KEY.to_string();
    };

    let digest = Sha256::digest(first_user.content.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    let reduced = u64::from_be_bytes(prefix) % 10_000;

    format!("conv_{reduced}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::SequentialMockGateway;
    use ragline_core::error::GatewayError;
    use ragline_core::gateway::ChatRole;

    fn setup(
        gateway: SequentialMockGateway,
    ) -> (Arc<SequentialMockGateway>, Arc<ConversationMemory>, ResponsePipeline) {
        let gateway = Arc::new(gateway);
        let memory = Arc::new(ConversationMemory::new(16, 16));
        let pipeline =
            ResponsePipeline::new(gateway.clone(), memory.clone(), &AppConfig::default());
        (gateway, memory, pipeline)
    }

    // --- Conversation key derivation ---

    #[test]
    fn key_is_deterministic_for_identical_leading_content() {
        let a = vec![ConversationTurn::user("hello")];
        let b = vec![ConversationTurn::user("hello")];
        assert_eq!(conversation_key(&a), conversation_key(&b));
        assert!(conversation_key(&a).starts_with("conv_"));
    }

    #[test]
    fn key_ignores_turns_after_the_first_user_turn() {
        let short = vec![ConversationTurn::user("hello")];
        let long = vec![
            ConversationTurn::user("hello"),
            ConversationTurn::assistant("hi!"),
            ConversationTurn::user("more"),
        ];
        assert_eq!(conversation_key(&short), conversation_key(&long));
    }

    #[test]
    fn empty_history_is_a_new_conversation() {
        assert_eq!(conversation_key(&[]), "new_conversation");
    }

    #[test]
    fn all_assistant_history_is_a_new_conversation() {
        let history = vec![ConversationTurn::assistant("welcome!")];
        assert_eq!(conversation_key(&history), "new_conversation");
    }

    #[test]
    fn key_skips_leading_assistant_turns() {
        let history = vec![
            ConversationTurn::assistant("welcome!"),
            ConversationTurn::user("hello"),
        ];
        assert_eq!(
            conversation_key(&history),
            conversation_key(&[ConversationTurn::user("hello")])
        );
    }

    // --- End-to-end protocol ---

    #[tokio::test]
    async fn end_to_end_issues_two_calls_and_remembers_the_exchange() {
        let (gateway, memory, pipeline) =
            setup(SequentialMockGateway::texts(&["draft answer", "polished answer"]));

        let passages = vec!["Refunds are processed within 5 days.".to_string()];
        let result = pipeline
            .process_query("What is the refund policy?", &passages, &[])
            .await
            .unwrap();

        assert_eq!(gateway.call_count(), 2);
        assert_eq!(result.final_response, "polished answer");
        assert_eq!(result.first_stage_response, "draft answer");
        assert_eq!(result.context_used, passages);
        assert_eq!(result.conversation_key, "new_conversation");
        assert_eq!(result.stage_status.first_pass, StageOutcome::Completed);
        assert_eq!(result.stage_status.refinement, StageOutcome::Completed);

        let remembered = memory.exchanges("new_conversation").await;
        assert_eq!(remembered.len(), 1);
        assert_eq!(remembered[0].query, "What is the refund policy?");
        assert_eq!(remembered[0].final_response, "polished answer");
    }

    #[tokio::test]
    async fn stage_prompts_carry_the_context_blocks() {
        let (gateway, _memory, pipeline) =
            setup(SequentialMockGateway::texts(&["draft", "final"]));

        let passages = vec!["A".to_string(), "B".to_string()];
        let history = vec![
            ConversationTurn::user("earlier question"),
            ConversationTurn::assistant("earlier answer"),
        ];
        pipeline
            .process_query("now?", &passages, &history)
            .await
            .unwrap();

        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);

        // Stage 1: system directive plus a user prompt holding both blocks.
        let first = &requests[0];
        assert_eq!(first.messages[0].role, ChatRole::System);
        assert!(first.messages[1].content.contains("A\n\nB"));
        assert!(first.messages[1].content.contains("user: earlier question"));
        assert!(first.messages[1].content.contains("User's question: now?"));
        assert!((first.temperature - 0.4).abs() < f32::EPSILON);
        assert_eq!(first.max_tokens, Some(400));

        // Stage 2: same blocks plus the draft, slightly cooler.
        let second = &requests[1];
        assert!(second.messages[1].content.contains("A\n\nB"));
        assert!(second.messages[1].content.contains("draft"));
        assert!(second.messages[1].content.contains("Original question: now?"));
        assert!((second.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn empty_context_reads_the_sentinel_to_both_stages() {
        let (gateway, _memory, pipeline) =
            setup(SequentialMockGateway::texts(&["draft", "final"]));

        pipeline.process_query("anything?", &[], &[]).await.unwrap();

        for request in gateway.requests() {
            assert!(request.messages[1]
                .content
                .contains("No relevant context found."));
        }
    }

    #[tokio::test]
    async fn first_pass_failure_aborts_before_any_memory_write() {
        let (gateway, memory, pipeline) = setup(SequentialMockGateway::new(vec![Err(
            GatewayError::BackendFailure("boom".into()),
        )]));

        let err = pipeline
            .process_query("q", &[], &[])
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::FirstPassFailed(_)));
        assert_eq!(gateway.call_count(), 1);
        assert!(memory.exchanges("new_conversation").await.is_empty());
    }

    #[tokio::test]
    async fn refinement_failure_never_surfaces_the_draft() {
        let (gateway, memory, pipeline) = setup(SequentialMockGateway::text_then_failure(
            "secret draft",
            GatewayError::EmptyResponse,
        ));

        let history = vec![ConversationTurn::user("hello")];
        let key = conversation_key(&history);
        let err = pipeline
            .process_query("q", &[], &history)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::RefinementFailed(_)));
        assert_eq!(gateway.call_count(), 2);
        assert!(memory.exchanges(&key).await.is_empty());
    }

    #[tokio::test]
    async fn failed_query_leaves_existing_memory_untouched() {
        let gateway = Arc::new(SequentialMockGateway::new(vec![
            Ok(crate::test_helpers::make_result("draft")),
            Ok(crate::test_helpers::make_result("final")),
            Err(GatewayError::BackendFailure("down".into())),
        ]));
        let memory = Arc::new(ConversationMemory::new(16, 16));
        let pipeline =
            ResponsePipeline::new(gateway.clone(), memory.clone(), &AppConfig::default());

        let history = vec![ConversationTurn::user("hello")];
        let key = conversation_key(&history);

        pipeline.process_query("q1", &[], &history).await.unwrap();
        let before = memory.exchanges(&key).await;

        let err = pipeline.process_query("q2", &[], &history).await.unwrap_err();
        assert!(matches!(err, PipelineError::FirstPassFailed(_)));

        let after = memory.exchanges(&key).await;
        assert_eq!(before.len(), after.len());
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn fallback_policy_degrades_to_the_draft_and_records_it() {
        let gateway = Arc::new(SequentialMockGateway::text_then_failure(
            "draft answer",
            GatewayError::EmptyResponse,
        ));
        let memory = Arc::new(ConversationMemory::new(16, 16));
        let mut config = AppConfig::default();
        config.pipeline.on_refinement_failure = RefinementFailurePolicy::FallBackToFirstPass;
        let pipeline = ResponsePipeline::new(gateway.clone(), memory.clone(), &config);

        let result = pipeline.process_query("q", &[], &[]).await.unwrap();

        assert_eq!(result.final_response, "draft answer");
        assert_eq!(result.stage_status.refinement, StageOutcome::Failed);
        assert_eq!(memory.exchanges("new_conversation").await.len(), 1);
    }

    #[tokio::test]
    async fn pinned_model_reaches_the_gateway() {
        let gateway = Arc::new(SequentialMockGateway::texts(&["draft", "final"]));
        let memory = Arc::new(ConversationMemory::new(16, 16));
        let pipeline =
            ResponsePipeline::new(gateway.clone(), memory.clone(), &AppConfig::default())
                .with_model("llama3-70b-8192");

        pipeline.process_query("q", &[], &[]).await.unwrap();

        for request in gateway.requests() {
            assert_eq!(request.model.as_deref(), Some("llama3-70b-8192"));
        }
    }
}
