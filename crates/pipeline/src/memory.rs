//! Bounded per-conversation transient memory.
//!
//! An explicitly owned, injected store with two bounds: a cap on held
//! conversations (least-recently-updated evicted first) and a cap on
//! exchanges per conversation (oldest dropped first). It is never persisted
//! or loaded from storage.

use std::collections::HashMap;

use ragline_config::MemoryConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

/// One completed query exchange, as remembered per conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineExchange {
    /// The user's query.
    pub query: String,

    /// The raw retrieved passage texts used for this query.
    pub context_used: Vec<String>,

    /// The unrefined first-pass answer.
    pub first_stage_response: String,

    /// The answer returned to the caller.
    pub final_response: String,
}

struct Slot {
    exchanges: Vec<PipelineExchange>,
    /// Logical timestamp of the last append; drives eviction order.
    touched: u64,
}

struct Inner {
    slots: HashMap<String, Slot>,
    clock: u64,
}

/// The conversation memory table.
///
/// A single write lock makes each append atomic with respect to other
/// appends on the same key; concurrent appends to different keys simply
/// serialize briefly.
pub struct ConversationMemory {
    inner: RwLock<Inner>,
    max_conversations: usize,
    max_exchanges_per_conversation: usize,
}

impl ConversationMemory {
    pub fn new(max_conversations: usize, max_exchanges_per_conversation: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                slots: HashMap::new(),
                clock: 0,
            }),
            max_conversations,
            max_exchanges_per_conversation,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(
            config.max_conversations,
            config.max_exchanges_per_conversation,
        )
    }

    /// Append an exchange under `key`, creating the conversation if absent
    /// and evicting the least-recently-updated one when over capacity.
    pub async fn append(&self, key: &str, exchange: PipelineExchange) {
        let mut inner = self.inner.write().await;
        inner.clock += 1;
        let now = inner.clock;

        let slot = inner.slots.entry(key.to_string()).or_insert_with(|| Slot {
            exchanges: Vec::new(),
            touched: now,
        });
        slot.touched = now;
        slot.exchanges.push(exchange);

        if slot.exchanges.len() > self.max_exchanges_per_conversation {
            slot.exchanges.remove(0);
        }

        if inner.slots.len() > self.max_conversations {
            // Evict the conversation untouched the longest; the key we just
            // wrote carries the newest timestamp and is never the victim.
            if let Some(victim) = inner
                .slots
                .iter()
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(k, _)| k.clone())
            {
                debug!(key = %victim, "Evicting least-recently-updated conversation");
                inner.slots.remove(&victim);
            }
        }
    }

    /// The exchange list for a key; empty for unknown keys. Read-only
    /// introspection: never mutated externally.
    pub async fn exchanges(&self, key: &str) -> Vec<PipelineExchange> {
        let inner = self.inner.read().await;
        inner
            .slots
            .get(key)
            .map(|slot| slot.exchanges.clone())
            .unwrap_or_default()
    }

    /// How many conversations are currently held.
    pub async fn conversation_count(&self) -> usize {
        self.inner.read().await.slots.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(query: &str) -> PipelineExchange {
        PipelineExchange {
            query: query.into(),
            context_used: vec!["ctx".into()],
            first_stage_response: "draft".into(),
            final_response: "final".into(),
        }
    }

    #[tokio::test]
    async fn append_and_read_back() {
        let memory = ConversationMemory::new(8, 8);
        memory.append("conv_1", exchange("q1")).await;
        memory.append("conv_1", exchange("q2")).await;

        let exchanges = memory.exchanges("conv_1").await;
        assert_eq!(exchanges.len(), 2);
        assert_eq!(exchanges[0].query, "q1");
        assert_eq!(exchanges[1].query, "q2");
    }

    #[tokio::test]
    async fn unknown_key_reads_empty() {
        let memory = ConversationMemory::new(8, 8);
        assert!(memory.exchanges("never_seen").await.is_empty());
    }

    #[tokio::test]
    async fn per_conversation_cap_drops_oldest() {
        let memory = ConversationMemory::new(8, 3);
        for i in 0..5 {
            memory.append("conv_1", exchange(&format!("q{i}"))).await;
        }

        let exchanges = memory.exchanges("conv_1").await;
        assert_eq!(exchanges.len(), 3);
        assert_eq!(exchanges[0].query, "q2");
        assert_eq!(exchanges[2].query, "q4");
    }

    #[tokio::test]
    async fn conversation_cap_evicts_least_recently_updated() {
        let memory = ConversationMemory::new(2, 8);
        memory.append("conv_a", exchange("a")).await;
        memory.append("conv_b", exchange("b")).await;
        // Touch conv_a so conv_b becomes the eviction candidate.
        memory.append("conv_a", exchange("a2")).await;
        memory.append("conv_c", exchange("c")).await;

        assert_eq!(memory.conversation_count().await, 2);
        assert!(memory.exchanges("conv_b").await.is_empty());
        assert_eq!(memory.exchanges("conv_a").await.len(), 2);
        assert_eq!(memory.exchanges("conv_c").await.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_appends_to_same_key_all_land() {
        let memory = std::sync::Arc::new(ConversationMemory::new(8, 128));
        let mut handles = Vec::new();
        for i in 0..16 {
            let memory = memory.clone();
            handles.push(tokio::spawn(async move {
                memory.append("conv_1", exchange(&format!("q{i}"))).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(memory.exchanges("conv_1").await.len(), 16);
    }
}
