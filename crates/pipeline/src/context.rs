//! Context assembly: the two textual blocks every generation stage needs.
//!
//! Pure and stateless: the same inputs always produce the same two strings,
//! with no I/O and no side effects.

use ragline_core::message::ConversationTurn;

/// Stands in for an empty passage list in the document block. Prompts must
/// never see an empty string meaning "no context": that would be ambiguous
/// with a genuinely empty passage.
pub const NO_CONTEXT_SENTINEL: &str = "No relevant context found.";

/// Builds the document and history blocks under explicit size policy.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    /// How many trailing history turns enter the history block.
    history_window: usize,
}

impl ContextAssembler {
    pub fn new(history_window: usize) -> Self {
        Self { history_window }
    }

    /// Join retrieved passages with a blank-line separator.
    ///
    /// Empty input yields [`NO_CONTEXT_SENTINEL`], which the prompt reads
    /// aloud to the model as explicit absence.
    pub fn document_block(&self, passages: &[String]) -> String {
        if passages.is_empty() {
            NO_CONTEXT_SENTINEL.to_string()
        } else {
            passages.join("\n\n")
        }
    }

    /// Render the trailing history window, oldest-first, one
    /// `"role: content"` line per turn.
    ///
    /// Empty history yields an empty string, not a sentinel: "no history"
    /// is not announced to the model the way "no documents" is.
    pub fn history_block(&self, history: &[ConversationTurn]) -> String {
        let start = history.len().saturating_sub(self.history_window);
        history[start..]
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(5)
    }
}
