//! Document store trait: the narrow persistence seam.
//!
//! Durable storage of documents, conversations, and messages belongs to the
//! surrounding service; the query path only reads document metadata (to turn
//! a document filter into a retrieval filter) and appends exchanged messages.
//! No schema is owned here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::message::Role;

/// Metadata for one uploaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Unique document ID.
    pub id: String,

    /// Original filename.
    pub filename: String,

    /// When the document was uploaded.
    pub uploaded_at: DateTime<Utc>,

    /// How many chunks the document was split into.
    pub chunk_count: usize,

    /// Size of the original file in bytes.
    pub file_size: u64,
}

/// One durably stored conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub conversation_id: String,
    pub role: Role,
    pub content: String,

    /// Source filenames attached to assistant answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

/// The persistence collaborator interface.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up a document's metadata by ID.
    async fn get_document(
        &self,
        document_id: &str,
    ) -> std::result::Result<Option<DocumentRecord>, StoreError>;

    /// Append a message to a conversation.
    async fn add_message(&self, message: StoredMessage) -> std::result::Result<(), StoreError>;
}
