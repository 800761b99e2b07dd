//! Chat backend seam
//!
//! Conversational logic lives behind [`ChatBackend`]. The server ships with
//! a canned responder; a real assistant plugs in by implementing the trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Validated chat turn from a widget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub microsite: Option<String>,
    /// Prior turns, passed through untouched
    #[serde(default)]
    pub conversation: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Chat backend unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn reply(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

/// Replies with a fixed message
pub struct CannedChatBackend {
    reply: String,
}

impl CannedChatBackend {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
        }
    }
}

#[async_trait]
impl ChatBackend for CannedChatBackend {
    async fn reply(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        tracing::debug!(
            project_id = %request.project_id,
            turns = request.conversation.len(),
            "Answering chat with canned reply"
        );
        Ok(ChatReply {
            reply: self.reply.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_canned_reply() {
        let backend = CannedChatBackend::new("An agent will call you back.");
        let reply = backend
            .reply(&ChatRequest {
                message: "Is parking included?".to_string(),
                project_id: "5796".to_string(),
                microsite: None,
                conversation: vec![],
            })
            .await
            .unwrap();
        assert_eq!(reply.reply, "An agent will call you back.");
    }
}
