use serde::{Deserialize, Serialize};

use crate::types::Message;

/// Body of a chat request sent to the assistant endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The user's query.
    pub message: String,

    /// Prior conversation turns, oldest first.
    pub history: Vec<Message>,

    /// Whether the response should be streamed.
    pub stream: bool,
}

impl ChatRequest {
    /// Creates a streaming chat request.
    pub fn streaming(message: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            history,
            stream: true,
        }
    }

    /// Creates a non-streaming chat request.
    pub fn non_streaming(message: impl Into<String>, history: Vec<Message>) -> Self {
        Self {
            message: message.into(),
            history,
            stream: false,
        }
    }
}

/// Response body of the non-streaming chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatResponse {
    /// The assistant's full reply.
    pub response: String,

    /// Updated context/history as reported by the server.
    #[serde(default)]
    pub context: Vec<Message>,
}
