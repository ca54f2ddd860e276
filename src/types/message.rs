use serde::{Deserialize, Serialize};

/// A single message in a conversation, immutable once appended to history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// The role of the message.
    pub role: MessageRole,

    /// The text content of the message.
    pub content: String,
}

/// Role type for a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User role.
    User,

    /// Assistant role.
    Assistant,
}

impl Message {
    /// Create a new `Message` with the given role and content.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a new user `Message`.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create a new assistant `Message`.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }
}

impl From<&str> for Message {
    fn from(content: &str) -> Self {
        Self::user(content)
    }
}

impl From<String> for Message {
    fn from(content: String) -> Self {
        Self::user(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn serializes_with_lowercase_role() {
        let message = Message::user("Hello");
        let json = to_value(&message).unwrap();
        assert_eq!(
            json,
            json!({
                "role": "user",
                "content": "Hello"
            })
        );

        let message = Message::assistant("Hi there");
        let json = to_value(&message).unwrap();
        assert_eq!(
            json,
            json!({
                "role": "assistant",
                "content": "Hi there"
            })
        );
    }

    #[test]
    fn round_trips() {
        let message = Message::assistant("streamed reply");
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(message, back);
    }

    #[test]
    fn message_from_str_is_user() {
        let message: Message = "hello".into();
        assert_eq!(message.role, MessageRole::User);
    }
}
