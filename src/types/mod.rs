// Public modules
pub mod chat_request;
pub mod message;
pub mod session;

// Re-exports
pub use chat_request::{ChatRequest, ChatResponse};
pub use message::{Message, MessageRole};
pub use session::{SENTINEL_TITLE, Session, fresh_session_id};
