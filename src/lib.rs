// Public modules
pub mod client;
pub mod controller;
pub mod error;
pub mod ingest;
pub mod observability;
pub mod render;
pub mod session_store;
pub mod store;
pub mod types;

// Re-exports
pub use client::{ChatClient, Responder, TextStream};
pub use controller::{ChatController, ControllerState, SubmitOutcome};
pub use error::{Error, Result};
pub use ingest::{Utf8StreamDecoder, text_chunks};
pub use observability::register_biometrics;
pub use render::{
    MarkupConverter, PassthroughMarkup, PlainTextRenderer, RecordingRenderer, RenderEvent,
    Renderer, TurnContext,
};
pub use session_store::{ACTIVE_KEY, AlwaysConfirm, Confirm, SESSIONS_KEY, SessionStore};
pub use store::{DurableStore, FileStore, MemoryStore};
pub use types::*;
