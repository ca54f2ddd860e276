//! Integration tests for the metrochat library.
//! These drive the public API end-to-end with an in-process responder.

use futures::stream;
use metrochat::{
    AlwaysConfirm, ChatController, ChatRequest, Error, FileStore, MemoryStore, Message,
    RecordingRenderer, Responder, Result, SENTINEL_TITLE, SessionStore, SubmitOutcome, TextStream,
};

/// Replays a fixed sequence of chunks, or fails, without a network.
struct ScriptedResponder {
    script: Vec<std::result::Result<&'static str, &'static str>>,
    reject_request: bool,
}

impl ScriptedResponder {
    fn chunks(script: Vec<&'static str>) -> Self {
        Self {
            script: script.into_iter().map(Ok).collect(),
            reject_request: false,
        }
    }

    fn failing_after(script: Vec<&'static str>, error: &'static str) -> Self {
        let mut script: Vec<_> = script.into_iter().map(Ok).collect();
        script.push(Err(error));
        Self {
            script,
            reject_request: false,
        }
    }

    fn failing_request() -> Self {
        Self {
            script: Vec::new(),
            reject_request: true,
        }
    }
}

#[async_trait::async_trait]
impl Responder for ScriptedResponder {
    async fn stream_chat(&self, request: ChatRequest) -> Result<TextStream> {
        assert!(request.stream);
        if self.reject_request {
            return Err(Error::api(502, "upstream unavailable"));
        }
        let items: Vec<Result<String>> = self
            .script
            .iter()
            .map(|item| match item {
                Ok(chunk) => Ok(chunk.to_string()),
                Err(message) => Err(Error::streaming(*message, None)),
            })
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }
}

#[test]
fn empty_store_loads_one_active_default_session() {
    let store = SessionStore::open(MemoryStore::new()).unwrap();
    assert_eq!(store.sessions().len(), 1);
    assert_eq!(store.sessions()[0].title, SENTINEL_TITLE);
    assert!(store.sessions()[0].history.is_empty());
    assert_eq!(store.active_id(), store.sessions()[0].id);
}

#[tokio::test]
async fn hello_turn_persists_pair_and_rewrites_title() {
    let sessions = SessionStore::open(MemoryStore::new()).unwrap();
    let responder = ScriptedResponder::chunks(vec!["Hel", "lo there"]);
    let mut controller = ChatController::new(responder, sessions);
    let mut renderer = RecordingRenderer::new();

    let outcome = controller.submit("hello", &mut renderer).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Completed);

    let history = controller.sessions().active_history();
    assert_eq!(
        history,
        &[Message::user("hello"), Message::assistant("Hello there")]
    );
    assert_eq!(controller.sessions().sessions()[0].title, "hello");
    assert_eq!(renderer.last_partial(), Some("Hello there"));
}

#[tokio::test]
async fn transport_failure_after_partial_chunks_discards_turn() {
    let sessions = SessionStore::open(MemoryStore::new()).unwrap();
    let responder = ScriptedResponder::failing_after(vec!["Hel"], "connection reset");
    let mut controller = ChatController::new(responder, sessions);
    let mut renderer = RecordingRenderer::new();

    let err = controller.submit("hello", &mut renderer).await.unwrap_err();
    assert!(err.is_streaming());

    // Nothing persisted, error made visible, ready for the next turn.
    assert!(controller.sessions().active_history().is_empty());
    assert_eq!(controller.sessions().sessions()[0].title, SENTINEL_TITLE);
    assert_eq!(renderer.errors().len(), 1);

    // Submission was re-enabled: a second attempt runs (and fails again).
    let _ = controller.submit("retry", &mut renderer).await;
    assert_eq!(renderer.errors().len(), 2);
}

#[tokio::test]
async fn rejected_request_renders_error_without_persisting() {
    let sessions = SessionStore::open(MemoryStore::new()).unwrap();
    let mut controller = ChatController::new(ScriptedResponder::failing_request(), sessions);
    let mut renderer = RecordingRenderer::new();

    let err = controller.submit("hello", &mut renderer).await.unwrap_err();
    assert_eq!(err.status_code(), Some(502));
    assert!(renderer.errors()[0].contains("upstream unavailable"));
    assert!(controller.sessions().active_history().is_empty());
}

#[test]
fn deleting_last_session_creates_a_fresh_one() {
    let mut store = SessionStore::open(MemoryStore::new()).unwrap();
    let only = store.sessions()[0].id.clone();

    store.delete(&only, &AlwaysConfirm).unwrap();

    assert_eq!(store.sessions().len(), 1);
    assert_ne!(store.sessions()[0].id, only);
    assert_eq!(store.sessions()[0].title, SENTINEL_TITLE);
    assert_eq!(store.active_id(), store.sessions()[0].id);
}

#[tokio::test]
async fn completed_turn_survives_a_reload() {
    let dir = std::env::temp_dir().join(format!("metrochat-it-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sessions.json");
    let _ = std::fs::remove_file(&path);

    let session_id;
    {
        let sessions = SessionStore::open(FileStore::open(&path).unwrap()).unwrap();
        let responder = ScriptedResponder::chunks(vec!["Nice to meet", " you"]);
        let mut controller = ChatController::new(responder, sessions);
        let mut renderer = RecordingRenderer::new();

        controller.submit("hi there", &mut renderer).await.unwrap();
        session_id = controller.sessions().active_id().to_string();
    }

    let reloaded = SessionStore::open(FileStore::open(&path).unwrap()).unwrap();
    assert_eq!(reloaded.active_id(), session_id);
    assert_eq!(
        reloaded.active_history(),
        &[
            Message::user("hi there"),
            Message::assistant("Nice to meet you"),
        ]
    );
    assert_eq!(reloaded.sessions()[0].title, "hi there");

    std::fs::remove_file(&path).unwrap();
}

#[tokio::test]
async fn turn_completing_after_session_switch_targets_origin() {
    let sessions = SessionStore::open(MemoryStore::new()).unwrap();
    let responder = ScriptedResponder::chunks(vec!["answer"]);
    let mut controller = ChatController::new(responder, sessions);
    let mut renderer = RecordingRenderer::new();

    let origin = controller.sessions().active_id().to_string();
    controller.submit("question", &mut renderer).await.unwrap();

    // Navigate away afterwards; the completed turn stayed with its origin.
    let other = controller.new_session().unwrap();
    assert_eq!(controller.sessions().active_id(), other);
    assert!(controller.sessions().active_history().is_empty());

    let history = controller.activate(&origin).unwrap().unwrap();
    assert_eq!(history.len(), 2);
}
