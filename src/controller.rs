//! The chat controller: one request/response cycle at a time.
//!
//! The controller validates input, snapshots the active session, drives
//! the streaming response through a [`Renderer`], and commits the
//! completed turn back to the [`SessionStore`]. A turn is bound to the
//! session that was active when it started: the history snapshot is not
//! re-read mid-flight, and completion targets the originating session id
//! even if the active session has changed or been deleted since (a write
//! to a deleted id is a no-op).

use futures::StreamExt;

use crate::client::Responder;
use crate::error::Result;
use crate::observability::{TURNS_COMPLETED, TURNS_FAILED, TURNS_REJECTED};
use crate::render::{MarkupConverter, PassthroughMarkup, Renderer, TurnContext};
use crate::session_store::{Confirm, SessionStore};
use crate::store::DurableStore;
use crate::types::{ChatRequest, Message};

/// State of the controller's submission cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ControllerState {
    /// Ready to accept a submission.
    Idle,
    /// A request is in flight; further submissions are rejected.
    AwaitingResponse,
}

/// Result of a submission attempt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The input was empty or a cycle was already in flight; no side
    /// effects occurred.
    Rejected,
    /// The turn completed and the (user, assistant) pair was persisted.
    Completed,
}

/// Orchestrates chat turns against a [`Responder`] and a [`SessionStore`].
pub struct ChatController<S: DurableStore, R: Responder> {
    responder: R,
    sessions: SessionStore<S>,
    markup: Box<dyn MarkupConverter>,
    state: ControllerState,
    next_turn: u64,
}

impl<S: DurableStore, R: Responder> ChatController<S, R> {
    /// Creates a controller with passthrough markup conversion.
    pub fn new(responder: R, sessions: SessionStore<S>) -> Self {
        Self {
            responder,
            sessions,
            markup: Box::new(PassthroughMarkup),
            state: ControllerState::Idle,
            next_turn: 0,
        }
    }

    /// Replaces the markup converter used for partial renders.
    pub fn with_markup(mut self, markup: impl MarkupConverter + 'static) -> Self {
        self.markup = Box::new(markup);
        self
    }

    /// Returns the current cycle state.
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Returns the session store for inspection.
    pub fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Creates a new session and makes it active.
    pub fn new_session(&mut self) -> Result<String> {
        self.sessions.create()
    }

    /// Deletes a session after confirmation.
    ///
    /// An in-flight turn against the deleted session still completes its
    /// network read; its final write simply targets an absent id.
    pub fn delete_session(&mut self, id: &str, confirm: &dyn Confirm) -> Result<()> {
        self.sessions.delete(id, confirm)
    }

    /// Makes a session active and returns its history for rendering.
    pub fn activate(&mut self, id: &str) -> Result<Option<Vec<Message>>> {
        Ok(self.sessions.set_active(id)?.map(|h| h.to_vec()))
    }

    /// Submits a user message and streams the response.
    ///
    /// Empty (after trimming) input and submissions made while a cycle is
    /// outstanding are rejected silently with no side effects. On success
    /// exactly two messages are appended to the originating session's
    /// history. On failure the error indicator is rendered, nothing is
    /// persisted, and the error is returned; the controller is ready for
    /// the next submission on every path.
    pub async fn submit(
        &mut self,
        input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<SubmitOutcome> {
        let text = input.trim();
        if text.is_empty() || self.state == ControllerState::AwaitingResponse {
            TURNS_REJECTED.click();
            return Ok(SubmitOutcome::Rejected);
        }

        // Bind the turn to the session active right now; chunk renders and
        // the final write all target this id.
        let session_id = self.sessions.active_id().to_string();
        let snapshot = self.sessions.active_history().to_vec();
        self.next_turn += 1;
        let context = TurnContext {
            turn: self.next_turn,
            session_id: session_id.clone(),
        };

        renderer.show_user(&context, text);
        renderer.show_pending(&context);

        self.state = ControllerState::AwaitingResponse;
        let outcome = self
            .run_turn(text, snapshot.clone(), &context, renderer)
            .await;
        self.state = ControllerState::Idle;

        match outcome {
            Ok(full_response) => {
                let mut history = snapshot;
                history.push(Message::user(text));
                history.push(Message::assistant(full_response));
                self.sessions.update_history(&session_id, history)?;
                self.sessions.update_title_once(&session_id, text)?;
                renderer.finish_turn(&context);
                TURNS_COMPLETED.click();
                Ok(SubmitOutcome::Completed)
            }
            Err(err) => {
                renderer.show_error(&context, &err.to_string());
                TURNS_FAILED.click();
                Err(err)
            }
        }
    }

    async fn run_turn(
        &self,
        message: &str,
        snapshot: Vec<Message>,
        context: &TurnContext,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let request = ChatRequest::streaming(message, snapshot);
        let mut stream = self.responder.stream_chat(request).await?;

        let mut accumulated = String::new();
        while let Some(chunk) = stream.next().await {
            accumulated.push_str(&chunk?);
            renderer.replace_partial(context, &self.markup.convert(&accumulated));
        }
        Ok(accumulated)
    }
}
