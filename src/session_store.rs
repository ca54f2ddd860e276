//! Session lifecycle and persistence.
//!
//! This module provides the [`SessionStore`], which owns the ordered list
//! of sessions and the active-session pointer, and reads/writes them
//! through a [`DurableStore`]. The two persisted keys are written
//! independently; there is no cross-key transaction, so the store repairs
//! a dangling active pointer on load instead of relying on atomicity.

use crate::error::Result;
use crate::store::DurableStore;
use crate::types::{Message, Session};

/// Durable-store key holding the serialized session collection.
pub const SESSIONS_KEY: &str = "metro_sessions";

/// Durable-store key holding the active session id.
pub const ACTIVE_KEY: &str = "metro_active_session";

/// Capability for confirming destructive operations.
///
/// Session deletion asks this capability before removing anything, so the
/// decision can come from a dialog, a prompt, or a test stub.
pub trait Confirm {
    /// Returns true if the described operation should proceed.
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A [`Confirm`] that approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _: &str) -> bool {
        true
    }
}

/// Owns the ordered session collection and the active-session pointer.
///
/// Invariants maintained by every operation:
/// - the collection is never empty,
/// - the active id always resolves to a member of the collection.
pub struct SessionStore<S: DurableStore> {
    store: S,
    sessions: Vec<Session>,
    active_id: String,
}

impl<S: DurableStore> SessionStore<S> {
    /// Opens a session store, loading persisted state immediately.
    pub fn open(store: S) -> Result<Self> {
        let mut this = Self {
            store,
            sessions: Vec::new(),
            active_id: String::new(),
        };
        this.load()?;
        Ok(this)
    }

    /// Reads the session collection and active pointer from the durable
    /// store, repairing them as needed, and returns the active session's
    /// history.
    ///
    /// A collection that fails to deserialize is treated as empty. An
    /// empty collection gets one default session. An active pointer that
    /// does not resolve is corrected to the first session's id.
    pub fn load(&mut self) -> Result<Vec<Message>> {
        self.sessions = match self.store.get(SESSIONS_KEY)? {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_default(),
            None => Vec::new(),
        };

        if self.sessions.is_empty() {
            self.create()?;
            return Ok(Vec::new());
        }

        let persisted = self.store.get(ACTIVE_KEY)?;
        let resolves = persisted
            .as_deref()
            .is_some_and(|id| self.sessions.iter().any(|s| s.id == id));
        if resolves {
            self.active_id = persisted.unwrap_or_default();
        } else {
            self.active_id = self.sessions[0].id.clone();
            self.persist_active()?;
        }

        Ok(self.active_history().to_vec())
    }

    /// Prepends a new session with a fresh id and empty history, makes it
    /// active, persists both keys, and returns its id.
    pub fn create(&mut self) -> Result<String> {
        let session = Session::new();
        let id = session.id.clone();
        self.sessions.insert(0, session);
        self.active_id = id.clone();
        self.persist_sessions()?;
        self.persist_active()?;
        Ok(id)
    }

    /// Removes the session with the given id after confirmation.
    ///
    /// A no-op when the id is absent or the confirmation is declined.
    /// Removal that empties the collection immediately creates a fresh
    /// default session. Deleting the active session re-points the active
    /// id at the new first element.
    pub fn delete(&mut self, id: &str, confirm: &dyn Confirm) -> Result<()> {
        let Some(idx) = self.sessions.iter().position(|s| s.id == id) else {
            return Ok(());
        };
        if !confirm.confirm("Delete this session?") {
            return Ok(());
        }
        self.sessions.remove(idx);
        if self.sessions.is_empty() {
            self.create()?;
            return Ok(());
        }
        if self.active_id == id {
            self.active_id = self.sessions[0].id.clone();
            self.persist_active()?;
        }
        self.persist_sessions()
    }

    /// Makes the session with the given id active and returns its history
    /// for rendering. A no-op returning `None` when the id is absent.
    pub fn set_active(&mut self, id: &str) -> Result<Option<&[Message]>> {
        let Some(idx) = self.sessions.iter().position(|s| s.id == id) else {
            return Ok(None);
        };
        self.active_id = id.to_string();
        self.persist_active()?;
        Ok(Some(&self.sessions[idx].history))
    }

    /// Replaces the session's history wholesale and persists the whole
    /// collection. A no-op when the id is absent, which is how a turn
    /// completing against a deleted session resolves.
    pub fn update_history(&mut self, id: &str, history: Vec<Message>) -> Result<()> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(());
        };
        session.history = history;
        self.persist_sessions()
    }

    /// Rewrites the session's title from the given text, but only while
    /// the title still equals the sentinel. Idempotent thereafter.
    pub fn update_title_once(&mut self, id: &str, text: &str) -> Result<()> {
        let Some(session) = self.sessions.iter_mut().find(|s| s.id == id) else {
            return Ok(());
        };
        if !session.is_untitled() {
            return Ok(());
        }
        session.title = Session::title_from(text);
        self.persist_sessions()
    }

    /// Returns the sessions, newest-first.
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Returns the active session's id.
    pub fn active_id(&self) -> &str {
        &self.active_id
    }

    /// Returns the active session's history.
    pub fn active_history(&self) -> &[Message] {
        self.sessions
            .iter()
            .find(|s| s.id == self.active_id)
            .map(|s| s.history.as_slice())
            .unwrap_or(&[])
    }

    fn persist_sessions(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.sessions)?;
        self.store.put(SESSIONS_KEY, &raw)
    }

    fn persist_active(&mut self) -> Result<()> {
        let active = self.active_id.clone();
        self.store.put(ACTIVE_KEY, &active)
    }
}
