use std::sync::atomic::{AtomicI64, Ordering};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::Message;

/// Title assigned to a session at creation, replaced exactly once by the
/// first user message after a response completes.
pub const SENTINEL_TITLE: &str = "untitled";

/// Maximum number of characters kept when deriving a title from a message.
const TITLE_MAX_CHARS: usize = 12;

/// A titled, independently persisted conversation with its own history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Unique, time-derived identifier.
    pub id: String,

    /// Display title; starts as [`SENTINEL_TITLE`].
    pub title: String,

    /// Ordered message history, appended in (user, assistant) pairs.
    pub history: Vec<Message>,
}

impl Session {
    /// Creates a new session with a fresh id, the sentinel title, and an
    /// empty history.
    pub fn new() -> Self {
        Self {
            id: fresh_session_id(),
            title: SENTINEL_TITLE.to_string(),
            history: Vec::new(),
        }
    }

    /// Returns true if the title has not yet been rewritten.
    pub fn is_untitled(&self) -> bool {
        self.title == SENTINEL_TITLE
    }

    /// Derives a display title from a message, truncated to 12 characters
    /// on a character boundary.
    pub fn title_from(text: &str) -> String {
        text.chars().take(TITLE_MAX_CHARS).collect()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Generates a fresh session id of the form `s_<unix-millis>`.
///
/// Wall-clock milliseconds are forced strictly monotonic with a
/// process-local atomic, so ids created in the same millisecond (or across
/// a clock step backwards) remain unique.
pub fn fresh_session_id() -> String {
    static LAST_MILLIS: AtomicI64 = AtomicI64::new(0);

    let now = (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64;
    let mut prev = LAST_MILLIS.load(Ordering::SeqCst);
    loop {
        let next = now.max(prev + 1);
        match LAST_MILLIS.compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return format!("s_{next}"),
            Err(actual) => prev = actual,
        }
    }
}
