//! Output rendering for streamed chat turns.
//!
//! The controller never paints anything itself; it drives a [`Renderer`]
//! keyed by an explicit [`TurnContext`]. The context carries a correlation
//! id and the originating session id, so a view layer can decide what to
//! do with partial renders for a session that is no longer displayed.

use std::io::{self, Stdout, Write};

/// Identity of one request/response cycle.
///
/// Every renderer call for a turn carries the same context; the session id
/// is the one captured when the turn started, not whatever is active when
/// a chunk arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    /// Correlation id, unique per controller.
    pub turn: u64,
    /// Id of the session the turn was submitted against.
    pub session_id: String,
}

/// Converts accumulated response text to display markup.
///
/// Conversion runs on every chunk, so implementations must tolerate
/// syntactically incomplete input without failing.
pub trait MarkupConverter: Send {
    /// Converts text to markup.
    fn convert(&self, text: &str) -> String;
}

impl<F> MarkupConverter for F
where
    F: Fn(&str) -> String + Send,
{
    fn convert(&self, text: &str) -> String {
        self(text)
    }
}

/// A converter that passes text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMarkup;

impl MarkupConverter for PassthroughMarkup {
    fn convert(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Trait for rendering a chat turn as it streams.
pub trait Renderer: Send {
    /// Show the user's submitted message.
    fn show_user(&mut self, context: &TurnContext, text: &str);

    /// Show a provisional placeholder where the assistant reply will go.
    fn show_pending(&mut self, context: &TurnContext);

    /// Replace the placeholder's content with markup for everything
    /// accumulated so far. Called once per received chunk.
    fn replace_partial(&mut self, context: &TurnContext, markup: &str);

    /// Replace the placeholder with an error indicator.
    fn show_error(&mut self, context: &TurnContext, error: &str);

    /// Called when a turn completes successfully.
    fn finish_turn(&mut self, context: &TurnContext);
}

/// Renderer that writes to stdout.
///
/// A byte stream cannot repaint, so successive partials are printed as
/// deltas: when the new markup extends the previous one only the suffix is
/// written, otherwise the full markup is reprinted on a new line.
pub struct PlainTextRenderer {
    stdout: Stdout,
    current_turn: Option<u64>,
    rendered: String,
}

impl PlainTextRenderer {
    /// Creates a new stdout renderer.
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            current_turn: None,
            rendered: String::new(),
        }
    }

    /// Flushes stdout to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn reset_for(&mut self, turn: u64) {
        if self.current_turn != Some(turn) {
            self.current_turn = Some(turn);
            self.rendered.clear();
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn show_user(&mut self, context: &TurnContext, text: &str) {
        self.reset_for(context.turn);
        println!("{text}");
        self.flush();
    }

    fn show_pending(&mut self, _context: &TurnContext) {
        // Nothing useful to paint; the first partial follows immediately.
    }

    fn replace_partial(&mut self, context: &TurnContext, markup: &str) {
        self.reset_for(context.turn);
        if let Some(delta) = markup.strip_prefix(self.rendered.as_str()) {
            print!("{delta}");
        } else {
            print!("\n{markup}");
        }
        self.rendered = markup.to_string();
        self.flush();
    }

    fn show_error(&mut self, context: &TurnContext, error: &str) {
        self.reset_for(context.turn);
        eprintln!("\nError: {error}");
    }

    fn finish_turn(&mut self, _context: &TurnContext) {
        println!();
        self.flush();
        self.current_turn = None;
        self.rendered.clear();
    }
}

/// One recorded renderer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    /// A user message was shown.
    User {
        /// The turn context.
        context: TurnContext,
        /// The submitted text.
        text: String,
    },
    /// The pending placeholder was shown.
    Pending {
        /// The turn context.
        context: TurnContext,
    },
    /// A partial render replaced the placeholder.
    Partial {
        /// The turn context.
        context: TurnContext,
        /// The accumulated markup.
        markup: String,
    },
    /// An error indicator replaced the placeholder.
    Error {
        /// The turn context.
        context: TurnContext,
        /// The failure description.
        message: String,
    },
    /// The turn finished.
    Finished {
        /// The turn context.
        context: TurnContext,
    },
}

/// Renderer that records every call instead of painting.
///
/// Useful for tests and headless embedding.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Vec<RenderEvent>,
}

impl RecordingRenderer {
    /// Creates an empty recording renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all recorded events in call order.
    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    /// Returns the markup of the most recent partial render, if any.
    pub fn last_partial(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|e| match e {
            RenderEvent::Partial { markup, .. } => Some(markup.as_str()),
            _ => None,
        })
    }

    /// Returns all rendered error messages.
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Error { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn show_user(&mut self, context: &TurnContext, text: &str) {
        self.events.push(RenderEvent::User {
            context: context.clone(),
            text: text.to_string(),
        });
    }

    fn show_pending(&mut self, context: &TurnContext) {
        self.events.push(RenderEvent::Pending {
            context: context.clone(),
        });
    }

    fn replace_partial(&mut self, context: &TurnContext, markup: &str) {
        self.events.push(RenderEvent::Partial {
            context: context.clone(),
            markup: markup.to_string(),
        });
    }

    fn show_error(&mut self, context: &TurnContext, error: &str) {
        self.events.push(RenderEvent::Error {
            context: context.clone(),
            message: error.to_string(),
        });
    }

    fn finish_turn(&mut self, context: &TurnContext) {
        self.events.push(RenderEvent::Finished {
            context: context.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TurnContext {
        TurnContext {
            turn: 1,
            session_id: "s_1".to_string(),
        }
    }

    #[test]
    fn passthrough_markup_is_identity() {
        let converter = PassthroughMarkup;
        assert_eq!(converter.convert("**raw**"), "**raw**");
    }

    #[test]
    fn closures_are_converters() {
        let converter = |text: &str| format!("<p>{text}</p>");
        assert_eq!(converter.convert("hi"), "<p>hi</p>");
    }

    #[test]
    fn recording_renderer_captures_call_order() {
        let mut renderer = RecordingRenderer::new();
        let ctx = context();
        renderer.show_user(&ctx, "hello");
        renderer.show_pending(&ctx);
        renderer.replace_partial(&ctx, "Hel");
        renderer.replace_partial(&ctx, "Hello");
        renderer.finish_turn(&ctx);

        assert_eq!(renderer.events().len(), 5);
        assert_eq!(renderer.last_partial(), Some("Hello"));
        assert!(renderer.errors().is_empty());
    }

    #[test]
    fn recording_renderer_collects_errors() {
        let mut renderer = RecordingRenderer::new();
        let ctx = context();
        renderer.show_error(&ctx, "Connection error: refused");
        assert_eq!(renderer.errors(), vec!["Connection error: refused"]);
    }
}
