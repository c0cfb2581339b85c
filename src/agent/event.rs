//! Events emitted by a reasoning session.
//!
//! A session emits zero or more thoughts strictly followed by exactly one
//! answer, or fails before the answer. Events cross the wire as
//! `{"kind": "...", "text": "..."}` frames.

use serde::{Deserialize, Serialize};

/// One event from a reasoning session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "lowercase")]
pub enum AgentEvent {
    /// An intermediate reasoning step description.
    Thought(String),
    /// The terminal result.
    Answer(String),
}

impl AgentEvent {
    /// The event's text payload.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Thought(text) | Self::Answer(text) => text,
        }
    }

    /// `true` for the terminal [`AgentEvent::Answer`].
    #[must_use]
    pub const fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }

    /// Serializes the event to its wire frame.
    #[must_use]
    pub fn to_frame(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // Both variants are plain strings; serialization cannot fail.
            String::new()
        })
    }
}
