//! # cqa-rs
//!
//! Question answering over research-paper comparisons: an LLM-backed
//! reasoning agent answers natural-language questions about a tabular
//! comparison fetched from a knowledge-graph service, optionally streaming
//! its intermediate thoughts to the client.
//!
//! ## Architecture
//!
//! ```text
//! CLI / HTTP / WebSocket
//!        │
//!   Coordinator ──────────── DatasetSource (comparison service)
//!        │
//!   Variant selector (tabular | structured)
//!        │
//!   ReasoningSession ──────── LlmProvider (OpenAI-compatible backend)
//!        │
//!   EventSink (pull stream | push channel | null)
//! ```
//!
//! The [`agent::Coordinator`] owns one query's lifecycle: fetch the table,
//! build the prompt, configure a [`agent::ReasoningSession`] for the
//! requested variant, and run it — inline for blocking queries, as a
//! background task for pull/push streaming. Delivery failures never fail a
//! running session; session failures surface exactly once, on the path the
//! caller is already waiting on.

pub mod agent;
pub mod api;
pub mod cli;
pub mod core;
pub mod dataset;
pub mod error;
pub mod transport;

// Re-export the types most callers need.
pub use agent::{AgentConfig, AgentEvent, AgentKind, Coordinator};
pub use error::{AgentError, ChannelError};

pub use crate::core::{CellValue, ComparisonTable, TableShape};
