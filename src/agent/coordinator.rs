//! Coordinator: one query's lifecycle from tag to answer.
//!
//! Owns the pipeline: parse tag → fetch table → build prompt → select sink
//! → build session → dispatch in the requested delivery mode → collect the
//! final answer. Queries are independent; the coordinator holds no
//! per-query state and no locks of its own.

use std::sync::Arc;

use tracing::{debug, warn};

use super::config::AgentConfig;
use super::prompt::wrap_query;
use super::provider::LlmProvider;
use super::selector::{AgentKind, build_session};
use super::sink::{EventStream, NullSink, PullSink, PushSink};
use crate::core::ComparisonTable;
use crate::dataset::DatasetSource;
use crate::error::AgentError;
use crate::transport::ChannelRegistry;

/// Phases of one query's lifecycle.
///
/// `Streaming` is only reached in pull/push modes; it completes only after
/// both the sink has finished delivering and the background task has
/// resolved — whichever signal lands later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    /// Fetching the comparison table.
    Fetching,
    /// Building the prompt.
    Prompting,
    /// Session built, about to launch.
    Dispatched,
    /// Session running as a background task (pull/push modes).
    Streaming,
    /// Session running inline (blocking mode).
    Blocked,
    /// Terminal: answer delivered.
    Completed,
    /// Terminal: failure surfaced.
    Failed,
}

impl QueryPhase {
    /// Whether `next` is a legal successor of `self`.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Fetching, Self::Prompting | Self::Failed)
                | (Self::Prompting, Self::Dispatched)
                | (Self::Dispatched, Self::Streaming | Self::Blocked)
                | (
                    Self::Streaming | Self::Blocked,
                    Self::Completed | Self::Failed
                )
        )
    }
}

/// Per-query phase tracker, used for tracing.
#[derive(Debug)]
struct QueryState {
    comparison_id: String,
    phase: QueryPhase,
}

impl QueryState {
    fn new(comparison_id: &str) -> Self {
        Self {
            comparison_id: comparison_id.to_string(),
            phase: QueryPhase::Fetching,
        }
    }

    fn advance(&mut self, next: QueryPhase) {
        debug_assert!(
            self.phase.can_advance_to(next),
            "illegal phase transition {:?} -> {next:?}",
            self.phase
        );
        debug!(comparison = %self.comparison_id, from = ?self.phase, to = ?next, "query phase");
        self.phase = next;
    }
}

/// Orchestrates query execution and event delivery.
///
/// All collaborators are injected at construction; nothing here reaches
/// for process-wide state.
pub struct Coordinator {
    dataset: Arc<dyn DatasetSource>,
    registry: Arc<ChannelRegistry>,
    provider: Arc<dyn LlmProvider>,
    config: AgentConfig,
}

impl Coordinator {
    /// Creates a coordinator over the given collaborators.
    #[must_use]
    pub fn new(
        dataset: Arc<dyn DatasetSource>,
        registry: Arc<ChannelRegistry>,
        provider: Arc<dyn LlmProvider>,
        config: AgentConfig,
    ) -> Self {
        Self {
            dataset,
            registry,
            provider,
            config,
        }
    }

    /// The push-channel registry this coordinator delivers through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// The configuration this coordinator was built with.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Blocking query: runs the session inline and returns the answer.
    ///
    /// Thoughts are discarded (`NullSink`); the caller sees only the final
    /// answer or the failure.
    ///
    /// # Errors
    ///
    /// [`AgentError::UnsupportedVariant`] before any fetch,
    /// [`AgentError::DatasetUnavailable`] on fetch failure or an empty
    /// table, then any session failure as-is. Never retried.
    pub async fn query(
        &self,
        comparison_id: &str,
        question: &str,
        tag: &str,
    ) -> Result<String, AgentError> {
        let kind = AgentKind::parse(tag)?;
        let mut state = QueryState::new(comparison_id);

        let (table, prompt) = self.prepare(&mut state, comparison_id, question).await?;
        let session = build_session(
            Arc::clone(&self.provider),
            &self.config,
            table,
            kind,
            Arc::new(NullSink),
        );
        state.advance(QueryPhase::Dispatched);
        state.advance(QueryPhase::Blocked);

        match session.run_blocking(&prompt).await {
            Ok(answer) => {
                state.advance(QueryPhase::Completed);
                Ok(answer)
            }
            Err(e) => {
                state.advance(QueryPhase::Failed);
                Err(e)
            }
        }
    }

    /// Pull-mode query: returns a lazy event stream immediately.
    ///
    /// The caller drains the stream for thoughts and the final answer; a
    /// deferred session failure surfaces as the stream's terminal item.
    /// Abandoning the stream leaves the session running to completion
    /// under its own bounds.
    ///
    /// # Errors
    ///
    /// Same synchronous errors as [`Coordinator::query`]; session failures
    /// are deferred into the stream.
    pub async fn query_stream_pull(
        &self,
        comparison_id: &str,
        question: &str,
        tag: &str,
    ) -> Result<EventStream, AgentError> {
        let kind = AgentKind::parse(tag)?;
        let mut state = QueryState::new(comparison_id);

        let (table, prompt) = self.prepare(&mut state, comparison_id, question).await?;
        let (sink, rx) = PullSink::channel();
        let session = build_session(
            Arc::clone(&self.provider),
            &self.config,
            table,
            kind,
            Arc::new(sink),
        );
        state.advance(QueryPhase::Dispatched);

        let handle = session.run_streaming(&prompt);
        state.advance(QueryPhase::Streaming);

        Ok(EventStream::new(rx, handle))
    }

    /// Push-mode query: streams frames to a registered channel and returns
    /// the answer.
    ///
    /// A missing or closed channel only suppresses thought delivery — the
    /// session keeps running and the answer still comes back here.
    ///
    /// # Errors
    ///
    /// Same synchronous errors as [`Coordinator::query`], then any session
    /// failure once the background task resolves.
    pub async fn query_stream_push(
        &self,
        comparison_id: &str,
        question: &str,
        tag: &str,
        channel_id: &str,
    ) -> Result<String, AgentError> {
        let kind = AgentKind::parse(tag)?;
        let mut state = QueryState::new(comparison_id);

        if self.registry.lookup(channel_id).await.is_none() {
            // Delivery will fail and be abandoned; the query itself proceeds.
            warn!(channel = %channel_id, "push channel not registered; thoughts will not be delivered");
        }

        let (table, prompt) = self.prepare(&mut state, comparison_id, question).await?;
        let sink = PushSink::new(Arc::clone(&self.registry), channel_id);
        let session = build_session(
            Arc::clone(&self.provider),
            &self.config,
            table,
            kind,
            Arc::new(sink),
        );
        state.advance(QueryPhase::Dispatched);

        let handle = session.run_streaming(&prompt);
        state.advance(QueryPhase::Streaming);

        let result = handle.await.unwrap_or_else(|e| {
            Err(AgentError::ReasoningFailure {
                cause: format!("session task join failed: {e}"),
            })
        });

        match result {
            Ok(answer) => {
                state.advance(QueryPhase::Completed);
                Ok(answer)
            }
            Err(e) => {
                state.advance(QueryPhase::Failed);
                Err(e)
            }
        }
    }

    /// Shared front half: fetch the table and build the prompt.
    async fn prepare(
        &self,
        state: &mut QueryState,
        comparison_id: &str,
        question: &str,
    ) -> Result<(ComparisonTable, String), AgentError> {
        let table = match self.dataset.fetch(comparison_id).await {
            Ok(table) => table,
            Err(e) => {
                state.advance(QueryPhase::Failed);
                return Err(e);
            }
        };
        if table.is_empty() {
            state.advance(QueryPhase::Failed);
            return Err(AgentError::DatasetUnavailable {
                reason: format!("comparison {comparison_id} is empty"),
            });
        }

        state.advance(QueryPhase::Prompting);
        let prompt = wrap_query(question);
        Ok((table, prompt))
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("provider", &self.provider.name())
            .field("config", &self.config.model)
            .finish_non_exhaustive()
    }
}
