//! One reasoning session: a single query's LLM-driven step loop.
//!
//! Drives the LLM ↔ tool execution round-trip: sends a request to the
//! model, treats any tool-calling response as an intermediate step (emit a
//! thought, execute the tools, append results), and treats the first plain
//! response as the final answer. A session exists per query and is never
//! reused; it owns its table view through the executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use super::config::AgentConfig;
use super::event::AgentEvent;
use super::executor::ToolExecutor;
use super::message::{
    ChatRequest, ChatResponse, assistant_tool_calls_message, system_message, tool_message,
    user_message,
};
use super::provider::LlmProvider;
use super::sink::{EventSink, note_delivery_failure};
use super::tool::ToolSet;
use crate::error::AgentError;

/// A configured reasoning session bound to an event sink.
pub struct ReasoningSession {
    provider: Arc<dyn LlmProvider>,
    sink: Arc<dyn EventSink>,
    executor: ToolExecutor,
    tools: ToolSet,
    system_prompt: String,
    model: String,
    max_tokens: u32,
    max_steps: usize,
    /// Wall-clock budget; `Some` only for the structured variant.
    budget: Option<Duration>,
}

impl ReasoningSession {
    /// Assembles a session. Called by the variant selector only.
    pub(crate) fn new(
        provider: Arc<dyn LlmProvider>,
        config: &AgentConfig,
        sink: Arc<dyn EventSink>,
        executor: ToolExecutor,
        tools: ToolSet,
        system_prompt: String,
        budget: Option<Duration>,
    ) -> Self {
        Self {
            provider,
            sink,
            executor,
            tools,
            system_prompt,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_steps: config.max_steps,
            budget,
        }
    }

    /// Runs the session inline and returns the final answer.
    ///
    /// Thought events still flow to the bound sink; in blocking mode that
    /// sink is a `NullSink`, so they are discarded.
    ///
    /// # Errors
    ///
    /// [`AgentError::ReasoningFailure`] on backend, parse, or step-limit
    /// failures; [`AgentError::ExecutionTimeout`] when a bounded session
    /// exhausts its budget.
    pub async fn run_blocking(self, prompt: &str) -> Result<String, AgentError> {
        let prompt = prompt.to_string();
        self.run_to_completion(prompt).await
    }

    /// Starts the session as an independent task and returns its handle.
    ///
    /// Events reach the sink as they are produced; awaiting the handle is
    /// only needed to collect the final answer or the deferred failure.
    #[must_use]
    pub fn run_streaming(self, prompt: &str) -> JoinHandle<Result<String, AgentError>> {
        let prompt = prompt.to_string();
        tokio::spawn(async move { self.run_to_completion(prompt).await })
    }

    /// Applies the wall-clock budget and folds internal errors into the
    /// caller-facing taxonomy.
    async fn run_to_completion(mut self, prompt: String) -> Result<String, AgentError> {
        let result = match self.budget {
            Some(budget) => tokio::time::timeout(budget, self.drive(&prompt))
                .await
                .unwrap_or(Err(AgentError::ExecutionTimeout { budget })),
            None => self.drive(&prompt).await,
        };
        result.map_err(AgentError::into_failure)
    }

    /// The step loop: model → tool calls → tool results → model → …
    async fn drive(&mut self, prompt: &str) -> Result<String, AgentError> {
        let mut request = ChatRequest {
            model: self.model.clone(),
            messages: vec![system_message(&self.system_prompt), user_message(prompt)],
            temperature: Some(0.0),
            max_tokens: Some(self.max_tokens),
            tools: self.tools.definitions().to_vec(),
        };
        let mut delivery_open = true;

        for step in 0..self.max_steps {
            let response = self.provider.chat(&request).await?;

            // A response without tool calls is the final answer.
            if response.tool_calls.is_empty() {
                let answer = normalize_answer(&response.content);
                debug!(step, "session completed with final answer");
                self.deliver(AgentEvent::Answer(answer.clone()), &mut delivery_open)
                    .await;
                return Ok(answer);
            }

            debug!(
                step,
                tool_count = response.tool_calls.len(),
                "executing reasoning step"
            );
            self.deliver(AgentEvent::Thought(describe_step(&response)), &mut delivery_open)
                .await;

            request.messages.push(assistant_tool_calls_message(
                &response.content,
                response.tool_calls.clone(),
            ));
            for call in &response.tool_calls {
                let result = self.executor.execute(call);
                debug!(
                    tool = %call.name,
                    call_id = %call.id,
                    is_error = result.is_error,
                    "tool execution complete"
                );
                request
                    .messages
                    .push(tool_message(&result.tool_call_id, &result.content));
            }
        }

        Err(AgentError::StepLimitExceeded {
            max_steps: self.max_steps,
        })
    }

    /// Emits one event, abandoning delivery after the first failure.
    async fn deliver(&self, event: AgentEvent, delivery_open: &mut bool) {
        if !*delivery_open {
            return;
        }
        if let Err(e) = self.sink.emit(event).await {
            note_delivery_failure(delivery_open, &e);
        }
    }
}

impl std::fmt::Debug for ReasoningSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasoningSession")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_steps", &self.max_steps)
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

/// Normalizes the model's final output to a plain answer string.
fn normalize_answer(content: &str) -> String {
    let trimmed = content.trim();
    let lower = trimmed.to_ascii_lowercase();
    lower
        .strip_prefix("final answer:")
        .map_or_else(|| trimmed.to_string(), |_| {
            trimmed["final answer:".len()..].trim().to_string()
        })
}

/// Renders an intermediate step as thought text.
///
/// Uses the model's own reasoning text when present, otherwise a
/// description of the tool calls it requested.
fn describe_step(response: &ChatResponse) -> String {
    let content = response.content.trim();
    if !content.is_empty() {
        return content.to_string();
    }
    let calls: Vec<String> = response
        .tool_calls
        .iter()
        .map(|c| format!("{}({})", c.name, c.arguments))
        .collect();
    format!("Invoking {}", calls.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures_util::StreamExt;

    use crate::agent::message::TokenUsage;
    use crate::agent::sink::{EventStream, NullSink, PullSink};
    use crate::agent::tool::ToolCall;
    use crate::core::{CellValue, ComparisonTable};

    fn sample_table() -> ComparisonTable {
        ComparisonTable::new(
            vec!["method".to_string()],
            vec!["Paper A".to_string()],
            vec![vec![vec![CellValue::Text("LSTM".to_string())]]],
        )
        .unwrap_or_else(|e| unreachable!("sample table is well-formed: {e}"))
    }

    fn test_config() -> AgentConfig {
        AgentConfig::builder()
            .api_key("test")
            .max_steps(10)
            .build()
            .unwrap_or_else(|_| unreachable!())
    }

    /// Provider that returns `tool_rounds` tool-calling responses, then a
    /// final text answer, optionally sleeping per call.
    struct ScriptedProvider {
        tool_rounds: usize,
        final_answer: String,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(tool_rounds: usize, final_answer: &str) -> Self {
            Self {
                tool_rounds,
                final_answer: final_answer.to_string(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        const fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let count = self.calls.fetch_add(1, Ordering::SeqCst);
            if count < self.tool_rounds {
                Ok(ChatResponse {
                    content: format!("Looking at step {count}"),
                    usage: TokenUsage::default(),
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: "list_properties".to_string(),
                        arguments: "{}".to_string(),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: self.final_answer.clone(),
                    usage: TokenUsage::default(),
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }
    }

    fn session(
        provider: Arc<dyn LlmProvider>,
        sink: Arc<dyn EventSink>,
        budget: Option<Duration>,
    ) -> ReasoningSession {
        ReasoningSession::new(
            provider,
            &test_config(),
            sink,
            ToolExecutor::grid(sample_table()),
            ToolSet::grid_tools(),
            "You answer questions about a table.".to_string(),
            budget,
        )
    }

    #[tokio::test]
    async fn test_run_blocking_returns_answer() {
        let provider = Arc::new(ScriptedProvider::new(2, "LSTM"));
        let s = session(provider, Arc::new(NullSink), None);
        let answer = s
            .run_blocking("What method does Paper A use?")
            .await
            .unwrap_or_else(|e| unreachable!("session succeeds: {e}"));
        assert_eq!(answer, "LSTM");
    }

    #[tokio::test]
    async fn test_run_streaming_emits_thoughts_then_answer() {
        let provider = Arc::new(ScriptedProvider::new(3, "LSTM"));
        let (sink, rx) = PullSink::channel();
        let s = session(provider, Arc::new(sink), None);

        let handle = s.run_streaming("What method does Paper A use?");
        let events: Vec<_> = EventStream::new(rx, handle).collect().await;

        assert_eq!(events.len(), 4, "three thoughts plus the answer");
        for event in &events[..3] {
            assert!(matches!(event, Ok(AgentEvent::Thought(_))));
        }
        assert!(matches!(&events[3], Ok(AgentEvent::Answer(a)) if a == "LSTM"));
    }

    #[tokio::test]
    async fn test_step_limit_folds_into_reasoning_failure() {
        // More tool rounds than the configured limit.
        let provider = Arc::new(ScriptedProvider::new(100, "never"));
        let s = session(provider, Arc::new(NullSink), None);
        let Err(err) = s.run_blocking("loop forever").await else {
            unreachable!("session must fail")
        };
        assert!(matches!(err, AgentError::ReasoningFailure { .. }));
        assert!(err.to_string().contains("exceeded 10 steps"));
    }

    #[tokio::test]
    async fn test_budget_exhaustion_is_execution_timeout() {
        let provider =
            Arc::new(ScriptedProvider::new(100, "never").with_delay(Duration::from_millis(20)));
        let s = session(provider, Arc::new(NullSink), Some(Duration::from_millis(30)));
        let Err(err) = s.run_blocking("loop forever").await else {
            unreachable!("session must time out")
        };
        assert!(matches!(err, AgentError::ExecutionTimeout { .. }));
    }

    #[tokio::test]
    async fn test_dropped_consumer_does_not_fail_session() {
        let provider = Arc::new(ScriptedProvider::new(2, "LSTM"));
        let (sink, rx) = PullSink::channel();
        drop(rx);
        let s = session(provider, Arc::new(sink), None);
        let answer = s
            .run_blocking("What method does Paper A use?")
            .await
            .unwrap_or_else(|e| unreachable!("delivery loss is non-fatal: {e}"));
        assert_eq!(answer, "LSTM");
    }

    #[test]
    fn test_normalize_answer_strips_marker() {
        assert_eq!(normalize_answer("Final Answer: 42"), "42");
        assert_eq!(normalize_answer("  final answer:  yes  "), "yes");
        assert_eq!(normalize_answer("plain text"), "plain text");
    }

    #[test]
    fn test_describe_step_prefers_content() {
        let response = ChatResponse {
            content: "Checking the year column".to_string(),
            usage: TokenUsage::default(),
            tool_calls: vec![ToolCall {
                id: "c1".to_string(),
                name: "get_row".to_string(),
                arguments: r#"{"property":"year"}"#.to_string(),
            }],
            finish_reason: None,
        };
        assert_eq!(describe_step(&response), "Checking the year column");

        let response = ChatResponse {
            content: String::new(),
            ..response
        };
        assert_eq!(
            describe_step(&response),
            r#"Invoking get_row({"property":"year"})"#
        );
    }
}
