//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::time::Duration;

use crate::error::AgentError;

/// Default model for reasoning sessions.
const DEFAULT_MODEL: &str = "gpt-4";
/// Default maximum tokens per completion.
const DEFAULT_MAX_TOKENS: u32 = 2048;
/// Default step-loop limit per session.
const DEFAULT_MAX_STEPS: usize = 15;
/// Default wall-clock budget for structured sessions, in seconds.
///
/// Structured-document reasoning is the variant most prone to runaway
/// tool-call loops, so its budget is on the order of one backend step.
const DEFAULT_STRUCTURED_BUDGET_SECS: u64 = 1;
/// Default bound on a single push-channel send, in milliseconds.
const DEFAULT_PUSH_SEND_TIMEOUT_MS: u64 = 250;
/// Default comparison-service base URL, composed from the public knowledge
/// graph host the way the original deployment did.
const DEFAULT_DATASET_URL: &str = "https://orkg.org/simcomp";

/// Configuration for the query pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model identifier for reasoning sessions.
    pub model: String,
    /// Maximum tokens per completion.
    pub max_tokens: u32,
    /// Maximum reasoning steps before a session fails.
    pub max_steps: usize,
    /// Wall-clock budget for structured sessions.
    pub structured_budget: Duration,
    /// Bound on a single push-channel send before the push counts as failed.
    pub push_send_timeout: Duration,
    /// Base URL of the comparison service.
    pub dataset_url: String,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    max_steps: Option<usize>,
    structured_budget: Option<Duration>,
    push_send_timeout: Option<Duration>,
    dataset_url: Option<String>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("CQA_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("CQA_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("CQA_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("CQA_MODEL").ok();
        }
        if self.max_tokens.is_none() {
            self.max_tokens = std::env::var("CQA_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_steps.is_none() {
            self.max_steps = std::env::var("CQA_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.structured_budget.is_none() {
            self.structured_budget = std::env::var("CQA_STRUCTURED_BUDGET_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        if self.dataset_url.is_none() {
            self.dataset_url = std::env::var("CQA_DATASET_URL").ok();
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the reasoning model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum tokens per completion.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Sets the step-loop limit.
    #[must_use]
    pub const fn max_steps(mut self, n: usize) -> Self {
        self.max_steps = Some(n);
        self
    }

    /// Sets the structured session's wall-clock budget.
    #[must_use]
    pub const fn structured_budget(mut self, budget: Duration) -> Self {
        self.structured_budget = Some(budget);
        self
    }

    /// Sets the push send timeout.
    #[must_use]
    pub const fn push_send_timeout(mut self, timeout: Duration) -> Self {
        self.push_send_timeout = Some(timeout);
        self
    }

    /// Sets the comparison-service base URL.
    #[must_use]
    pub fn dataset_url(mut self, url: impl Into<String>) -> Self {
        self.dataset_url = Some(url.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            max_steps: self.max_steps.unwrap_or(DEFAULT_MAX_STEPS),
            structured_budget: self
                .structured_budget
                .unwrap_or(Duration::from_secs(DEFAULT_STRUCTURED_BUDGET_SECS)),
            push_send_timeout: self
                .push_send_timeout
                .unwrap_or(Duration::from_millis(DEFAULT_PUSH_SEND_TIMEOUT_MS)),
            dataset_url: self
                .dataset_url
                .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
        })
    }
}
