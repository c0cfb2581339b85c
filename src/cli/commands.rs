//! CLI command implementations.
//!
//! Wires the coordinator from environment configuration and runs the
//! requested command.

use std::io::{self, Write as IoWrite};
use std::sync::Arc;

use anyhow::Result;
use futures_util::StreamExt;

use crate::agent::{AgentConfig, Coordinator, create_provider};
use crate::api;
use crate::dataset::SimCompClient;
use crate::transport::ChannelRegistry;

/// Builds a coordinator from environment configuration.
fn build_coordinator() -> Result<Coordinator> {
    let config = AgentConfig::from_env()?;
    let provider = create_provider(&config)?;
    let dataset = Arc::new(SimCompClient::new(config.dataset_url.as_str())?);
    let registry = Arc::new(ChannelRegistry::new());
    Ok(Coordinator::new(dataset, registry, provider, config))
}

/// Runs the `query` command.
///
/// # Errors
///
/// Returns configuration, fetch, or session errors; in stream mode a
/// deferred session failure surfaces after the emitted frames.
pub async fn run_query(
    comparison_id: &str,
    question: &str,
    agent: &str,
    stream: bool,
) -> Result<()> {
    let coordinator = build_coordinator()?;
    let stdout = io::stdout();

    if stream {
        let mut events = coordinator
            .query_stream_pull(comparison_id, question, agent)
            .await?;
        while let Some(item) = events.next().await {
            let event = item?;
            writeln!(stdout.lock(), "{}", event.to_frame())?;
        }
    } else {
        let answer = coordinator.query(comparison_id, question, agent).await?;
        writeln!(stdout.lock(), "{answer}")?;
    }

    Ok(())
}

/// Runs the `serve` command until interrupted.
///
/// # Errors
///
/// Returns configuration errors or server bind/run failures.
pub async fn run_serve(host: &str, port: u16) -> Result<()> {
    let coordinator = Arc::new(build_coordinator()?);
    api::serve(coordinator, host, port).await
}
