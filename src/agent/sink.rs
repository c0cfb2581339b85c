//! Event sinks: where a session's thoughts and answer go.
//!
//! Three implementations behind one trait — a pull queue drained as a lazy
//! stream, a push binding into the channel registry, and a no-op — so a
//! session never branches on its delivery mode.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

use super::event::AgentEvent;
use crate::error::{AgentError, ChannelError};
use crate::transport::ChannelRegistry;

/// Delivery target for session events.
///
/// Errors mark lost delivery, never a failed session: the producer logs
/// the first failure and abandons further delivery while reasoning
/// continues.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Delivers one event.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError`] when the event could not be delivered.
    async fn emit(&self, event: AgentEvent) -> Result<(), ChannelError>;
}

/// Discards everything. The answer travels on the call's return path.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

#[async_trait]
impl EventSink for NullSink {
    async fn emit(&self, _event: AgentEvent) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Queue-backed sink for pull-mode consumers.
///
/// The producer side never blocks (unbounded queue); the consumer side is
/// the [`EventStream`] handed back to the caller. Created as a pair via
/// [`PullSink::channel`].
#[derive(Debug)]
pub struct PullSink {
    tx: mpsc::UnboundedSender<AgentEvent>,
}

impl PullSink {
    /// Creates the sink and the receiving half the stream is built from.
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AgentEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventSink for PullSink {
    async fn emit(&self, event: AgentEvent) -> Result<(), ChannelError> {
        self.tx.send(event).map_err(|_| ChannelError::Closed {
            id: "pull".to_string(),
        })
    }
}

/// Registry-backed sink for push-mode delivery.
///
/// Each event is framed and sent immediately. The binding is by id, not by
/// channel handle: a channel that never existed or disappears mid-stream
/// simply makes every push fail, which the session treats as abandoned
/// delivery.
pub struct PushSink {
    registry: Arc<ChannelRegistry>,
    channel_id: String,
}

impl PushSink {
    /// Binds a sink to a channel id in the registry.
    #[must_use]
    pub fn new(registry: Arc<ChannelRegistry>, channel_id: impl Into<String>) -> Self {
        Self {
            registry,
            channel_id: channel_id.into(),
        }
    }
}

#[async_trait]
impl EventSink for PushSink {
    async fn emit(&self, event: AgentEvent) -> Result<(), ChannelError> {
        self.registry
            .send_to(&self.channel_id, event.to_frame())
            .await
    }
}

impl std::fmt::Debug for PushSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushSink")
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

/// Lazy, finite, non-restartable sequence of session events.
///
/// Yields every queued event in production order, then resolves the
/// session's completion handle: a deferred failure surfaces as the terminal
/// `Err` item, a success ends the stream (the answer was already yielded as
/// an event). Dropping the stream early detaches the task, which keeps
/// running to completion under its own step limit and budget.
#[derive(Debug)]
pub struct EventStream {
    events: UnboundedReceiverStream<AgentEvent>,
    handle: Option<JoinHandle<Result<String, AgentError>>>,
    done: bool,
}

impl EventStream {
    /// Builds the stream from the queue's receiving half and the session's
    /// completion handle.
    #[must_use]
    pub fn new(
        rx: mpsc::UnboundedReceiver<AgentEvent>,
        handle: JoinHandle<Result<String, AgentError>>,
    ) -> Self {
        Self {
            events: UnboundedReceiverStream::new(rx),
            handle: Some(handle),
            done: false,
        }
    }
}

impl Stream for EventStream {
    type Item = Result<AgentEvent, AgentError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        if this.done {
            return Poll::Ready(None);
        }

        // Stage 1: drain the queue. The producer's sender is dropped when
        // the session task finishes, which ends this stage.
        match Pin::new(&mut this.events).poll_next(cx) {
            Poll::Ready(Some(event)) => return Poll::Ready(Some(Ok(event))),
            Poll::Ready(None) => {}
            Poll::Pending => return Poll::Pending,
        }

        // Stage 2: the queue is exhausted; the later of the two completion
        // signals is the task itself.
        let Some(handle) = this.handle.as_mut() else {
            this.done = true;
            return Poll::Ready(None);
        };
        match Pin::new(handle).poll(cx) {
            Poll::Ready(join_result) => {
                this.handle = None;
                this.done = true;
                match join_result {
                    Ok(Ok(_answer)) => Poll::Ready(None),
                    Ok(Err(e)) => Poll::Ready(Some(Err(e))),
                    Err(e) => Poll::Ready(Some(Err(AgentError::ReasoningFailure {
                        cause: format!("session task join failed: {e}"),
                    }))),
                }
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Logs a failed delivery once and marks the sink abandoned.
///
/// Shared by the session's emit path so every sink gets identical
/// non-fatal handling.
pub(crate) fn note_delivery_failure(open: &mut bool, err: &ChannelError) {
    if *open {
        debug!(error = %err, "event delivery failed; abandoning further delivery");
        *open = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;

    use crate::transport::QueueChannel;

    #[tokio::test]
    async fn test_null_sink_discards() {
        let sink = NullSink;
        let result = sink.emit(AgentEvent::Thought("t".to_string())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_pull_sink_preserves_order() {
        let (sink, mut rx) = PullSink::channel();
        for i in 0..3 {
            sink.emit(AgentEvent::Thought(format!("t{i}")))
                .await
                .unwrap_or_else(|e| unreachable!("queue open: {e}"));
        }
        sink.emit(AgentEvent::Answer("a".to_string()))
            .await
            .unwrap_or_else(|e| unreachable!("queue open: {e}"));

        for i in 0..3 {
            assert_eq!(rx.recv().await, Some(AgentEvent::Thought(format!("t{i}"))));
        }
        assert_eq!(rx.recv().await, Some(AgentEvent::Answer("a".to_string())));
    }

    #[tokio::test]
    async fn test_pull_sink_reports_dropped_consumer() {
        let (sink, rx) = PullSink::channel();
        drop(rx);
        let result = sink.emit(AgentEvent::Thought("t".to_string())).await;
        assert!(matches!(result, Err(ChannelError::Closed { .. })));
    }

    #[tokio::test]
    async fn test_push_sink_frames_through_registry() {
        let registry = Arc::new(ChannelRegistry::new());
        let (channel, mut rx) = QueueChannel::new("chan-1", Duration::from_millis(10));
        registry.register(Arc::new(channel)).await;

        let sink = PushSink::new(Arc::clone(&registry), "chan-1");
        sink.emit(AgentEvent::Thought("checking".to_string()))
            .await
            .unwrap_or_else(|e| unreachable!("channel registered: {e}"));

        assert_eq!(
            rx.recv().await.as_deref(),
            Some(r#"{"kind":"thought","text":"checking"}"#)
        );
    }

    #[tokio::test]
    async fn test_push_sink_missing_channel() {
        let registry = Arc::new(ChannelRegistry::new());
        let sink = PushSink::new(registry, "ghost");
        let result = sink.emit(AgentEvent::Thought("t".to_string())).await;
        assert!(matches!(result, Err(ChannelError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_event_stream_success_ends_after_answer() {
        let (sink, rx) = PullSink::channel();
        let handle = tokio::spawn(async move {
            sink.emit(AgentEvent::Thought("t1".to_string()))
                .await
                .unwrap_or_else(|e| unreachable!("{e}"));
            sink.emit(AgentEvent::Answer("done".to_string()))
                .await
                .unwrap_or_else(|e| unreachable!("{e}"));
            Ok("done".to_string())
        });

        let stream = EventStream::new(rx, handle);
        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(&items[0], Ok(AgentEvent::Thought(t)) if t == "t1"));
        assert!(matches!(&items[1], Ok(AgentEvent::Answer(a)) if a == "done"));
    }

    #[tokio::test]
    async fn test_event_stream_surfaces_deferred_failure() {
        let (sink, rx) = PullSink::channel();
        let handle = tokio::spawn(async move {
            sink.emit(AgentEvent::Thought("t1".to_string()))
                .await
                .unwrap_or_else(|e| unreachable!("{e}"));
            Err(AgentError::ReasoningFailure {
                cause: "backend went away".to_string(),
            })
        });

        let mut stream = EventStream::new(rx, handle);
        assert!(matches!(
            stream.next().await,
            Some(Ok(AgentEvent::Thought(_)))
        ));
        assert!(matches!(
            stream.next().await,
            Some(Err(AgentError::ReasoningFailure { .. }))
        ));
        assert!(stream.next().await.is_none(), "stream ends after failure");
    }

    #[tokio::test]
    async fn test_event_stream_drop_detaches_task() {
        let (sink, rx) = PullSink::channel();
        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            for i in 0..4 {
                // Ignore delivery failures; the consumer may be gone.
                let _ = sink.emit(AgentEvent::Thought(format!("t{i}"))).await;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
            let _ = done_tx.send(());
            Ok("answer".to_string())
        });

        let mut stream = EventStream::new(rx, handle);
        // Take one event, then abandon the stream mid-way.
        assert!(stream.next().await.is_some());
        drop(stream);

        // The task still runs to completion.
        done_rx
            .await
            .unwrap_or_else(|e| unreachable!("task finished: {e}"));
    }
}
