//! Event sink trait and implementations.

use crate::core::ProgressEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, info, Level};

/// Trait for sinks receiving progress events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event, waiting for room if the sink is bounded.
    ///
    /// The event is visible to consumers once this returns.
    async fn emit(&self, event: ProgressEvent);

    /// Tries to emit an event without blocking.
    ///
    /// This method never fails. Events that cannot be delivered are logged
    /// and dropped.
    fn try_emit(&self, event: ProgressEvent);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: ProgressEvent) {}

    fn try_emit(&self, _event: ProgressEvent) {}
}

/// An event sink that logs events using the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a new logging event sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &ProgressEvent) {
        let event_type = event.event_type();
        let message = event.message().unwrap_or("run finished");
        if self.level == Level::DEBUG {
            debug!(event_type, event = ?event, "{message}");
        } else {
            info!(event_type, "{message}");
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.log_event(&event);
    }
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: parking_lot::RwLock<Vec<ProgressEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns the wire type names of the collected events, in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.read().iter().map(ProgressEvent::event_type).collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: ProgressEvent) {
        self.events.write().push(event);
    }
}

/// Forwards events into a bounded tokio channel.
///
/// `emit` waits for channel capacity, so a slow consumer holds the producer
/// back instead of events piling up. A closed channel is not an error: the
/// run keeps going and later events are dropped.
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::Sender<ProgressEvent>,
}

impl ChannelEventSink {
    /// Creates a sink writing into `sender`.
    #[must_use]
    pub fn new(sender: mpsc::Sender<ProgressEvent>) -> Self {
        Self { sender }
    }

    /// Creates a sink and the receiver for its events.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self::new(sender), receiver)
    }

    /// Returns true once the receiving side is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn emit(&self, event: ProgressEvent) {
        if let Err(e) = self.sender.send(event).await {
            debug!(event_type = e.0.event_type(), "Progress consumer gone, dropping event");
        }
    }

    fn try_emit(&self, event: ProgressEvent) {
        if let Err(e) = self.sender.try_send(event) {
            debug!(error = %e, "Dropping progress event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_sink() {
        let sink = NoOpEventSink;
        sink.emit(ProgressEvent::log("x")).await;
        sink.try_emit(ProgressEvent::log("y"));
    }

    #[tokio::test]
    async fn test_logging_sink() {
        let sink = LoggingEventSink::default();
        sink.emit(ProgressEvent::log("Starting generation for: X")).await;
        LoggingEventSink::debug().try_emit(ProgressEvent::error(None, "boom"));
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        sink.emit(ProgressEvent::log("one")).await;
        sink.try_emit(ProgressEvent::error(None, "two"));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.event_types(), vec!["log", "error"]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelEventSink::channel(4);
        sink.emit(ProgressEvent::log("first")).await;
        sink.emit(ProgressEvent::log("second")).await;

        assert_eq!(rx.recv().await.unwrap().message(), Some("first"));
        assert_eq!(rx.recv().await.unwrap().message(), Some("second"));
    }

    #[tokio::test]
    async fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelEventSink::channel(1);
        drop(rx);

        assert!(sink.is_closed());
        sink.emit(ProgressEvent::log("lost")).await;
        sink.try_emit(ProgressEvent::log("lost too"));
    }

    #[test]
    fn test_channel_try_emit_full() {
        let (sink, mut rx) = ChannelEventSink::channel(1);
        sink.try_emit(ProgressEvent::log("kept"));
        sink.try_emit(ProgressEvent::log("dropped"));

        assert_eq!(rx.try_recv().unwrap().message(), Some("kept"));
        assert!(rx.try_recv().is_err());
    }
}
