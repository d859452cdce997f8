//! Progress event sinks.
//!
//! The orchestrator reports every stage transition to an [`EventSink`].
//! Streaming mode plugs in a [`ChannelEventSink`]; one-shot runs default to
//! [`NoOpEventSink`].

mod sink;

pub use sink::{ChannelEventSink, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
