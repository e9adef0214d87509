// src/runtime/events.rs

//! Diagnostic monitor events, delivered over a bounded channel.

/// Significant events in a listener's life and the lives of its accepted
/// channels. Inspired by socket-monitor event streams.
#[derive(Debug, Clone)]
#[non_exhaustive] // Allow adding more events later
pub enum ChannelEvent {
  /// The listener is serving; the completion sink has been resolved.
  Listening { endpoint: String },
  /// An accepted channel finished setup and its operations are attached.
  Active { endpoint: String, channel: usize },
  /// Channel setup failed before activation.
  SetupFailed {
    endpoint: String,
    channel: usize,
    error_msg: String,
  },
  /// An accepted channel closed; its operations have been detached.
  Closed { endpoint: String, channel: usize },
}

// Type alias for the channel sender used for monitor events
pub type MonitorSender = async_channel::Sender<ChannelEvent>;
// Type alias for the channel receiver used for monitor events
pub type MonitorReceiver = async_channel::Receiver<ChannelEvent>;

// Default capacity for monitor channel
pub const DEFAULT_MONITOR_CAPACITY: usize = 100;

/// Creates a bounded monitor channel pair.
///
/// Senders in this crate always use `try_send`: a full or abandoned monitor
/// must never stall an event-loop callback, so events are dropped (with a
/// warning) instead of awaited.
pub fn monitor_channel(capacity: usize) -> (MonitorSender, MonitorReceiver) {
  async_channel::bounded(capacity.max(1))
}
