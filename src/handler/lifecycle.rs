// src/handler/lifecycle.rs

//! The lifecycle bridge: translates raw channel events into completion-sink
//! writes, operations teardown, and monitor notifications.

use crate::channel::{Channel, ChannelPhase};
use crate::error::ChannelError;
use crate::operations::OPERATIONS_ATTRIBUTE;
use crate::runtime::{ChannelEvent, CompletionSink, MonitorSender};

/// Variant-neutral lifecycle mechanism shared by context handlers.
///
/// The bridge owns the write-once completion sink and the per-channel phase
/// bookkeeping; the variant-specific reactions (what "started" means, who
/// receives activation) live in the composing context handler. `T` is the
/// value the sink carries on success, the handler itself on the server
/// path.
pub(crate) struct LifecycleBridge<T> {
  sink: CompletionSink<T>,
  monitor: Option<MonitorSender>,
  /// The listener endpoint this bridge serves, for logs and events.
  endpoint: String,
}

impl<T> LifecycleBridge<T> {
  pub fn new(sink: CompletionSink<T>, monitor: Option<MonitorSender>, endpoint: String) -> Self {
    Self { sink, monitor, endpoint }
  }

  /// Whether the completion sink has already been written.
  pub fn sink_fired(&self) -> bool {
    self.sink.is_fired()
  }

  /// Delivers the one-time "listener started" success.
  ///
  /// Returns `true` on the first call; every later call is a logged no-op.
  /// A server starts once, however many channels it accepts afterwards.
  pub fn signal_started(&self, value: T) -> bool {
    if self.sink.succeed(value) {
      tracing::info!(uri = %self.endpoint, "listener started, completion delivered");
      self.emit(ChannelEvent::Listening {
        endpoint: self.endpoint.clone(),
      });
      true
    } else {
      tracing::debug!(uri = %self.endpoint, "duplicate started signal ignored");
      false
    }
  }

  /// Marks `channel` as assembling its pipeline.
  ///
  /// Also serves as the assemble-once guard: a second attempt finds the
  /// phase already advanced and is rejected.
  pub fn mark_assembling(&self, channel: &Channel) -> Result<(), ChannelError> {
    channel.advance_phase(ChannelPhase::PipelineAssembling)?;
    tracing::debug!(channel = channel.handle(), uri = %channel.endpoint(), "pipeline assembly started");
    Ok(())
  }

  /// Marks `channel` as active. Activation and attachment follow in the
  /// composing handler.
  pub fn mark_active(&self, channel: &Channel) -> Result<(), ChannelError> {
    channel.advance_phase(ChannelPhase::Active)?;
    Ok(())
  }

  /// Records a fully activated channel: operations attached and notified.
  pub fn channel_activated(&self, channel: &Channel) {
    tracing::info!(channel = channel.handle(), uri = %channel.endpoint(), "channel active, operations notified");
    self.emit(ChannelEvent::Active {
      endpoint: channel.endpoint().to_string(),
      channel: channel.handle(),
    });
  }

  /// Fails the channel's setup.
  ///
  /// Before the sink's first write this is terminal for the listener: the
  /// failure is delivered through the sink. Afterwards it is local to the
  /// channel and only logged (write-once discipline). Either way the channel
  /// is closed and its transient state torn down.
  pub fn setup_failed(&self, channel: &Channel, error: ChannelError) {
    let error = match error {
      e @ ChannelError::SetupFailure(_) => e,
      other => ChannelError::SetupFailure(other.to_string()),
    };
    let error_msg = error.to_string();

    if self.sink.fail(error) {
      tracing::info!(channel = channel.handle(), uri = %channel.endpoint(), error = %error_msg, "setup failure delivered to completion sink");
    } else {
      tracing::warn!(channel = channel.handle(), uri = %channel.endpoint(), error = %error_msg, "setup failure after completion already delivered, local to channel");
    }

    self.emit(ChannelEvent::SetupFailed {
      endpoint: channel.endpoint().to_string(),
      channel: channel.handle(),
      error_msg,
    });

    match channel.advance_phase(ChannelPhase::Closed) {
      Ok(()) => self.teardown(channel),
      Err(ChannelError::LateDelivery { .. }) => {
        tracing::debug!(channel = channel.handle(), "channel already closed when setup failure arrived");
      }
      Err(e) => {
        tracing::warn!(channel = channel.handle(), error = %e, "unexpected phase while failing setup");
      }
    }
  }

  /// Processes a channel's `closed` event.
  ///
  /// Transient stages are cleared and the operations object is detached so
  /// nothing further can reach it. A `closed` for an already-terminal
  /// channel is reported as late delivery for the caller to discard.
  pub fn channel_closed(&self, channel: &Channel) -> Result<(), ChannelError> {
    channel.advance_phase(ChannelPhase::Closed)?;
    self.teardown(channel);
    tracing::info!(channel = channel.handle(), uri = %channel.endpoint(), "channel closed");
    self.emit(ChannelEvent::Closed {
      endpoint: channel.endpoint().to_string(),
      channel: channel.handle(),
    });
    Ok(())
  }

  /// Fails the sink if the listener is disposed before it ever started.
  ///
  /// Disposing a listener that already started (the normal shutdown path)
  /// leaves the delivered result untouched.
  pub fn listener_disposed(&self) {
    if self.sink.is_fired() {
      return;
    }
    if self.sink.fail(ChannelError::SetupFailure("listener disposed before start".into())) {
      tracing::info!(uri = %self.endpoint, "listener disposed before start, completion failed");
    }
  }

  fn teardown(&self, channel: &Channel) {
    let cleared = channel.pipeline().clear_transient();
    if cleared > 0 {
      tracing::debug!(channel = channel.handle(), cleared, "transient setup stages cleared");
    }
    if let Some(op) = channel.attributes().remove(&OPERATIONS_ATTRIBUTE) {
      // Removed first so no further event can reach the operations object,
      // then given its final chance to observe closure.
      op.on_closed();
      tracing::debug!(channel = channel.handle(), "operations detached");
    }
  }

  fn emit(&self, event: ChannelEvent) {
    if let Some(ref tx) = self.monitor {
      if let Err(e) = tx.try_send(event) {
        tracing::warn!(uri = %self.endpoint, "monitor channel full or closed, dropping event: {}", e);
      }
    }
  }
}
