// src/stage/logging.rs

use super::{names, ChannelStage};
use crate::channel::Channel;

use bytes::Bytes;

/// The shared diagnostic logging stage.
///
/// One instance is created per listener and appended (when traffic logging
/// is enabled) to every accepted channel's pipeline, last, so it observes
/// fully-processed traffic. The instance is read-only after construction and
/// safe to reference from many channels concurrently.
#[derive(Debug)]
pub struct LoggingStage {
  /// Component label attached to every record, so embedders can tell apart
  /// multiple listeners feeding the same subscriber.
  label: &'static str,
}

impl LoggingStage {
  pub fn new(label: &'static str) -> Self {
    Self { label }
  }

  pub fn label(&self) -> &'static str {
    self.label
  }
}

impl ChannelStage for LoggingStage {
  fn name(&self) -> &'static str {
    names::LOGGING
  }

  fn on_added(&self) {
    tracing::trace!(component = self.label, "logging stage installed");
  }

  fn on_removed(&self) {
    tracing::trace!(component = self.label, "logging stage removed");
  }

  fn on_inbound(&self, channel: &Channel, payload: &Bytes) {
    tracing::debug!(
      component = self.label,
      channel = channel.handle(),
      uri = %channel.endpoint(),
      size = payload.len(),
      "inbound traffic"
    );
  }
}
