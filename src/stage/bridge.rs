// src/stage/bridge.rs

use super::{names, ChannelStage};
use crate::channel::Channel;
use crate::operations::OPERATIONS_ATTRIBUTE;

use bytes::Bytes;

/// The stage handing raw inbound traffic to the channel's attached
/// operations.
///
/// Installed by the embedder when the channel is initialized, before
/// assembly runs; the context handler resolves this stage's pipeline
/// position on activation and passes it to the operations' entry point.
#[derive(Debug, Default)]
pub struct ProtocolBridgeStage;

impl ProtocolBridgeStage {
  pub fn new() -> Self {
    Self
  }
}

impl ChannelStage for ProtocolBridgeStage {
  fn name(&self) -> &'static str {
    names::PROTOCOL_BRIDGE
  }

  fn on_inbound(&self, channel: &Channel, payload: &Bytes) {
    match channel.attributes().get(&OPERATIONS_ATTRIBUTE) {
      Some(op) => op.on_inbound(payload.clone()),
      None => {
        // Traffic can race activation; there is no operations object yet to
        // receive it, so the payload is dropped rather than queued.
        tracing::trace!(
          channel = channel.handle(),
          size = payload.len(),
          "inbound traffic before operations attached, dropping"
        );
      }
    }
  }
}
