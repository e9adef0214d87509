// src/operations.rs

//! Per-channel operation objects and their attachment discipline.

use crate::channel::{AttributeKey, Channel, StageContext};
use crate::error::ChannelError;
use crate::handler::server::ServerContextHandler;

use bytes::Bytes;
use std::sync::Arc;

/// The well-known attribute key under which a channel's operations object is
/// stored. Unique within the attribute namespace; every stage that needs the
/// operations (e.g. the protocol bridge) looks them up here.
pub static OPERATIONS_ATTRIBUTE: AttributeKey<Arc<dyn ChannelOperations>> = AttributeKey::new("wharf.operations");

/// The per-channel handler for application-level traffic.
///
/// Created by a caller-supplied factory immediately after the channel
/// reports active, stored under [`OPERATIONS_ATTRIBUTE`], and detached when
/// the channel closes. Callbacks run on the channel's event-loop thread and
/// must not block.
pub trait ChannelOperations: Send + Sync {
  /// Entry point, invoked exactly once with the protocol-bridge pipeline
  /// position after attachment.
  fn on_active(&self, ctx: StageContext);

  /// One inbound payload forwarded by the protocol-bridge stage.
  fn on_inbound(&self, _payload: Bytes) {}

  /// Final chance to observe closure, invoked as the operations object is
  /// detached from the channel.
  fn on_closed(&self) {}
}

/// Caller-supplied factory producing the operations object for one channel.
/// Must not block.
pub type OperationsFactory =
  Arc<dyn Fn(Arc<Channel>, &Arc<ServerContextHandler>) -> Arc<dyn ChannelOperations> + Send + Sync>;

/// Creates the operations object for `channel` and stores it under the
/// well-known key.
///
/// At most one attachment per channel: a second call is a programming error
/// surfaced as [`ChannelError::DoubleAttachment`], never a silent overwrite,
/// since overwriting would orphan the previous operations' in-flight state.
pub fn attach(
  channel: &Arc<Channel>,
  handler: &Arc<ServerContextHandler>,
  factory: &OperationsFactory,
) -> Result<Arc<dyn ChannelOperations>, ChannelError> {
  if channel.attributes().contains(&OPERATIONS_ATTRIBUTE) {
    tracing::error!(channel = channel.handle(), "operations already attached, refusing overwrite");
    return Err(ChannelError::DoubleAttachment {
      channel: channel.handle(),
    });
  }

  let op = factory(channel.clone(), handler);
  if !channel.attributes().insert_if_absent(&OPERATIONS_ATTRIBUTE, op.clone()) {
    // Lost a race with a concurrent attach; same programming error.
    tracing::error!(channel = channel.handle(), "operations already attached, refusing overwrite");
    return Err(ChannelError::DoubleAttachment {
      channel: channel.handle(),
    });
  }

  tracing::debug!(channel = channel.handle(), uri = %channel.endpoint(), "operations attached");
  Ok(op)
}
