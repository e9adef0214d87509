// src/stage/mod.rs

//! Named pipeline stages and the stable stage-name constants.

pub mod bridge;
pub mod logging;

pub use bridge::ProtocolBridgeStage;
pub use logging::LoggingStage;

use crate::channel::Channel;

use bytes::Bytes;

/// Stable stage names, used both for insertion ordering and for later lookup
/// via `pipeline.context(name)`.
pub mod names {
  /// The security-termination stage. If present it must occupy position 0.
  pub const SECURITY: &str = "wharf.security";
  /// The diagnostic logging stage. If enabled it occupies the last position.
  pub const LOGGING: &str = "wharf.logging";
  /// The stage bridging raw traffic to the attached channel operations.
  pub const PROTOCOL_BRIDGE: &str = "wharf.protocol-bridge";
}

/// A named, ordered unit of per-channel processing.
///
/// Implementations must be cheap and non-blocking: every callback runs
/// synchronously on the channel's event-loop thread.
pub trait ChannelStage: Send + Sync {
  /// The stage's stable name within a pipeline. Names are unique per pipeline.
  fn name(&self) -> &'static str;

  /// Whether this stage only participates in connection setup. Transient
  /// stages are cleared when the channel activates or closes.
  fn transient(&self) -> bool {
    false
  }

  /// Called after the stage has been inserted into a pipeline.
  fn on_added(&self) {}

  /// Called after the stage has been removed from a pipeline.
  fn on_removed(&self) {}

  /// Observes one inbound payload travelling through the pipeline.
  fn on_inbound(&self, _channel: &Channel, _payload: &Bytes) {}
}
