// src/channel/mod.rs

//! One accepted network channel: its pipeline, attribute store, and
//! lifecycle phase. Channels are owned by the surrounding I/O runtime; this
//! crate only ever holds non-owning `Arc` clones during setup.

pub mod attributes;
pub mod pipeline;

pub use attributes::{AttributeKey, AttributeMap};
pub use pipeline::{Pipeline, StageContext};

use crate::error::ChannelError;

use bytes::Bytes;
use std::fmt;

/// Lifecycle phase of one channel on the server path.
///
/// Legal transitions: `Accepted → PipelineAssembling → Active → Closed`,
/// with `PipelineAssembling → Closed` (setup failure) and
/// `Accepted → Closed` (teardown before assembly) as shortcuts. `Closed` is
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelPhase {
  Accepted,
  PipelineAssembling,
  Active,
  Closed,
}

impl ChannelPhase {
  pub fn name(&self) -> &'static str {
    match self {
      ChannelPhase::Accepted => "accepted",
      ChannelPhase::PipelineAssembling => "pipeline-assembling",
      ChannelPhase::Active => "active",
      ChannelPhase::Closed => "closed",
    }
  }
}

/// One network channel with its pipeline and attribute store.
pub struct Channel {
  handle: usize,
  endpoint: String,
  pipeline: Pipeline,
  attributes: AttributeMap,
  phase: parking_lot::Mutex<ChannelPhase>,
}

impl Channel {
  /// Creates a fresh channel in the `Accepted` phase.
  ///
  /// `handle` is the runtime-assigned id for this connection; `endpoint` is
  /// the peer URI (e.g. `tcp://127.0.0.1:41952`), used for logging and
  /// monitor events.
  pub fn new(handle: usize, endpoint: impl Into<String>) -> Self {
    let endpoint = endpoint.into();
    tracing::debug!(channel = handle, uri = %endpoint, "channel created");
    Self {
      handle,
      endpoint,
      pipeline: Pipeline::new(),
      attributes: AttributeMap::new(),
      phase: parking_lot::Mutex::new(ChannelPhase::Accepted),
    }
  }

  pub fn handle(&self) -> usize {
    self.handle
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  pub fn pipeline(&self) -> &Pipeline {
    &self.pipeline
  }

  pub fn attributes(&self) -> &AttributeMap {
    &self.attributes
  }

  pub fn phase(&self) -> ChannelPhase {
    *self.phase.lock()
  }

  /// Advances the lifecycle phase, enforcing the transition table.
  ///
  /// An attempted transition out of `Closed` is reported as late delivery so
  /// callers can discard the triggering event; any other illegal transition
  /// is an `InvalidState` error.
  pub(crate) fn advance_phase(&self, to: ChannelPhase) -> Result<(), ChannelError> {
    use ChannelPhase::*;
    let mut phase = self.phase.lock();
    let legal = matches!(
      (*phase, to),
      (Accepted, PipelineAssembling) | (PipelineAssembling, Active) | (PipelineAssembling, Closed) | (Active, Closed) | (Accepted, Closed)
    );
    if legal {
      tracing::trace!(channel = self.handle, from = %phase.name(), to = %to.name(), "channel phase advanced");
      *phase = to;
      Ok(())
    } else if *phase == Closed {
      Err(ChannelError::LateDelivery {
        channel: self.handle,
        event: to.name(),
      })
    } else {
      Err(ChannelError::InvalidState("illegal channel phase transition"))
    }
  }

  /// Feeds one inbound payload through the pipeline, in stage order.
  ///
  /// Stage callbacks run outside the pipeline lock and must not block.
  pub fn feed_inbound(&self, payload: Bytes) {
    let stages = self.pipeline.snapshot();
    tracing::trace!(channel = self.handle, size = payload.len(), stages = stages.len(), "feeding inbound payload");
    for stage in stages {
      stage.on_inbound(self, &payload);
    }
  }
}

impl fmt::Debug for Channel {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Channel")
      .field("handle", &self.handle)
      .field("endpoint", &self.endpoint)
      .field("phase", &self.phase())
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn phase_machine_accepts_the_documented_path() {
    let channel = Channel::new(1, "tcp://127.0.0.1:1");
    assert_eq!(channel.phase(), ChannelPhase::Accepted);
    channel.advance_phase(ChannelPhase::PipelineAssembling).unwrap();
    channel.advance_phase(ChannelPhase::Active).unwrap();
    channel.advance_phase(ChannelPhase::Closed).unwrap();
    assert_eq!(channel.phase(), ChannelPhase::Closed);
  }

  #[test]
  fn setup_failure_may_bypass_active() {
    let channel = Channel::new(2, "tcp://127.0.0.1:2");
    channel.advance_phase(ChannelPhase::PipelineAssembling).unwrap();
    channel.advance_phase(ChannelPhase::Closed).unwrap();
    assert_eq!(channel.phase(), ChannelPhase::Closed);
  }

  #[test]
  fn closed_is_terminal() {
    let channel = Channel::new(3, "tcp://127.0.0.1:3");
    channel.advance_phase(ChannelPhase::Closed).unwrap();
    let err = channel.advance_phase(ChannelPhase::Active).unwrap_err();
    assert!(matches!(err, ChannelError::LateDelivery { channel: 3, .. }));
  }

  #[test]
  fn skipping_assembly_is_rejected() {
    let channel = Channel::new(4, "tcp://127.0.0.1:4");
    let err = channel.advance_phase(ChannelPhase::Active).unwrap_err();
    assert!(matches!(err, ChannelError::InvalidState(_)));
    assert_eq!(channel.phase(), ChannelPhase::Accepted);
  }
}
