// src/security/mod.rs

//! The seam to an external security/TLS implementation.
//!
//! This crate does not implement a handshake protocol; it only guarantees
//! that whatever stage a provider produces is installed at pipeline position
//! 0, ahead of every other stage, so nothing observes the byte stream before
//! security termination.

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::stage::ChannelStage;

use std::sync::Arc;

/// Produces the security-termination stage for accepted channels.
///
/// Implementations wrap a concrete TLS/handshake engine. A provider may
/// decide per channel: returning `Ok(None)` means this channel carries no
/// security stage. Construction failures are setup failures; they propagate
/// to the lifecycle bridge, which fails the completion sink and closes the
/// channel.
pub trait SecurityProvider: Send + Sync {
  fn security_stage(&self, channel: &Channel) -> Result<Option<Arc<dyn ChannelStage>>, ChannelError>;
}
