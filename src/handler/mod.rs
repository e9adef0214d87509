// src/handler/mod.rs

//! Context handlers: the composition of pipeline assembly, the lifecycle
//! bridge, and operation attachment for one endpoint.

pub mod lifecycle;
pub mod server;

pub use server::ServerContextHandler;

use crate::channel::Channel;
use crate::error::ChannelError;
use crate::options::ServerOptions;
use crate::stage::{ChannelStage, LoggingStage};

use std::sync::Arc;

/// The capability set a context handler exposes to the surrounding
/// transport: lifecycle reactions and pipeline assembly.
///
/// Server-side and client-side handlers differ in what "started" and
/// "active" mean; the variant is selected at construction by choosing the
/// implementation, not by subclassing.
pub trait ContextBridge: Send + Sync {
  /// The underlying listener/connector transitioned to serving/connected.
  fn on_started(&self);

  /// A channel's context reported active.
  fn on_context_active(&self, channel: &Arc<Channel>);

  /// A channel is fully processed and ready for application traffic.
  fn terminate_channel(&self, channel: &Arc<Channel>) -> Result<(), ChannelError>;

  /// Installs the processing stages on a freshly accepted channel.
  fn build_pipeline(&self, channel: &Arc<Channel>) -> Result<(), ChannelError>;
}

/// Installs the security and logging stages on `channel`'s pipeline.
///
/// The security stage, when the provider yields one, goes first so no other
/// stage observes the byte stream before security termination; the shared
/// logging stage goes last, only when traffic logging is enabled. A security
/// construction failure propagates so the lifecycle bridge can turn it into
/// the completion sink's failure.
pub(crate) fn assemble_pipeline(
  channel: &Channel,
  options: &ServerOptions,
  logging_stage: &Arc<LoggingStage>,
) -> Result<(), ChannelError> {
  if let Some(provider) = options.security_provider() {
    if let Some(stage) = provider.security_stage(channel)? {
      channel.pipeline().add_first(stage)?;
      tracing::debug!(channel = channel.handle(), "security stage installed at pipeline front");
    }
  }

  if options.log_traffic() {
    let stage: Arc<dyn ChannelStage> = logging_stage.clone();
    channel.pipeline().add_last(stage)?;
    tracing::debug!(channel = channel.handle(), "logging stage installed at pipeline tail");
  }

  Ok(())
}
