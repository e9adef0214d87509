// src/handler/server.rs

use super::lifecycle::LifecycleBridge;
use super::{assemble_pipeline, ContextBridge};
use crate::channel::Channel;
use crate::error::ChannelError;
use crate::operations::{self, OperationsFactory};
use crate::options::ServerOptions;
use crate::runtime::{CompletionSink, MonitorSender};
use crate::stage::{names, LoggingStage};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::Notify;

/// The accept-side context handler for one listening endpoint.
///
/// Composes the pipeline assembler, the lifecycle bridge, and operation
/// attachment. The handler itself is the value delivered through the
/// completion sink when the listener starts; callers hold on to it to
/// request graceful shutdown later via [`dispose`](Self::dispose).
pub struct ServerContextHandler {
  endpoint: String,
  ops_factory: OperationsFactory,
  options: Arc<ServerOptions>,
  bridge: LifecycleBridge<Arc<ServerContextHandler>>,
  /// Shared across all accepted channels to avoid per-connection allocation.
  logging_stage: Arc<LoggingStage>,
  disposed: AtomicBool,
  close_notify: Notify,
  self_ref: Weak<ServerContextHandler>,
}

impl ServerContextHandler {
  /// Creates the handler for a listener on `endpoint`.
  ///
  /// The handler is the exclusive writer of `sink` and writes it at most
  /// once over its whole lifetime.
  pub fn new(
    endpoint: impl Into<String>,
    ops_factory: OperationsFactory,
    options: Arc<ServerOptions>,
    sink: CompletionSink<Arc<ServerContextHandler>>,
    logging_stage: Arc<LoggingStage>,
    monitor: Option<MonitorSender>,
  ) -> Arc<Self> {
    let endpoint = endpoint.into();
    tracing::debug!(uri = %endpoint, options = ?options, "creating server context handler");
    Arc::new_cyclic(|self_ref| Self {
      bridge: LifecycleBridge::new(sink, monitor, endpoint.clone()),
      endpoint,
      ops_factory,
      options,
      logging_stage,
      disposed: AtomicBool::new(false),
      close_notify: Notify::new(),
      self_ref: self_ref.clone(),
    })
  }

  pub fn endpoint(&self) -> &str {
    &self.endpoint
  }

  pub fn options(&self) -> &Arc<ServerOptions> {
    &self.options
  }

  /// Fails the channel's setup, before it becomes active.
  ///
  /// Called by the embedder when pipeline assembly returned an error or the
  /// transport failed during setup. Delivers the failure through the
  /// completion sink if it has not fired yet; otherwise the error stays
  /// local to the channel.
  pub fn fail_setup(&self, channel: &Arc<Channel>, error: ChannelError) {
    self.bridge.setup_failed(channel, error);
  }

  /// Processes a channel's `closed` event: clears transient stages and
  /// detaches the operations object. Late events for already-closed
  /// channels are logged and discarded.
  pub fn on_channel_closed(&self, channel: &Arc<Channel>) {
    if let Err(e) = self.bridge.channel_closed(channel) {
      tracing::debug!(channel = channel.handle(), error = %e, "discarding late lifecycle event");
    }
  }

  /// Requests graceful shutdown of the listening context.
  ///
  /// Idempotent. If the listener never started, the completion sink is
  /// failed so an awaiting caller is released.
  pub fn dispose(&self) {
    if self
      .disposed
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_ok()
    {
      tracing::info!(uri = %self.endpoint, "listener context disposed");
      self.bridge.listener_disposed();
      self.close_notify.notify_waiters();
    } else {
      tracing::debug!(uri = %self.endpoint, "listener context already disposed");
    }
  }

  /// Whether [`dispose`](Self::dispose) has been called.
  pub fn is_disposed(&self) -> bool {
    self.disposed.load(Ordering::Acquire)
  }

  /// Waits until the listening context is disposed.
  pub async fn closed(&self) {
    loop {
      // Register interest before re-checking to avoid missing a wakeup.
      let notified = self.close_notify.notified();
      if self.is_disposed() {
        return;
      }
      notified.await;
    }
  }

  fn upgraded_self(&self) -> Result<Arc<ServerContextHandler>, ChannelError> {
    self
      .self_ref
      .upgrade()
      .ok_or_else(|| ChannelError::Internal("context handler dropped during event delivery".into()))
  }
}

impl ContextBridge for ServerContextHandler {
  /// The underlying listener transitioned to serving.
  ///
  /// Delivers the one-time success (the handler itself) through the
  /// completion sink. A server's "ready" is the listener, which starts
  /// once; per-channel activation flows through
  /// [`terminate_channel`](Self::terminate_channel) instead.
  fn on_started(&self) {
    match self.upgraded_self() {
      Ok(handler) => {
        self.bridge.signal_started(handler);
      }
      Err(e) => {
        tracing::warn!(uri = %self.endpoint, error = %e, "started signal with no live handler reference");
      }
    }
  }

  /// Intentionally a no-op on the server path: the listener's readiness was
  /// already signaled via `on_started`, and per-channel activation is
  /// handled by `terminate_channel`.
  fn on_context_active(&self, channel: &Arc<Channel>) {
    tracing::trace!(channel = channel.handle(), "server variant ignores per-channel context activation");
  }

  /// An accepted channel is fully processed and ready for application
  /// traffic.
  ///
  /// Clears any transient setup stages, attaches the operations object, and
  /// hands it activation at the protocol-bridge pipeline position.
  fn terminate_channel(&self, channel: &Arc<Channel>) -> Result<(), ChannelError> {
    let handler = self.upgraded_self()?;
    self.bridge.mark_active(channel)?;

    let cleared = channel.pipeline().clear_transient();
    if cleared > 0 {
      tracing::debug!(channel = channel.handle(), cleared, "transient setup stages cleared before attach");
    }

    let op = operations::attach(channel, &handler, &self.ops_factory)?;

    let bridge_ctx = channel
      .pipeline()
      .context(names::PROTOCOL_BRIDGE)
      .ok_or(ChannelError::InvalidState("protocol bridge stage missing from pipeline"))?;
    op.on_active(bridge_ctx);

    self.bridge.channel_activated(channel);
    Ok(())
  }

  /// Assembles the channel's pipeline: security stage first if configured,
  /// logging stage last if enabled.
  ///
  /// At most once per channel; the phase machine rejects a second attempt.
  /// Errors propagate so the embedder can route them to
  /// [`fail_setup`](Self::fail_setup).
  fn build_pipeline(&self, channel: &Arc<Channel>) -> Result<(), ChannelError> {
    self.bridge.mark_assembling(channel)?;
    assemble_pipeline(channel, &self.options, &self.logging_stage)
  }
}

impl fmt::Debug for ServerContextHandler {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServerContextHandler")
      .field("endpoint", &self.endpoint)
      .field("started", &self.bridge.sink_fired())
      .field("disposed", &self.is_disposed())
      .finish_non_exhaustive()
  }
}
