// tests/common.rs
#![allow(dead_code)] // Allow unused helpers across test binaries

use wharf::channel::{Channel, StageContext};
use wharf::operations::ChannelOperations;
use wharf::runtime::{completion_pair, monitor_channel, CompletionHandle, MonitorReceiver, DEFAULT_MONITOR_CAPACITY};
use wharf::stage::ProtocolBridgeStage;
use wharf::{ChannelError, LoggingStage, OperationsFactory, SecurityProvider, ServerContextHandler, ServerOptions};

use bytes::Bytes;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static CHANNEL_HANDLE_COUNTER: AtomicUsize = AtomicUsize::new(1);

// Use std::sync::Once for one-time initialization
static TRACING_INIT: Once = Once::new();

// Setup function to initialize tracing
pub fn setup_tracing() {
  TRACING_INIT.call_once(|| {
    // Default level filter; can be overridden by RUST_LOG env variable.
    let default_filter = "wharf=trace,debug,info,warn";
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_test_writer()
      .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set global tracing subscriber");
  });
}

/// A fresh channel with the protocol bridge pre-installed, the way the
/// embedder initializes accepted connections before assembly runs.
pub fn test_channel(endpoint: &str) -> Arc<Channel> {
  setup_tracing();
  let handle = CHANNEL_HANDLE_COUNTER.fetch_add(1, Ordering::Relaxed);
  let channel = Arc::new(Channel::new(handle, endpoint));
  channel
    .pipeline()
    .add_last(Arc::new(ProtocolBridgeStage::new()))
    .expect("bridge stage install");
  channel
}

/// Operations double that counts its callbacks and remembers payloads.
#[derive(Default)]
pub struct RecordingOperations {
  pub active_calls: AtomicUsize,
  pub closed_calls: AtomicUsize,
  pub active_contexts: parking_lot::Mutex<Vec<(String, usize)>>,
  pub inbound: parking_lot::Mutex<Vec<Bytes>>,
}

impl RecordingOperations {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }
}

impl ChannelOperations for RecordingOperations {
  fn on_active(&self, ctx: StageContext) {
    self.active_calls.fetch_add(1, Ordering::Relaxed);
    self.active_contexts.lock().push((ctx.name().to_string(), ctx.position()));
  }

  fn on_inbound(&self, payload: Bytes) {
    self.inbound.lock().push(payload);
  }

  fn on_closed(&self) {
    self.closed_calls.fetch_add(1, Ordering::Relaxed);
  }
}

/// Factory returning clones of one shared recording double, so tests can
/// inspect what the handler did with it.
pub fn recording_factory(ops: Arc<RecordingOperations>) -> OperationsFactory {
  Arc::new(move |_channel, _handler| ops.clone() as Arc<dyn ChannelOperations>)
}

/// Factory counting how many operations objects were ever produced.
pub fn counting_factory(counter: Arc<AtomicUsize>) -> OperationsFactory {
  Arc::new(move |_channel, _handler| {
    counter.fetch_add(1, Ordering::Relaxed);
    RecordingOperations::new() as Arc<dyn ChannelOperations>
  })
}

/// Security provider returning a plain named stage, standing in for a real
/// TLS terminator.
pub struct StubSecurityProvider;

impl SecurityProvider for StubSecurityProvider {
  fn security_stage(
    &self,
    _channel: &Channel,
  ) -> Result<Option<Arc<dyn wharf::ChannelStage>>, ChannelError> {
    Ok(Some(Arc::new(StubSecurityStage)))
  }
}

pub struct StubSecurityStage;

impl wharf::ChannelStage for StubSecurityStage {
  fn name(&self) -> &'static str {
    wharf::stage::names::SECURITY
  }
}

/// Security provider whose stage construction always fails.
pub struct FailingSecurityProvider;

impl SecurityProvider for FailingSecurityProvider {
  fn security_stage(
    &self,
    _channel: &Channel,
  ) -> Result<Option<Arc<dyn wharf::ChannelStage>>, ChannelError> {
    Err(ChannelError::SecurityStage("stub handshake context unavailable".into()))
  }
}

/// Everything a lifecycle test needs: handler, completion handle, monitor.
pub struct TestHarness {
  pub handler: Arc<ServerContextHandler>,
  pub ready: CompletionHandle<Arc<ServerContextHandler>>,
  pub monitor: MonitorReceiver,
}

pub fn test_handler(endpoint: &str, factory: OperationsFactory, options: ServerOptions) -> TestHarness {
  setup_tracing();
  let (sink, ready) = completion_pair();
  let (monitor_tx, monitor) = monitor_channel(DEFAULT_MONITOR_CAPACITY);
  let handler = ServerContextHandler::new(
    endpoint,
    factory,
    Arc::new(options),
    sink,
    Arc::new(LoggingStage::new("wharf-test")),
    Some(monitor_tx),
  );
  TestHarness { handler, ready, monitor }
}
