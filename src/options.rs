// src/options.rs

//! Immutable per-listener configuration snapshots.

use crate::security::SecurityProvider;

use std::fmt;
use std::sync::Arc;

/// Configuration snapshot for the accept side of a listening endpoint.
///
/// An instance is built once, wrapped in an `Arc`, and read by the context
/// handler for the whole listener lifetime. There are no setters after
/// construction; every accessor is a plain read.
pub struct ServerOptions {
  /// Optional provider for the security-termination stage. `None` means
  /// accepted channels carry no security stage at all.
  security: Option<Arc<dyn SecurityProvider>>,
  /// Whether the shared diagnostic logging stage is appended to each
  /// accepted channel's pipeline.
  log_traffic: bool,
}

impl ServerOptions {
  /// Creates options with no security provider and traffic logging disabled.
  pub fn new() -> Self {
    Self {
      security: None,
      log_traffic: false,
    }
  }

  /// Returns a copy of these options with the given security provider set.
  pub fn with_security(mut self, provider: Arc<dyn SecurityProvider>) -> Self {
    self.security = Some(provider);
    self
  }

  /// Returns a copy of these options with traffic logging switched on or off.
  pub fn with_traffic_logging(mut self, enabled: bool) -> Self {
    self.log_traffic = enabled;
    self
  }

  /// The configured security provider, if any.
  pub fn security_provider(&self) -> Option<&Arc<dyn SecurityProvider>> {
    self.security.as_ref()
  }

  /// Whether the diagnostic logging stage is installed on accepted channels.
  pub fn log_traffic(&self) -> bool {
    self.log_traffic
  }
}

impl Default for ServerOptions {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Debug for ServerOptions {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ServerOptions")
      .field("security", &self.security.is_some())
      .field("log_traffic", &self.log_traffic)
      .finish()
  }
}
