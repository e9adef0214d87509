// src/lib.rs

//! wharf - An asynchronous, pure-Rust channel bootstrap core.
//!
//! wharf bridges a low-level, event-driven connection's lifecycle
//! (bind, active, close) to a single-fire completion result, while
//! deterministically assembling each connection's processing pipeline
//! (security termination first, diagnostic logging last) and attaching the
//! per-connection operations object that handles application traffic.

// Declare modules that make up the library.

/// One accepted channel: pipeline, attribute store, lifecycle phase.
pub mod channel;
/// Defines custom error types used throughout the library.
pub mod error;
/// Context handlers composing assembly, lifecycle bridging, and attachment.
pub mod handler;
/// Per-channel operation objects and their attachment discipline.
pub mod operations;
/// Immutable per-listener configuration snapshots.
pub mod options;
/// Core asynchronous primitives: completion cells and monitor events.
pub mod runtime;
/// The seam to an external security/TLS implementation.
pub mod security;
/// Named pipeline stages and the stable stage-name constants.
pub mod stage;

// Re-export core types for user convenience, making them accessible directly
// from the crate root (e.g., `wharf::ChannelError`, `wharf::Channel`).
pub use channel::{AttributeKey, AttributeMap, Channel, ChannelPhase, Pipeline, StageContext};
pub use error::ChannelError;
pub use handler::{ContextBridge, ServerContextHandler};
pub use operations::{ChannelOperations, OperationsFactory, OPERATIONS_ATTRIBUTE};
pub use options::ServerOptions;
pub use runtime::{completion_pair, monitor_channel, ChannelEvent, CompletionHandle, CompletionSink};
pub use security::SecurityProvider;
pub use stage::{ChannelStage, LoggingStage, ProtocolBridgeStage};

// --- Top-Level Library Information Functions ---

/// Major version number of the wharf library.
const VERSION_MAJOR: i32 = 0;
/// Minor version number of the wharf library.
const VERSION_MINOR: i32 = 1;
/// Patch version number of the wharf library.
const VERSION_PATCH: i32 = 0;

/// Returns the library version as a tuple (major, minor, patch).
pub fn version() -> (i32, i32, i32) {
  (VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH)
}

/// Returns the major version number of the library.
pub fn version_major() -> i32 {
  VERSION_MAJOR
}

/// Returns the minor version number of the library.
pub fn version_minor() -> i32 {
  VERSION_MINOR
}

/// Returns the patch version number of the library.
pub fn version_patch() -> i32 {
  VERSION_PATCH
}
