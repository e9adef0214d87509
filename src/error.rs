use thiserror::Error;

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum ChannelError {
  // --- Setup Errors ---
  /// Pipeline assembly or security-context construction failed before the
  /// channel became active. Delivered through the completion sink exactly once.
  #[error("channel setup failed: {0}")]
  SetupFailure(String),

  /// The configured security provider could not construct its stage.
  #[error("security stage construction failed: {0}")]
  SecurityStage(String),

  // --- Attachment Errors ---
  /// Operations were already attached to this channel. Overwriting would
  /// orphan the previous operations' in-flight state, so this is fatal to
  /// the channel's setup.
  #[error("operations already attached to channel {channel}")]
  DoubleAttachment { channel: usize },

  // --- Lifecycle Errors ---
  /// A lifecycle event arrived for a channel that is already closed.
  /// Logged and discarded by the caller, never propagated further.
  #[error("late lifecycle event '{event}' for closed channel {channel}")]
  LateDelivery { channel: usize, event: &'static str },

  /// The requested operation is invalid for the channel's current phase.
  #[error("operation is invalid for the current channel phase: {0}")]
  InvalidState(&'static str),

  // --- Internal Errors ---
  #[error("internal library error: {0}")]
  Internal(String),
}
