// src/runtime/mod.rs

//! Core asynchronous primitives: the completion cell and monitor events.

pub mod completion;
pub mod events;

pub use completion::{completion_pair, CompletionHandle, CompletionSink};
pub use events::{monitor_channel, ChannelEvent, MonitorReceiver, MonitorSender, DEFAULT_MONITOR_CAPACITY};
