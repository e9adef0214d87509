// src/runtime/completion.rs

//! The write-once completion cell signaling listener readiness or failure.

use crate::error::ChannelError;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// Creates a connected sink/handle pair.
///
/// The sink goes to the context handler (the exclusive writer); the handle
/// goes to the caller that initiated listening, which awaits it once.
pub fn completion_pair<T>() -> (CompletionSink<T>, CompletionHandle<T>) {
  let (tx, rx) = oneshot::channel();
  (
    CompletionSink {
      fired: Arc::new(AtomicBool::new(false)),
      sender: Arc::new(parking_lot::Mutex::new(Some(tx))),
    },
    CompletionHandle { receiver: rx },
  )
}

/// The writing half of a single-assignment result cell.
///
/// The first writer wins via an atomic compare-and-set; every later write is
/// a logged no-op. The guard is lock-free on the contended path, so a losing
/// event-loop thread is never blocked. Clones share the same cell.
pub struct CompletionSink<T> {
  fired: Arc<AtomicBool>,
  // Only the CAS winner ever takes the sender, so this lock is uncontended.
  sender: Arc<parking_lot::Mutex<Option<oneshot::Sender<Result<T, ChannelError>>>>>,
}

impl<T> Clone for CompletionSink<T> {
  fn clone(&self) -> Self {
    Self {
      fired: self.fired.clone(),
      sender: self.sender.clone(),
    }
  }
}

impl<T> CompletionSink<T> {
  /// Delivers the success value. Returns `false` if the cell already fired.
  pub fn succeed(&self, value: T) -> bool {
    self.complete(Ok(value))
  }

  /// Delivers the failure. Returns `false` if the cell already fired.
  pub fn fail(&self, error: ChannelError) -> bool {
    self.complete(Err(error))
  }

  /// Whether a terminal result has already been written.
  pub fn is_fired(&self) -> bool {
    self.fired.load(Ordering::Acquire)
  }

  fn complete(&self, result: Result<T, ChannelError>) -> bool {
    if self
      .fired
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .is_err()
    {
      match result {
        Ok(_) => tracing::debug!("completion sink already fired, dropping late success"),
        Err(e) => tracing::warn!(error = %e, "completion sink already fired, dropping late failure"),
      }
      return false;
    }

    // We won the CAS, so the sender is still present unless the pair was
    // constructed elsewhere; a dropped receiver is a normal outcome.
    if let Some(sender) = self.sender.lock().take() {
      let _ = sender.send(result);
    }
    true
  }
}

/// The awaiting half of the cell, held by the caller that started listening.
pub struct CompletionHandle<T> {
  receiver: oneshot::Receiver<Result<T, ChannelError>>,
}

impl<T> CompletionHandle<T> {
  /// Waits for the one terminal result.
  pub async fn ready(self) -> Result<T, ChannelError> {
    self
      .receiver
      .await
      .map_err(|_| ChannelError::Internal("completion sink dropped before firing".into()))?
  }
}
