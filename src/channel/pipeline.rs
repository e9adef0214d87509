// src/channel/pipeline.rs

//! The ordered, named stage list installed on every channel.
//!
//! Stage ordering is security-relevant: the security-termination stage must
//! sit at position 0 so no later stage observes bytes before decryption, and
//! the diagnostic logging stage sits last so it observes fully-processed
//! traffic. The pipeline is an explicit, owned value so those invariants can
//! be verified without a live connection.

use crate::error::ChannelError;
use crate::stage::ChannelStage;

use std::fmt;
use std::sync::Arc;

/// A position in a pipeline, resolved by stage name.
///
/// Handed to channel operations on activation so they know where in the
/// pipeline the protocol bridge sits.
#[derive(Clone)]
pub struct StageContext {
  name: &'static str,
  position: usize,
  stage: Arc<dyn ChannelStage>,
}

impl StageContext {
  pub fn name(&self) -> &'static str {
    self.name
  }

  pub fn position(&self) -> usize {
    self.position
  }

  pub fn stage(&self) -> &Arc<dyn ChannelStage> {
    &self.stage
  }
}

impl fmt::Debug for StageContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("StageContext")
      .field("name", &self.name)
      .field("position", &self.position)
      .finish()
  }
}

/// Ordered list of named processing stages for one channel.
///
/// Mutation happens inside short critical sections; stage callbacks are
/// always invoked outside the lock.
#[derive(Default)]
pub struct Pipeline {
  stages: parking_lot::RwLock<Vec<Arc<dyn ChannelStage>>>,
}

impl Pipeline {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts `stage` at the front of the pipeline.
  ///
  /// Fails if a stage with the same name is already installed; stage names
  /// are unique within one pipeline.
  pub fn add_first(&self, stage: Arc<dyn ChannelStage>) -> Result<(), ChannelError> {
    {
      let mut stages = self.stages.write();
      if stages.iter().any(|s| s.name() == stage.name()) {
        tracing::warn!(stage = stage.name(), "rejecting duplicate pipeline stage");
        return Err(ChannelError::InvalidState("stage name already present in pipeline"));
      }
      stages.insert(0, stage.clone());
    }
    tracing::trace!(stage = stage.name(), "stage added at pipeline front");
    stage.on_added();
    Ok(())
  }

  /// Appends `stage` at the end of the pipeline.
  ///
  /// Fails if a stage with the same name is already installed.
  pub fn add_last(&self, stage: Arc<dyn ChannelStage>) -> Result<(), ChannelError> {
    {
      let mut stages = self.stages.write();
      if stages.iter().any(|s| s.name() == stage.name()) {
        tracing::warn!(stage = stage.name(), "rejecting duplicate pipeline stage");
        return Err(ChannelError::InvalidState("stage name already present in pipeline"));
      }
      stages.push(stage.clone());
    }
    tracing::trace!(stage = stage.name(), "stage added at pipeline tail");
    stage.on_added();
    Ok(())
  }

  /// Removes the stage with the given name, returning it if it was present.
  pub fn remove(&self, name: &str) -> Option<Arc<dyn ChannelStage>> {
    let removed = {
      let mut stages = self.stages.write();
      stages
        .iter()
        .position(|s| s.name() == name)
        .map(|idx| stages.remove(idx))
    };
    if let Some(ref stage) = removed {
      tracing::trace!(stage = stage.name(), "stage removed from pipeline");
      stage.on_removed();
    }
    removed
  }

  /// Removes every transient setup stage, returning how many were dropped.
  ///
  /// Transient stages only participate in connection setup and must not be
  /// left behind once the channel is active or closed.
  pub fn clear_transient(&self) -> usize {
    let removed: Vec<Arc<dyn ChannelStage>> = {
      let mut stages = self.stages.write();
      let (transient, rest): (Vec<_>, Vec<_>) = stages.drain(..).partition(|s| s.transient());
      *stages = rest;
      transient
    };
    for stage in &removed {
      tracing::trace!(stage = stage.name(), "transient setup stage cleared");
      stage.on_removed();
    }
    removed.len()
  }

  /// Resolves the pipeline position of the stage with the given name.
  pub fn context(&self, name: &'static str) -> Option<StageContext> {
    let stages = self.stages.read();
    stages.iter().position(|s| s.name() == name).map(|position| StageContext {
      name,
      position,
      stage: stages[position].clone(),
    })
  }

  /// Snapshot of the current stages, in order. Callers iterate outside the lock.
  pub(crate) fn snapshot(&self) -> Vec<Arc<dyn ChannelStage>> {
    self.stages.read().clone()
  }

  /// Stage names in pipeline order.
  pub fn names(&self) -> Vec<&'static str> {
    self.stages.read().iter().map(|s| s.name()).collect()
  }

  pub fn len(&self) -> usize {
    self.stages.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.stages.read().is_empty()
  }
}

impl fmt::Debug for Pipeline {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Pipeline").field("stages", &self.names()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct NamedStage {
    name: &'static str,
    transient: bool,
  }

  impl NamedStage {
    fn new(name: &'static str) -> Arc<Self> {
      Arc::new(Self { name, transient: false })
    }

    fn transient(name: &'static str) -> Arc<Self> {
      Arc::new(Self { name, transient: true })
    }
  }

  impl ChannelStage for NamedStage {
    fn name(&self) -> &'static str {
      self.name
    }

    fn transient(&self) -> bool {
      self.transient
    }
  }

  #[test]
  fn add_first_and_last_preserve_order() {
    let pipeline = Pipeline::new();
    pipeline.add_last(NamedStage::new("middle")).unwrap();
    pipeline.add_first(NamedStage::new("front")).unwrap();
    pipeline.add_last(NamedStage::new("tail")).unwrap();
    assert_eq!(pipeline.names(), vec!["front", "middle", "tail"]);
  }

  #[test]
  fn duplicate_names_are_rejected() {
    let pipeline = Pipeline::new();
    pipeline.add_last(NamedStage::new("only")).unwrap();
    let err = pipeline.add_first(NamedStage::new("only")).unwrap_err();
    assert!(matches!(err, ChannelError::InvalidState(_)));
    assert_eq!(pipeline.len(), 1);
  }

  #[test]
  fn remove_by_name() {
    let pipeline = Pipeline::new();
    pipeline.add_last(NamedStage::new("a")).unwrap();
    pipeline.add_last(NamedStage::new("b")).unwrap();
    assert!(pipeline.remove("a").is_some());
    assert!(pipeline.remove("a").is_none());
    assert_eq!(pipeline.names(), vec!["b"]);
  }

  #[test]
  fn context_reports_position() {
    let pipeline = Pipeline::new();
    pipeline.add_last(NamedStage::new("a")).unwrap();
    pipeline.add_last(NamedStage::new("b")).unwrap();
    let ctx = pipeline.context("b").expect("stage b must resolve");
    assert_eq!(ctx.name(), "b");
    assert_eq!(ctx.position(), 1);
    assert!(pipeline.context("missing").is_none());
  }

  #[test]
  fn clear_transient_only_drops_setup_stages() {
    let pipeline = Pipeline::new();
    pipeline.add_last(NamedStage::transient("setup-1")).unwrap();
    pipeline.add_last(NamedStage::new("keep")).unwrap();
    pipeline.add_last(NamedStage::transient("setup-2")).unwrap();
    assert_eq!(pipeline.clear_transient(), 2);
    assert_eq!(pipeline.names(), vec!["keep"]);
    assert_eq!(pipeline.clear_transient(), 0);
  }
}
