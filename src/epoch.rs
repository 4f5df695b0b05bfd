//! Generation counter for discarding stale async results.
//!
//! Every tab switch, filter change and refresh advances the epoch. Work
//! started under an older epoch may still finish, but its result must not
//! land in the current view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Epoch {
  current: Arc<AtomicU64>,
}

impl Epoch {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn current(&self) -> u64 {
    self.current.load(Ordering::SeqCst)
  }

  /// Move to a new generation and return it.
  pub fn advance(&self) -> u64 {
    self.current.fetch_add(1, Ordering::SeqCst) + 1
  }

  /// Tag for work starting now.
  pub fn tag(&self) -> EpochTag {
    EpochTag {
      epoch: self.clone(),
      started_at: self.current(),
    }
  }
}

/// Remembers the generation a piece of work started in.
#[derive(Debug, Clone)]
pub struct EpochTag {
  epoch: Epoch,
  started_at: u64,
}

impl EpochTag {
  pub fn is_current(&self) -> bool {
    self.epoch.current() == self.started_at
  }

  pub fn generation(&self) -> u64 {
    self.started_at
  }
}
