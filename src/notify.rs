//! Transient user notifications ("toasts").

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
  Error,
  Warning,
  Success,
}

/// Fire-and-forget sink for user-facing messages.
pub trait Notifier: Send + Sync {
  fn notify(&self, message: &str, kind: ToastKind);

  fn error(&self, message: &str) {
    self.notify(message, ToastKind::Error);
  }

  fn warning(&self, message: &str) {
    self.notify(message, ToastKind::Warning);
  }

  fn success(&self, message: &str) {
    self.notify(message, ToastKind::Success);
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
  pub message: String,
  pub kind: ToastKind,
  pub shown_at: Instant,
}

/// Shared toast queue. Each toast disappears once it is older than the
/// display duration, independently of anything else happening.
#[derive(Debug, Clone)]
pub struct Toasts {
  inner: Arc<Mutex<Vec<Toast>>>,
  display_for: Duration,
}

impl Toasts {
  pub fn new(display_for: Duration) -> Self {
    Self {
      inner: Arc::new(Mutex::new(Vec::new())),
      display_for,
    }
  }

  /// Drop expired toasts. Returns true if anything was removed.
  pub fn prune(&self) -> bool {
    let mut toasts = self.inner.lock().unwrap_or_else(|e| e.into_inner());
    let before = toasts.len();
    toasts.retain(|t| t.shown_at.elapsed() < self.display_for);
    toasts.len() != before
  }

  /// Toasts currently on screen, oldest first.
  pub fn visible(&self) -> Vec<Toast> {
    self.prune();
    self
      .inner
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }
}

impl Notifier for Toasts {
  fn notify(&self, message: &str, kind: ToastKind) {
    match kind {
      ToastKind::Error => tracing::error!(%message, "toast"),
      ToastKind::Warning => tracing::warn!(%message, "toast"),
      ToastKind::Success => tracing::info!(%message, "toast"),
    }
    self
      .inner
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .push(Toast {
        message: message.to_string(),
        kind,
        shown_at: Instant::now(),
      });
  }
}

/// Notifier that remembers every message, for tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
  pub seen: Arc<Mutex<Vec<(String, ToastKind)>>>,
}

#[cfg(test)]
impl RecordingNotifier {
  pub fn count(&self, kind: ToastKind) -> usize {
    self
      .seen
      .lock()
      .unwrap()
      .iter()
      .filter(|(_, k)| *k == kind)
      .count()
  }

  pub fn messages(&self) -> Vec<String> {
    self
      .seen
      .lock()
      .unwrap()
      .iter()
      .map(|(m, _)| m.clone())
      .collect()
  }
}

#[cfg(test)]
impl Notifier for RecordingNotifier {
  fn notify(&self, message: &str, kind: ToastKind) {
    self.seen.lock().unwrap().push((message.to_string(), kind));
  }
}
