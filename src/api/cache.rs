//! In-memory response cache keyed by the full request shape.

use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use super::transport::RequestOptions;

/// Structured cache key: endpoint plus normalized options, compared by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
  pub endpoint: String,
  pub options: RequestOptions,
}

impl RequestKey {
  pub fn new(endpoint: &str, options: &RequestOptions) -> Self {
    Self {
      endpoint: endpoint.to_string(),
      options: options.clone(),
    }
  }

  /// Stable short digest for log lines. Header values are left out so
  /// bearer tokens never reach the logs.
  pub fn digest(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.options.method.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(self.endpoint.as_bytes());
    for (k, v) in &self.options.params {
      hasher.update(b"\0");
      hasher.update(k.as_bytes());
      hasher.update(b"=");
      hasher.update(v.as_bytes());
    }
    for k in self.options.headers.keys() {
      hasher.update(b"\0h:");
      hasher.update(k.as_bytes());
    }
    if let Some(body) = &self.options.body {
      hasher.update(b"\0b:");
      hasher.update(body.as_bytes());
    }
    hex::encode(&hasher.finalize()[..8])
  }
}

#[derive(Debug, Clone)]
struct CacheEntry {
  data: Value,
  captured_at: Instant,
}

/// Time-boxed map of successful responses.
///
/// Entries older than the cache duration are treated as absent but kept
/// until overwritten or cleared.
#[derive(Debug)]
pub struct ResponseCache {
  entries: Mutex<HashMap<RequestKey, CacheEntry>>,
  duration: Duration,
}

impl ResponseCache {
  pub fn new(duration: Duration) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      duration,
    }
  }

  /// Fresh payload for `key`, if any.
  pub fn get(&self, key: &RequestKey) -> Option<Value> {
    let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries
      .get(key)
      .filter(|entry| entry.captured_at.elapsed() < self.duration)
      .map(|entry| entry.data.clone())
  }

  pub fn insert(&self, key: RequestKey, data: Value) {
    let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
    entries.insert(
      key,
      CacheEntry {
        data,
        captured_at: Instant::now(),
      },
    );
  }

  pub fn clear(&self) {
    self
      .entries
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clear();
  }

  /// Number of stored entries, expired ones included.
  pub fn len(&self) -> usize {
    self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
  }
}
