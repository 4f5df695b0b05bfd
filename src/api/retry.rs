//! Retry budget and inter-attempt delay.

use std::time::Duration;

/// Upper bound on the random component added by `Backoff::Exponential { jitter: true }`.
const MAX_JITTER_MS: u64 = 150;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
  /// Every retry waits `RetryPolicy::delay`
  Fixed,
  /// `delay * 2^(attempt - 1)`, capped at `max_delay`
  Exponential { max_delay: Duration, jitter: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
  /// Retries after the first attempt; a request makes at most `max_retries + 1` attempts
  pub max_retries: u32,
  pub delay: Duration,
  pub backoff: Backoff,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      delay: Duration::from_millis(1_000),
      backoff: Backoff::Fixed,
    }
  }
}

impl RetryPolicy {
  /// Delay to wait after the failed `attempt` (1-indexed) before the next one.
  pub fn delay_after(&self, attempt: u32) -> Duration {
    match self.backoff {
      Backoff::Fixed => self.delay,
      Backoff::Exponential { max_delay, jitter } => {
        let exponent = 2u32.saturating_pow(attempt.saturating_sub(1));
        let base = self.delay.saturating_mul(exponent).min(max_delay);
        if jitter {
          base + Duration::from_millis(jitter_ms())
        } else {
          base
        }
      }
    }
  }
}

fn jitter_ms() -> u64 {
  std::time::SystemTime::now()
    .duration_since(std::time::UNIX_EPOCH)
    .map(|d| d.subsec_nanos() as u64)
    .unwrap_or(0)
    % MAX_JITTER_MS
}
