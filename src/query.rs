//! Async query abstraction for view data.
//!
//! A `Query<T>` owns the loading / success / error state of one piece of
//! view data. `run()` spawns the fetch on the tokio runtime; the UI loop
//! calls `poll()` on every tick to pick up the result without blocking.
//!
//! Each run is tagged with the current [`Epoch`]. A result that arrives
//! after the epoch moved on is dropped instead of being shown.
//!
//! # Example
//!
//! ```ignore
//! let mut query = Query::new();
//! let api = api.clone();
//! let filters = filters.clone();
//! query.run(&epoch, async move { api.clients(&filters).await });
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use tokio::sync::mpsc;

use crate::api::FetchError;
use crate::epoch::{Epoch, EpochTag};

/// The state of a query
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
  /// Query has not been started, or its result was discarded
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed; holds a message fit for display
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_idle(&self) -> bool {
    matches!(self, QueryState::Idle)
  }

  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

pub struct Query<T> {
  state: QueryState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, FetchError>>>,
  tag: Option<EpochTag>,
}

impl<T> Default for Query<T> {
  fn default() -> Self {
    Self {
      state: QueryState::Idle,
      receiver: None,
      tag: None,
    }
  }
}

impl<T: Send + 'static> Query<T> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start `future`, replacing any fetch still in flight.
  ///
  /// Previous data is dropped: while loading, the view shows a loading
  /// state rather than the old payload.
  pub fn run<Fut>(&mut self, epoch: &Epoch, future: Fut)
  where
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
  {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.tag = Some(epoch.tag());
    self.state = QueryState::Loading;

    tokio::spawn(async move {
      let result = future.await;
      // Ignore send errors - receiver may have been dropped
      let _ = tx.send(result);
    });
  }

  /// Forget any in-flight fetch and return to idle.
  pub fn reset(&mut self) {
    self.receiver = None;
    self.tag = None;
    self.state = QueryState::Idle;
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived, error occurred, or
  /// a stale result was discarded). Call this in your event loop tick handler.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = match receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - the task panicked or was aborted
        self.receiver = None;
        self.state = QueryState::Error("Load was interrupted".to_string());
        return true;
      }
    };
    self.receiver = None;

    let current = self.tag.take().map(|t| t.is_current()).unwrap_or(false);
    if !current {
      tracing::debug!("discarding result from a previous epoch");
      self.state = QueryState::Idle;
      return true;
    }

    self.state = match result {
      Ok(data) => QueryState::Success(data),
      Err(e) => QueryState::Error(e.user_message()),
    };
    true
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("generation", &self.tag.as_ref().map(|t| t.generation()))
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::time::Duration;

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  #[tokio::test]
  async fn test_query_success() {
    let epoch = Epoch::new();
    let mut query = Query::new();
    assert!(matches!(query.state(), QueryState::Idle));

    query.run(&epoch, async { Ok::<_, FetchError>(vec![1, 2, 3]) });
    assert!(query.is_loading());

    settle().await;

    assert!(query.poll());
    assert_eq!(query.data(), Some(&vec![1, 2, 3]));
  }

  #[tokio::test]
  async fn test_query_error_uses_user_message() {
    let epoch = Epoch::new();
    let mut query: Query<i32> = Query::new();

    query.run(&epoch, async {
      Err(FetchError::Status {
        status: 500,
        message: "quota exceeded".to_string(),
      })
    });
    settle().await;

    assert!(query.poll());
    assert!(query.is_error());
    assert_eq!(query.error(), Some("quota exceeded"));
  }

  #[tokio::test]
  async fn test_stale_result_is_discarded() {
    let epoch = Epoch::new();
    let mut query = Query::new();

    query.run(&epoch, async { Ok::<_, FetchError>("old filter") });
    epoch.advance();
    settle().await;

    assert!(query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
    assert_eq!(query.data(), None);
  }

  #[tokio::test]
  async fn test_rerun_replaces_pending() {
    let epoch = Epoch::new();
    let mut query = Query::new();

    query.run(&epoch, async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok::<_, FetchError>(1)
    });
    query.run(&epoch, async { Ok::<_, FetchError>(2) });

    tokio::time::sleep(Duration::from_millis(100)).await;
    query.poll();
    assert_eq!(query.data(), Some(&2));
  }

  #[tokio::test]
  async fn test_poll_without_run_is_noop() {
    let mut query: Query<()> = Query::new();
    assert!(!query.poll());
  }

  #[tokio::test]
  async fn test_reset_drops_in_flight() {
    let epoch = Epoch::new();
    let mut query = Query::new();
    query.run(&epoch, async { Ok::<_, FetchError>(7) });
    query.reset();
    settle().await;
    assert!(!query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
  }
}
