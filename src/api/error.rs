use reqwest::StatusCode;

/// Failure of a single fetch, or of a whole request once its retries are spent.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FetchError {
  /// Transport failure: connect, timeout, reset
  #[error("network error: {0}")]
  Network(String),
  /// Upstream answered with a non-2xx status
  #[error("HTTP {status}: {message}")]
  Status { status: u16, message: String },
  /// Upstream answered 2xx but the body was not the JSON we expected
  #[error("invalid response: {0}")]
  Parse(String),
  /// The caller asked for something that can never succeed
  #[error("invalid request: {0}")]
  Validation(String),
}

impl FetchError {
  pub fn is_retryable(&self) -> bool {
    !matches!(self, FetchError::Validation(_))
  }

  /// Build a status error, preferring the `error` field of a JSON body.
  pub fn from_status(status: u16, body: &[u8]) -> Self {
    let message = serde_json::from_slice::<serde_json::Value>(body)
      .ok()
      .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
      .unwrap_or_else(|| {
        StatusCode::from_u16(status)
          .ok()
          .and_then(|s| s.canonical_reason())
          .unwrap_or("unexpected status")
          .to_string()
      });
    FetchError::Status { status, message }
  }

  /// Short message suitable for a toast or a view's error line.
  pub fn user_message(&self) -> String {
    match self {
      FetchError::Status { message, .. } => message.clone(),
      FetchError::Network(_) => "Server unreachable".to_string(),
      FetchError::Parse(_) => "Unexpected response from server".to_string(),
      FetchError::Validation(msg) => msg.clone(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_status_message_from_error_field() {
    let err = FetchError::from_status(500, br#"{"error": "BigQuery quota exceeded"}"#);
    assert_eq!(
      err,
      FetchError::Status {
        status: 500,
        message: "BigQuery quota exceeded".to_string()
      }
    );
    assert_eq!(err.user_message(), "BigQuery quota exceeded");
  }

  #[test]
  fn test_status_message_falls_back_to_reason() {
    let err = FetchError::from_status(503, b"<html>oops</html>");
    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
  }

  #[test]
  fn test_only_validation_is_not_retryable() {
    assert!(FetchError::Network("reset".into()).is_retryable());
    assert!(FetchError::Parse("eof".into()).is_retryable());
    assert!(FetchError::from_status(404, b"").is_retryable());
    assert!(!FetchError::Validation("empty endpoint".into()).is_retryable());
  }
}
