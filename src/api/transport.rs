//! The network seam of the fetch client.

use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::FetchError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Method {
  #[default]
  Get,
  Post,
}

impl Method {
  pub fn as_str(&self) -> &'static str {
    match self {
      Method::Get => "GET",
      Method::Post => "POST",
    }
  }
}

/// What to send besides the endpoint.
///
/// Parameters and headers are sorted maps so that two logically equal
/// option sets always compare equal, whatever order they were built in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestOptions {
  pub method: Method,
  pub params: BTreeMap<String, String>,
  pub headers: BTreeMap<String, String>,
  pub body: Option<String>,
}

impl RequestOptions {
  pub fn get() -> Self {
    Self::default()
  }

  pub fn param(mut self, key: &str, value: impl Into<String>) -> Self {
    self.params.insert(key.to_string(), value.into());
    self
  }

  pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
    self.headers.insert(name.to_ascii_lowercase(), value.into());
    self
  }

  pub fn bearer(self, token: Option<&str>) -> Self {
    match token {
      Some(t) => self.header("authorization", format!("Bearer {}", t)),
      None => self,
    }
  }
}

/// Split an endpoint that carries its own query string into the bare path
/// and options with those parameters merged in. Parameters already set on
/// `options` win over the ones in the endpoint.
pub fn split_query(endpoint: &str, options: &RequestOptions) -> (String, RequestOptions) {
  let Some((path, query)) = endpoint.split_once('?') else {
    return (endpoint.to_string(), options.clone());
  };
  let mut merged = options.clone();
  for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
    merged
      .params
      .entry(key.into_owned())
      .or_insert_with(|| value.into_owned());
  }
  (path.to_string(), merged)
}

/// Raw answer from upstream, before status interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
  pub status: u16,
  pub body: Vec<u8>,
}

impl RawResponse {
  pub fn is_success(&self) -> bool {
    (200..300).contains(&self.status)
  }
}

/// Sends one attempt of a request. Retrying and caching live above this trait.
pub trait Transport: Send + Sync {
  fn send<'a>(
    &'a self,
    endpoint: &'a str,
    options: &'a RequestOptions,
  ) -> BoxFuture<'a, Result<RawResponse, FetchError>>;
}

/// reqwest-backed transport against the dashboard API.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
  base_url: url::Url,
}

impl HttpTransport {
  pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
    let base_url = url::Url::parse(base_url)
      .map_err(|e| FetchError::Validation(format!("invalid base url {}: {}", base_url, e)))?;
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| FetchError::Network(e.to_string()))?;
    Ok(Self { client, base_url })
  }

  /// Absolute URL for an endpoint, with the option parameters as query string.
  /// The endpoint path is appended to the base path, so a base like
  /// `https://host/dashboard` keeps its prefix.
  pub fn url_for(&self, endpoint: &str, options: &RequestOptions) -> Result<url::Url, FetchError> {
    let (path, options) = split_query(endpoint, options);
    let mut url = self.base_url.clone();
    url.set_query(None);
    url.set_fragment(None);
    url
      .path_segments_mut()
      .map_err(|_| FetchError::Validation(format!("base url cannot take a path: {}", self.base_url)))?
      .pop_if_empty()
      .extend(path.trim_start_matches('/').split('/'));
    if !options.params.is_empty() {
      url.query_pairs_mut().extend_pairs(options.params.iter());
    }
    Ok(url)
  }
}

impl Transport for HttpTransport {
  fn send<'a>(
    &'a self,
    endpoint: &'a str,
    options: &'a RequestOptions,
  ) -> BoxFuture<'a, Result<RawResponse, FetchError>> {
    Box::pin(async move {
      let url = self.url_for(endpoint, options)?;
      let mut request = match options.method {
        Method::Get => self.client.get(url),
        Method::Post => self.client.post(url),
      };
      for (name, value) in &options.headers {
        request = request.header(name.as_str(), value.as_str());
      }
      if let Some(body) = &options.body {
        request = request
          .header(reqwest::header::CONTENT_TYPE, "application/json")
          .body(body.clone());
      }

      let response = request
        .send()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;
      let status = response.status().as_u16();
      let body = response
        .bytes()
        .await
        .map_err(|e| FetchError::Network(e.to_string()))?;

      Ok(RawResponse {
        status,
        body: body.to_vec(),
      })
    })
  }
}
