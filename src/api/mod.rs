//! Access to the dashboard API.
//!
//! Layers, bottom-up:
//! - `transport`: one HTTP attempt
//! - `cache` / `retry`: response reuse and the retry budget
//! - `fetch`: the caching, retrying client that ties them together
//! - `client`: typed endpoints on top of `fetch`

pub mod cache;
pub mod client;
pub mod error;
pub mod fetch;
pub mod retry;
pub mod transport;
pub mod types;

pub use client::DashboardApi;
pub use error::FetchError;
pub use fetch::FetchClient;
