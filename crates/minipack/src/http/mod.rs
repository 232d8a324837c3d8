//! HTTP transport used for archive downloads and registry queries.

mod client;

pub use client::{HttpClient, HttpClientConfig, HttpError};
