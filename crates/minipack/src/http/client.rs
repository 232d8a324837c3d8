//! HTTP client for fetching archives and registry documents.
//!
//! A thin wrapper around `reqwest` that adds:
//! - Streaming downloads to disk with an optional progress callback
//! - Status checking that keeps the canonical reason phrase (`404 Not Found`)
//! - Optional retries with exponential backoff (disabled by default)
//!
//! Only connecting is time limited, unless [`HttpClientConfig::with_timeout`]
//! also limits whole requests, body streaming included.
//!
//! # Examples
//!
//! ```no_run
//! use minipack::http::{HttpClient, HttpClientConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpClientConfig::new().with_timeout(Duration::from_secs(60));
//! let client = HttpClient::with_config(config)?;
//!
//! client.download(
//!     "https://github.com/o/r/archive/refs/tags/v1.0.0.tar.gz",
//!     "/tmp/download".as_ref(),
//!     None::<fn(u64, u64)>,
//! ).await?;
//! # Ok(())
//! # }
//! ```

use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

const DEFAULT_USER_AGENT: &str = concat!("minipack/", env!("CARGO_PKG_VERSION"));
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_MAX_RETRIES: u32 = 0;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Max retries exceeded for {url}")]
    MaxRetries { url: String },

    #[error("JSON deserialization error: {0}")]
    JsonParse(String),
}

impl HttpError {
    fn status(status: StatusCode, url: &str) -> Self {
        HttpError::HttpStatus {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("Unknown Status").to_string(),
            url: url.to_string(),
        }
    }

    /// The HTTP status code, if the server answered
    pub fn status_code(&self) -> Option<u16> {
        match self {
            HttpError::HttpStatus { status, .. } => Some(*status),
            HttpError::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub struct HttpClient {
    client: Client,
    user_agent: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .user_agent(&config.user_agent);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build()?;

        Ok(Self {
            client,
            user_agent: config.user_agent,
            max_retries: config.max_retries,
            retry_delay: config.retry_delay,
        })
    }

    /// Perform a GET request, retrying server errors if configured to
    pub async fn get(&self, url: &str) -> Result<Response, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            log::debug!("HTTP GET {} (attempt {})", url, attempt + 1);

            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                        last_error = Some(HttpError::status(status, url));
                    } else {
                        // Client errors never succeed on retry
                        return Err(HttpError::status(status, url));
                    }
                }
                Err(e) => {
                    last_error = Some(HttpError::Request(e));
                }
            }

            if attempt < self.max_retries {
                let delay = self.retry_delay * 2_u32.pow(attempt);
                tokio::time::sleep(delay).await;
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Err(HttpError::MaxRetries {
                url: url.to_string(),
            }),
        }
    }

    /// GET JSON and deserialize
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, HttpError> {
        let response = self.get(url).await?;
        let text = response.text().await?;

        serde_json::from_str(&text).map_err(|e| HttpError::JsonParse(e.to_string()))
    }

    /// Stream a response body into `dest`, calling `progress(downloaded, total)`
    /// after every chunk. `total` is 0 when the server sent no length.
    pub async fn download<F>(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<F>,
    ) -> Result<(), HttpError>
    where
        F: Fn(u64, u64),
    {
        let response = self.get(url).await?;
        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = File::create(dest).await?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref callback) = progress {
                callback(downloaded, total_size);
            }
        }

        file.flush().await?;
        log::debug!("Downloaded {} bytes from {}", downloaded, url);

        Ok(())
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Limit for a whole request including its body; unlimited when `None`
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}
