//! File downloader for HTTP/HTTPS archives.

use std::path::Path;
use std::sync::Arc;

use crate::http::HttpClient;
use crate::{MinipackError, Result};

/// File downloader for HTTP archives
pub struct FileDownloader {
    http_client: Arc<HttpClient>,
}

impl FileDownloader {
    /// Create a new file downloader
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self { http_client }
    }

    /// Download a file to the specified path
    pub async fn download<F>(&self, url: &str, dest: &Path, progress: Option<F>) -> Result<()>
    where
        F: Fn(u64, u64),
    {
        self.http_client
            .download(url, dest, progress)
            .await
            .map_err(|e| MinipackError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_download_failure_maps_to_download_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let downloader = FileDownloader::new(Arc::new(HttpClient::new().unwrap()));
        let temp_dir = TempDir::new().unwrap();
        let url = format!("{}/missing.tar.gz", server.uri());

        let err = downloader
            .download(&url, &temp_dir.path().join("download"), None::<fn(u64, u64)>)
            .await
            .unwrap_err();

        match err {
            MinipackError::Download { url: failed, reason } => {
                assert_eq!(failed, url);
                assert!(reason.contains("404 Not Found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
