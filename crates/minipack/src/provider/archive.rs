//! Generic tarball provider.

use std::sync::Arc;

use async_trait::async_trait;

use crate::copier::GlobCopier;
use crate::downloader::{ArchiveExtractor, FileDownloader};
use crate::http::HttpClient;
use crate::Result;

use super::{Dependency, ExecContext, Provider};

/// Name of the downloaded archive inside the task's scratch directory
const DOWNLOAD_FILE_NAME: &str = "download";

/// Downloads a tarball, unpacks it and copies the selected files
pub struct ArchiveProvider {
    dependency: Dependency,
    downloader: FileDownloader,
}

impl ArchiveProvider {
    pub fn new(dependency: Dependency, http_client: Arc<HttpClient>) -> Result<Self> {
        dependency.validate()?;

        Ok(Self {
            dependency,
            downloader: FileDownloader::new(http_client),
        })
    }

    pub fn dependency(&self) -> &Dependency {
        &self.dependency
    }
}

#[async_trait]
impl Provider for ArchiveProvider {
    fn name(&self) -> &str {
        &self.dependency.name
    }

    fn key(&self) -> Option<&str> {
        self.dependency.key.as_deref()
    }

    async fn exec(&self, context: &ExecContext<'_>) -> Result<()> {
        let dep = &self.dependency;
        let reporter = context.reporter;
        let archive = context.temp_dir.join(DOWNLOAD_FILE_NAME);

        reporter.progress(&format!("Downloading {}...", dep.name));
        log::debug!("Downloading {} from {}", dep.display_name(), dep.url);
        self.downloader
            .download(&dep.url, &archive, None::<fn(u64, u64)>)
            .await?;

        reporter.progress("Unpacking...");
        ArchiveExtractor::extract(&archive, &context.temp_dir, dep.flatten)?;

        reporter.progress("Cleaning up download...");
        tokio::fs::remove_file(&archive).await?;

        reporter.progress("Copying...");
        let copied = GlobCopier::copy(&dep.use_patterns, &context.temp_dir, &context.out_dir)?;
        log::debug!(
            "Copied {} files of {} into {}",
            copied,
            dep.display_name(),
            context.out_dir.display()
        );

        reporter.success(&dep.display_name());
        Ok(())
    }
}
