//! Dependency providers.
//!
//! Every dependency is materialized by one generic operation, the
//! [`ArchiveProvider`]: download a tarball, unpack it, copy the selected
//! files. Tagged GitHub releases and npm packages are resolvers that only
//! work out *which* tarball to fetch and produce a [`Dependency`] for it.

mod archive;
pub mod github;
pub mod npm;

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::copier::{check_pattern, MATCH_EVERYTHING};
use crate::report::Reporter;
use crate::util::keyed_name;
use crate::{MinipackError, Result};

pub use archive::ArchiveProvider;
pub use github::{GitHubOptions, GitHubResolver};
pub use npm::NpmOptions;

/// Directories a provider works in for a single run of a single task
pub struct ExecContext<'a> {
    /// Scratch directory of this task, empty when `exec` starts
    pub temp_dir: PathBuf,
    /// Output directory of this task (`<out_dir>/<name>[@<key>]`), empty when `exec` starts
    pub out_dir: PathBuf,
    pub reporter: &'a dyn Reporter,
}

/// A unit of work that obtains and materializes one dependency
#[async_trait]
pub trait Provider: Send + Sync {
    /// Unique name within a task list; also the cache directory name
    fn name(&self) -> &str;

    /// Version or tag; `None` means the dependency is fetched on every run
    fn key(&self) -> Option<&str>;

    /// `name@key`, or just `name`
    fn display_name(&self) -> String {
        keyed_name(self.name(), self.key())
    }

    async fn exec(&self, context: &ExecContext<'_>) -> Result<()>;
}

/// A fully resolved dependency: which archive to fetch and what to keep of it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: String,
    pub url: String,
    /// Drop the single wrapper directory of the archive
    pub flatten: bool,
    pub key: Option<String>,
    /// Glob patterns, relative to the extracted archive root
    pub use_patterns: Vec<String>,
}

impl Dependency {
    /// A dependency that keeps every file and is never cached
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            flatten: false,
            key: None,
            use_patterns: vec![MATCH_EVERYTHING.to_string()],
        }
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        self.flatten = flatten;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Replace the selected files. An empty list selects nothing.
    pub fn with_use<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.use_patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Like [`Dependency::with_use`], keeping the default when `None`
    pub fn with_optional_use(self, patterns: Option<Vec<String>>) -> Self {
        match patterns {
            Some(patterns) => self.with_use(patterns),
            None => self,
        }
    }

    pub fn display_name(&self) -> String {
        keyed_name(&self.name, self.key.as_deref())
    }

    /// Check that name and key are usable as directory names and the URL is fetchable
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(MinipackError::InvalidDependency(
                "dependency name must not be empty".to_string(),
            ));
        }

        let name_path = Path::new(&self.name);
        if !name_path
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(MinipackError::InvalidDependency(format!(
                "\"{}\" is not a relative path without '..' components",
                self.name
            )));
        }

        if let Some(key) = &self.key {
            if key.is_empty() || key == ".." || key.contains(['/', '\\']) {
                return Err(MinipackError::InvalidDependency(format!(
                    "key \"{}\" of {} cannot be used in a directory name",
                    key, self.name
                )));
            }
        }

        for pattern in &self.use_patterns {
            check_pattern(pattern)?;
        }

        let url = url::Url::parse(&self.url).map_err(|e| {
            MinipackError::InvalidDependency(format!("invalid URL \"{}\" for {}: {}", self.url, self.name, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(MinipackError::InvalidDependency(format!(
                "unsupported URL scheme \"{}\" for {}",
                url.scheme(),
                self.name
            )));
        }

        Ok(())
    }
}
