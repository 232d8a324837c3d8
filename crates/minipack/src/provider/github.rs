//! Tagged GitHub releases.
//!
//! A release is the source tarball GitHub generates for a tag. Its contents
//! always sit in a single `<repo>-<tag>/` directory, so the resolved
//! dependency is flattened, and the tag doubles as cache key.

use regex::Regex;
use std::sync::OnceLock;

use crate::{MinipackError, Result};

use super::Dependency;

pub const GITHUB_BASE_URL: &str = "https://github.com";

fn repo_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap())
}

/// A tagged release of a GitHub repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubOptions {
    /// `owner/name`
    pub repo: String,
    pub tag: String,
    pub use_patterns: Option<Vec<String>>,
}

impl GitHubOptions {
    pub fn new(repo: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            tag: tag.into(),
            use_patterns: None,
        }
    }

    pub fn with_use<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.use_patterns = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

/// Turns [`GitHubOptions`] into a tarball [`Dependency`]
#[derive(Debug, Clone)]
pub struct GitHubResolver {
    base_url: String,
}

impl Default for GitHubResolver {
    fn default() -> Self {
        Self::new(GITHUB_BASE_URL)
    }
}

impl GitHubResolver {
    /// Resolver for a GitHub compatible host (GitHub Enterprise, a mirror)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of the tarball GitHub serves for `tag`
    pub fn archive_url(&self, repo: &str, tag: &str) -> String {
        format!(
            "{}/{}/archive/refs/tags/{}.tar.gz",
            self.base_url,
            repo,
            urlencoding::encode(tag)
        )
    }

    pub fn resolve(&self, options: &GitHubOptions) -> Result<Dependency> {
        let repo_segments: Vec<&str> = options.repo.split('/').collect();
        if !repo_regex().is_match(&options.repo)
            || repo_segments.iter().any(|s| *s == "." || *s == "..")
        {
            return Err(MinipackError::InvalidDependency(format!(
                "repository \"{}\" must have the form owner/name",
                options.repo
            )));
        }
        if options.tag.is_empty() {
            return Err(MinipackError::InvalidDependency(format!(
                "missing tag for {}",
                options.repo
            )));
        }

        let url = self.archive_url(&options.repo, &options.tag);
        log::debug!("Resolved {}@{} to {}", options.repo, options.tag, url);

        let dependency = Dependency::new(options.repo.clone(), url)
            .with_flatten(true)
            .with_key(options.tag.clone())
            .with_optional_use(options.use_patterns.clone());
        dependency.validate()?;

        Ok(dependency)
    }
}
