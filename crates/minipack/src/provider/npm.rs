//! npm packages.
//!
//! Resolution happens when the task is added, so an identifier that matches
//! nothing fails right away instead of in the middle of a run.

use crate::registry::PackageRegistry;
use crate::{MinipackError, Result};

use super::Dependency;

/// A package identifier (`vue`, `vue@3.4`, `@scope/pkg@^1`) and the files to keep
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmOptions {
    pub package: String,
    pub use_patterns: Option<Vec<String>>,
}

impl NpmOptions {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
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

/// Resolve `options` to the tarball of the highest matching version
pub async fn resolve(registry: &dyn PackageRegistry, options: &NpmOptions) -> Result<Dependency> {
    let response = registry.query(&options.package).await?;
    let candidates = response.len();

    let record = response
        .select()
        .ok_or_else(|| MinipackError::Resolution {
            identifier: options.package.clone(),
            reason: "no matching version".to_string(),
        })?;

    log::debug!(
        "Resolved {} to {}@{} out of {} candidate(s)",
        options.package,
        record.name,
        record.version,
        candidates
    );

    // npm tarballs wrap everything in `package/`
    let dependency = Dependency::new(record.name, record.tarball_url)
        .with_flatten(true)
        .with_key(record.version)
        .with_optional_use(options.use_patterns.clone());
    dependency.validate()?;

    Ok(dependency)
}
