//! Scratch root of a vendoring run.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::util::{empty_dir, remove_dir_if_exists};
use crate::Result;

const GENERATED_PREFIX: &str = "minipack-vendor-deps-";

/// The top-level scratch directory, removed again when the run ends.
///
/// A generated directory is owned by a [`TempDir`]; a configured one is
/// emptied on creation. Either way the directory is gone after [`remove`]
/// or, if that was never reached, after drop.
///
/// [`remove`]: ScratchRoot::remove
#[derive(Debug)]
pub struct ScratchRoot {
    path: PathBuf,
    generated: Option<TempDir>,
    removed: bool,
}

impl ScratchRoot {
    /// Create a fresh directory, or empty the configured one
    pub fn create(configured: Option<&Path>) -> Result<Self> {
        match configured {
            Some(dir) => {
                empty_dir(dir)?;
                Ok(Self {
                    path: dir.to_path_buf(),
                    generated: None,
                    removed: false,
                })
            }
            None => {
                let dir = tempfile::Builder::new().prefix(GENERATED_PREFIX).tempdir()?;
                Ok(Self {
                    path: dir.path().to_path_buf(),
                    generated: Some(dir),
                    removed: false,
                })
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_generated(&self) -> bool {
        self.generated.is_some()
    }

    /// Remove the directory tree, reporting failures
    pub fn remove(mut self) -> Result<()> {
        self.removed = true;
        match self.generated.take() {
            Some(dir) => dir.close()?,
            None => remove_dir_if_exists(&self.path)?,
        }
        Ok(())
    }
}

impl Drop for ScratchRoot {
    fn drop(&mut self) {
        // TempDir cleans up after itself
        if !self.removed && self.generated.is_none() {
            if let Err(e) = remove_dir_if_exists(&self.path) {
                log::warn!("Failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}
