//! Glob based file selection.
//!
//! Copies the files matching a set of glob patterns from an extracted
//! archive into the dependency's output directory. Matches keep their path
//! relative to the source root, so `dist/a.js` lands at `<to>/dist/a.js`.

use std::fs;
use std::path::{Component, Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::{MinipackError, Result};

/// Pattern used when a dependency does not restrict its files
pub const MATCH_EVERYTHING: &str = "**/*";

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Copies glob matches between two directory trees
pub struct GlobCopier;

impl GlobCopier {
    /// Copy every regular file matching any of `patterns` from `from` to `to`.
    ///
    /// Patterns are applied one after another; a file matched by several
    /// patterns is simply copied again. The first filesystem error aborts
    /// the copy, files copied before it stay in place.
    ///
    /// Returns the number of copy operations performed.
    pub fn copy<S: AsRef<str>>(patterns: &[S], from: &Path, to: &Path) -> Result<usize> {
        // Matches are re-rooted by prefix, so work from the canonical root
        let from = fs::canonicalize(from).map_err(|e| MinipackError::copy(from, e))?;
        let mut copied = 0;

        for pattern in patterns {
            copied += Self::copy_pattern(pattern.as_ref(), &from, to)?;
        }

        Ok(copied)
    }

    fn copy_pattern(pattern: &str, from: &Path, to: &Path) -> Result<usize> {
        let mut copied = 0;

        for source in Self::matches(pattern, from)? {
            let relative = source
                .strip_prefix(from)
                .ok()
                .filter(|relative| {
                    relative
                        .components()
                        .all(|c| matches!(c, Component::Normal(_)))
                })
                .ok_or_else(|| {
                    MinipackError::InvalidDependency(format!(
                        "Pattern \"{}\" matched {} outside of {}",
                        pattern,
                        source.display(),
                        from.display()
                    ))
                })?;
            let target = to.join(relative);

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| MinipackError::copy(parent, e))?;
            }
            fs::copy(&source, &target).map_err(|e| MinipackError::copy(&source, e))?;

            log::trace!("Copied {} -> {}", source.display(), target.display());
            copied += 1;
        }

        Ok(copied)
    }

    /// Regular files under `root` matching `pattern`
    fn matches(pattern: &str, root: &Path) -> Result<Vec<PathBuf>> {
        check_pattern(pattern)?;
        let pattern = pattern.trim_start_matches("./");
        let rooted = format!(
            "{}/{}",
            Pattern::escape(&root.to_string_lossy()),
            pattern
        );

        let paths = glob::glob_with(&rooted, MATCH_OPTIONS).map_err(|e| {
            MinipackError::InvalidDependency(format!("Invalid glob pattern \"{}\": {}", pattern, e))
        })?;

        let mut files = Vec::new();
        for path in paths {
            let path = path.map_err(|e| {
                let failed = e.path().to_path_buf();
                MinipackError::copy(failed, std::io::Error::from(e))
            })?;
            if path.is_file() {
                files.push(path);
            }
        }

        Ok(files)
    }
}

/// Reject patterns that could match outside the directory they are applied to
pub(crate) fn check_pattern(pattern: &str) -> Result<()> {
    let escapes = Path::new(pattern).components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(MinipackError::InvalidDependency(format!(
            "Pattern \"{}\" must be relative and must not contain '..'",
            pattern
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, file.as_bytes()).unwrap();
        }
    }

    #[test]
    fn test_copy_preserves_relative_structure() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        let to = temp.path().join("out");
        tree(&from, &["dist/a.js", "dist/b.css", "src/a.ts"]);

        GlobCopier::copy(&["dist/*"], &from, &to).unwrap();

        assert_eq!(fs::read_to_string(to.join("dist/a.js")).unwrap(), "dist/a.js");
        assert!(to.join("dist/b.css").is_file());
        assert!(!to.join("src").exists());
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        let to = temp.path().join("out");
        tree(&from, &["LICENSE", "LICENSE-MIT.txt", "docs/LICENSE"]);

        GlobCopier::copy(&["*LICENSE*"], &from, &to).unwrap();

        assert!(to.join("LICENSE").is_file());
        assert!(to.join("LICENSE-MIT.txt").is_file());
        assert!(!to.join("docs").exists());
    }

    #[test]
    fn test_match_everything_copies_files_not_directories() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        let to = temp.path().join("out");
        tree(&from, &["a.txt", "nested/deep/b.txt", ".hidden"]);
        fs::create_dir_all(from.join("empty")).unwrap();

        GlobCopier::copy(&[MATCH_EVERYTHING], &from, &to).unwrap();

        assert!(to.join("a.txt").is_file());
        assert!(to.join("nested/deep/b.txt").is_file());
        assert!(to.join(".hidden").is_file());
        assert!(!to.join("empty").exists());
    }

    #[test]
    fn test_overlapping_patterns_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        let to = temp.path().join("out");
        tree(&from, &["dist/vue.esm-browser.js"]);

        let copied = GlobCopier::copy(&["dist/*", "dist/vue.esm-browser.*"], &from, &to).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            fs::read_to_string(to.join("dist/vue.esm-browser.js")).unwrap(),
            "dist/vue.esm-browser.js"
        );
    }

    #[test]
    fn test_no_matches_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        fs::create_dir_all(&from).unwrap();

        let copied = GlobCopier::copy(&["dist/*"], &from, &temp.path().join("out")).unwrap();
        assert_eq!(copied, 0);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let temp = TempDir::new().unwrap();
        let err = GlobCopier::copy(&["dist/[*"], temp.path(), temp.path()).unwrap_err();
        assert!(matches!(err, MinipackError::InvalidDependency(_)));
    }

    #[test]
    fn test_patterns_cannot_leave_the_source_root() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        let to = temp.path().join("vendor/lib");
        tree(&from, &["dist/a.js"]);
        tree(temp.path(), &["secret.txt"]);

        for pattern in ["../*", "dist/../../*", "/*"] {
            let err = GlobCopier::copy(&[pattern], &from, &to).unwrap_err();
            assert!(
                matches!(err, MinipackError::InvalidDependency(_)),
                "{pattern} should be rejected"
            );
        }
        assert!(!temp.path().join("vendor").exists());
    }

    #[test]
    fn test_unwritable_target_is_copy_error() {
        let temp = TempDir::new().unwrap();
        let from = temp.path().join("extracted");
        tree(&from, &["dist/a.js"]);
        // A file where the target directory should go
        let to = temp.path().join("out");
        fs::write(&to, "not a directory").unwrap();

        let err = GlobCopier::copy(&["dist/*"], &from, &to).unwrap_err();
        assert!(matches!(err, MinipackError::Copy { .. }));
    }
}
