//! Filesystem and naming helpers shared by the orchestrator and providers.

use std::fs;
use std::io;
use std::path::Path;

/// Display name of a dependency, suffixed with `@key` when it has one.
///
/// This is also the directory name of its cache entry.
///
/// ```
/// use minipack::util::keyed_name;
///
/// assert_eq!(keyed_name("vue", Some("3.4.1")), "vue@3.4.1");
/// assert_eq!(keyed_name("o/r", Some("v1.0.0")), "o/r@v1.0.0");
/// assert_eq!(keyed_name("fonts", None), "fonts");
/// ```
pub fn keyed_name(name: &str, key: Option<&str>) -> String {
    match key {
        Some(key) if !key.is_empty() => format!("{}@{}", name, key),
        _ => name.to_string(),
    }
}

/// Make sure `dir` exists and is empty.
///
/// Missing directories (and their parents) are created; existing ones have
/// every entry removed while the directory itself is kept.
pub fn empty_dir(dir: &Path) -> io::Result<()> {
    match fs::read_dir(dir) {
        Ok(entries) => {
            for entry in entries {
                let entry = entry?;
                let path = entry.path();
                if entry.file_type()?.is_dir() {
                    fs::remove_dir_all(&path)?;
                } else {
                    fs::remove_file(&path)?;
                }
            }
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(dir),
        Err(e) => Err(e),
    }
}

/// Remove a directory tree, treating an already missing directory as success.
pub fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
