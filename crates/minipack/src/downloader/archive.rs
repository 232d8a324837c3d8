//! Archive extraction (tar, tar.gz).

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::{MinipackError, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Supported archive types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveType {
    Tar,
    TarGz,
}

impl ArchiveType {
    /// Detect the archive type from the first bytes of the file.
    ///
    /// Downloads are stored without an extension, so the content decides.
    pub fn sniff(archive_path: &Path) -> Result<Self> {
        let file = File::open(archive_path).map_err(failed("open", archive_path))?;
        let mut reader = BufReader::new(file);
        let head = reader.fill_buf().map_err(failed("read", archive_path))?;

        if head.starts_with(&GZIP_MAGIC) {
            Ok(ArchiveType::TarGz)
        } else {
            Ok(ArchiveType::Tar)
        }
    }
}

/// Archive extractor
pub struct ArchiveExtractor;

impl ArchiveExtractor {
    /// Extract an archive into `dest_dir`.
    ///
    /// With `flatten` set, the leading path component of every entry is
    /// dropped, so a `repo-1.0.0/` or `package/` wrapper disappears.
    pub fn extract(archive_path: &Path, dest_dir: &Path, flatten: bool) -> Result<()> {
        let archive_type = ArchiveType::sniff(archive_path)?;
        let strip_components = usize::from(flatten);

        log::debug!(
            "Extracting {} ({:?}) into {} (strip {})",
            archive_path.display(),
            archive_type,
            dest_dir.display(),
            strip_components
        );

        std::fs::create_dir_all(dest_dir).map_err(failed("create", dest_dir))?;

        let file = File::open(archive_path).map_err(failed("open", archive_path))?;
        let reader = BufReader::new(file);

        match archive_type {
            ArchiveType::Tar => Self::extract_tar_with_strip(reader, dest_dir, strip_components),
            ArchiveType::TarGz => {
                Self::extract_tar_with_strip(GzDecoder::new(reader), dest_dir, strip_components)
            }
        }
    }

    /// Extract a tar stream, dropping `strip_components` leading path components
    pub fn extract_tar_with_strip<R: Read>(
        reader: R,
        dest_dir: &Path,
        strip_components: usize,
    ) -> Result<()> {
        let mut archive = tar::Archive::new(reader);

        let dest_dir_canonical = dest_dir.canonicalize().map_err(|e| {
            MinipackError::Extraction(format!("Failed to canonicalize destination: {}", e))
        })?;

        let entries = archive
            .entries()
            .map_err(|e| MinipackError::Extraction(format!("Failed to read tar: {}", e)))?;

        for entry in entries {
            let mut entry = entry
                .map_err(|e| MinipackError::Extraction(format!("Failed to read tar entry: {}", e)))?;

            let path = entry
                .path()
                .map_err(|e| MinipackError::Extraction(format!("Invalid path in tar: {}", e)))?
                .into_owned();

            let components: Vec<_> = path
                .components()
                .filter(|c| !matches!(c, Component::CurDir))
                .collect();
            if components.len() <= strip_components {
                continue;
            }

            if components[strip_components..]
                .iter()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Err(MinipackError::Extraction(format!(
                    "Path traversal detected in archive: {}",
                    path.display()
                )));
            }

            let stripped: PathBuf = components[strip_components..].iter().collect();
            let outpath = dest_dir.join(&stripped);

            if entry.header().entry_type().is_dir() {
                std::fs::create_dir_all(&outpath).map_err(failed("create", &stripped))?;
                continue;
            }

            if let Some(parent) = outpath.parent() {
                std::fs::create_dir_all(parent).map_err(failed("create parent of", &stripped))?;
                // Symlinked directories created by earlier entries may point elsewhere
                let parent_canonical = parent
                    .canonicalize()
                    .map_err(failed("resolve parent of", &stripped))?;
                if !parent_canonical.starts_with(&dest_dir_canonical) {
                    return Err(MinipackError::Extraction(format!(
                        "Path traversal detected: {} escapes destination directory",
                        stripped.display()
                    )));
                }
            }

            entry.unpack(&outpath).map_err(|e| {
                MinipackError::Extraction(format!("Failed to extract {}: {}", stripped.display(), e))
            })?;
        }

        Ok(())
    }
}

fn failed<'a>(
    action: &'a str,
    path: &'a Path,
) -> impl FnOnce(std::io::Error) -> MinipackError + 'a {
    move |e| MinipackError::Extraction(format!("Failed to {} {}: {}", action, path.display(), e))
}
