//! Archive downloading and extraction.
//!
//! Archives are fetched over HTTP into a scratch directory and unpacked in
//! place, optionally dropping the wrapper directory release tarballs carry.

mod archive;
mod file;

pub use archive::{ArchiveExtractor, ArchiveType};
pub use file::FileDownloader;
