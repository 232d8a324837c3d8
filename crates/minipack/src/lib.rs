pub mod config;
pub mod copier;
pub mod downloader;
pub mod error;
pub mod http;
pub mod provider;
pub mod registry;
pub mod report;
pub mod scratch;
pub mod util;
pub mod vendor;

pub use config::{ConfigLayer, ConfigSource, LayeredConfig, RunConfig};
pub use copier::GlobCopier;
pub use downloader::{ArchiveExtractor, FileDownloader};
pub use error::{MinipackError, Result};
pub use http::{HttpClient, HttpClientConfig, HttpError};
pub use provider::{
    ArchiveProvider, Dependency, ExecContext, GitHubOptions, GitHubResolver, NpmOptions, Provider,
};
pub use registry::{NpmRegistry, PackageRecord, PackageRegistry, RegistryResponse, VersionRange};
pub use report::{ConsoleReporter, Reporter, Verbosity};
pub use vendor::{Minipack, PackOutcome, PackState, PackSummary};
