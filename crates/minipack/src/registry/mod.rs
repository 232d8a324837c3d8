//! Package registry queries.
//!
//! A registry answers a package identifier (`vue`, `vue@3.4`) with package
//! records, either a single one or every candidate matching a range. The
//! highest semantic version among the candidates wins.

mod npm;
mod range;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use npm::{NpmRegistry, PackageSpec, NPM_REGISTRY_URL};
pub use range::VersionRange;

/// One published version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub version: String,
    #[serde(rename = "tarball", alias = "dist.tarball")]
    pub tarball_url: String,
}

/// Registry answer: a single record or a collection of candidates
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RegistryResponse {
    Single(PackageRecord),
    Many(Vec<PackageRecord>),
}

impl RegistryResponse {
    /// The record to use: the single one, or the highest version of many
    pub fn select(self) -> Option<PackageRecord> {
        match self {
            RegistryResponse::Single(record) => Some(record),
            RegistryResponse::Many(records) => select_highest(records),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RegistryResponse::Single(_) => 1,
            RegistryResponse::Many(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pick the record with the highest semantic version.
///
/// Records whose version does not parse rank below every valid version.
pub fn select_highest(records: Vec<PackageRecord>) -> Option<PackageRecord> {
    records
        .into_iter()
        .max_by_key(|record| semver::Version::parse(record.version.trim_start_matches('v')).ok())
}

/// Source of package records
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Look up `identifier` (`name` or `name@range`)
    async fn query(&self, identifier: &str) -> Result<RegistryResponse>;
}
