//! npm registry client.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::http::HttpClient;
use crate::{MinipackError, Result};

use super::range::VersionRange;
use super::{PackageRecord, PackageRegistry, RegistryResponse};

pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

const LATEST_TAG: &str = "latest";

/// A parsed package identifier: `name`, `name@range`, `@scope/name@range`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    pub name: String,
    pub range: Option<String>,
}

impl PackageSpec {
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();

        // A leading `@` belongs to the scope, the range follows the last `@`
        let (name, range) = match identifier.rfind('@') {
            Some(idx) if idx > 0 => (&identifier[..idx], Some(&identifier[idx + 1..])),
            _ => (identifier, None),
        };

        let valid = if let Some(scoped) = name.strip_prefix('@') {
            matches!(scoped.split_once('/'), Some((scope, pkg)) if !scope.is_empty() && !pkg.is_empty() && !pkg.contains('/'))
        } else {
            !name.is_empty() && !name.contains('/')
        };
        if !valid {
            return Err(MinipackError::InvalidDependency(format!(
                "\"{}\" is not a valid npm package identifier",
                identifier
            )));
        }

        Ok(Self {
            name: name.to_string(),
            range: range.map(str::trim).filter(|r| !r.is_empty()).map(str::to_string),
        })
    }

    /// Path segment of the package document (`@scope%2Fname` for scoped packages)
    pub fn document_path(&self) -> String {
        match self.name.strip_prefix('@').and_then(|s| s.split_once('/')) {
            Some((scope, pkg)) => format!(
                "@{}%2F{}",
                urlencoding::encode(scope),
                urlencoding::encode(pkg)
            ),
            None => urlencoding::encode(&self.name).into_owned(),
        }
    }
}

/// The package document (packument) served at `<registry>/<name>`
#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: HashMap<String, VersionDocument>,
}

#[derive(Debug, Deserialize)]
struct VersionDocument {
    name: String,
    version: String,
    dist: Dist,
}

#[derive(Debug, Deserialize)]
struct Dist {
    tarball: String,
}

impl From<&VersionDocument> for PackageRecord {
    fn from(doc: &VersionDocument) -> Self {
        PackageRecord {
            name: doc.name.clone(),
            version: doc.version.clone(),
            tarball_url: doc.dist.tarball.clone(),
        }
    }
}

/// Registry client speaking the npm registry HTTP API
pub struct NpmRegistry {
    http_client: Arc<HttpClient>,
    base_url: String,
}

impl NpmRegistry {
    pub fn new(http_client: Arc<HttpClient>) -> Self {
        Self::with_registry_url(http_client, NPM_REGISTRY_URL)
    }

    pub fn with_registry_url(http_client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_packument(&self, spec: &PackageSpec, identifier: &str) -> Result<Packument> {
        let url = format!("{}/{}", self.base_url, spec.document_path());

        self.http_client
            .get_json(&url)
            .await
            .map_err(|e| MinipackError::Resolution {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl PackageRegistry for NpmRegistry {
    async fn query(&self, identifier: &str) -> Result<RegistryResponse> {
        let spec = PackageSpec::parse(identifier)?;
        let packument = self.fetch_packument(&spec, identifier).await?;

        let tag = match spec.range.as_deref() {
            None => Some(LATEST_TAG),
            Some(range) if packument.dist_tags.contains_key(range) => Some(range),
            Some(_) => None,
        };

        if let Some(tag) = tag {
            let record = packument
                .dist_tags
                .get(tag)
                .and_then(|version| packument.versions.get(version))
                .map(PackageRecord::from);

            log::debug!("{} resolved through dist-tag \"{}\": {:?}", identifier, tag, record);
            return Ok(match record {
                Some(record) => RegistryResponse::Single(record),
                None => RegistryResponse::Many(Vec::new()),
            });
        }

        let range = VersionRange::parse(spec.range.as_deref().unwrap_or_default())?;
        let candidates: Vec<PackageRecord> = packument
            .versions
            .values()
            .filter(|doc| range.matches_str(&doc.version))
            .map(PackageRecord::from)
            .collect();

        log::debug!("{} matched {} published versions", identifier, candidates.len());
        Ok(RegistryResponse::Many(candidates))
    }
}
