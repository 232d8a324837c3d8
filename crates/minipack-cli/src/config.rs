use anyhow::{Context, Result};
use minipack::{ConfigLayer, Dependency, GitHubOptions, NpmOptions};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "minipack.toml";

/// The manifest file structure (minipack.toml)
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MinipackManifest {
    /// Run options, overridden by command line flags
    pub options: ConfigLayer,

    /// Alternative hosts (mirrors, private registries)
    pub sources: SourcesConfig,

    /// Dependencies, vendored in this order
    pub dependency: Vec<DependencySpec>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourcesConfig {
    /// npm registry base URL
    pub npm: Option<String>,

    /// Base URL of a GitHub compatible host
    pub github: Option<String>,
}

/// One `[[dependency]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DependencySpec {
    Github {
        repo: String,
        tag: String,
        #[serde(rename = "use")]
        use_patterns: Option<Vec<String>>,
    },
    Npm {
        package: String,
        #[serde(rename = "use")]
        use_patterns: Option<Vec<String>>,
    },
    Tar {
        name: String,
        url: String,
        #[serde(default)]
        flatten: bool,
        key: Option<String>,
        #[serde(rename = "use")]
        use_patterns: Option<Vec<String>>,
    },
}

/// What a manifest entry queues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    GitHub(GitHubOptions),
    Npm(NpmOptions),
    Tar(Dependency),
}

impl DependencySpec {
    pub fn into_task(self) -> Task {
        match self {
            DependencySpec::Github {
                repo,
                tag,
                use_patterns,
            } => Task::GitHub(GitHubOptions {
                repo,
                tag,
                use_patterns,
            }),
            DependencySpec::Npm {
                package,
                use_patterns,
            } => Task::Npm(NpmOptions {
                package,
                use_patterns,
            }),
            DependencySpec::Tar {
                name,
                url,
                flatten,
                key,
                use_patterns,
            } => {
                let mut dependency = Dependency::new(name, url)
                    .with_flatten(flatten)
                    .with_optional_use(use_patterns);
                if let Some(key) = key {
                    dependency = dependency.with_key(key);
                }
                Task::Tar(dependency)
            }
        }
    }
}

impl MinipackManifest {
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load a manifest file
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Find minipack.toml, searching upward from the given directory
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut current = start_dir.to_path_buf();

        loop {
            let manifest_path = current.join(MANIFEST_FILE);
            if manifest_path.is_file() {
                return Some(manifest_path);
            }

            if !current.pop() {
                return None;
            }
        }
    }
}
