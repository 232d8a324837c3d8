use serde::Deserialize;
use std::path::PathBuf;

/// Represents the source of a configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConfigSource {
    /// Default built-in value
    Default,
    /// Passed when the orchestrator was constructed (API call or manifest)
    Construction,
    /// From the command line flag layer
    Flags,
}

impl ConfigSource {
    pub fn as_str(&self) -> &str {
        match self {
            ConfigSource::Default => "default",
            ConfigSource::Construction => "construction",
            ConfigSource::Flags => "flags",
        }
    }
}

/// A partial run configuration; unset fields defer to lower layers.
///
/// Field names match the flags (`out-dir`, `temp-dir`, `reload`), which is
/// also how the manifest spells them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub out_dir: Option<PathBuf>,

    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    #[serde(default)]
    pub reload: Option<bool>,
}

impl ConfigLayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_out_dir(mut self, out_dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(out_dir.into());
        self
    }

    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(temp_dir.into());
        self
    }

    pub fn with_reload(mut self, reload: bool) -> Self {
        self.reload = Some(reload);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.out_dir.is_none() && self.temp_dir.is_none() && self.reload.is_none()
    }
}
