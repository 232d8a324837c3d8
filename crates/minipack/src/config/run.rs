use std::path::{Path, PathBuf};

use super::source::{ConfigLayer, ConfigSource};

/// Default output directory
pub const DEFAULT_OUT_DIR: &str = "./vendor";

/// Fully resolved configuration of a vendoring run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Root of the cache entries (`<out_dir>/<name>@<key>`)
    pub out_dir: PathBuf,
    /// Scratch root; generated when `None`
    pub temp_dir: Option<PathBuf>,
    /// Empty `out_dir` before running, discarding every cache entry
    pub reload: bool,
    sources: FieldSources,
}

/// Which layer supplied each field of a [`RunConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSources {
    pub out_dir: ConfigSource,
    pub temp_dir: ConfigSource,
    pub reload: ConfigSource,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            temp_dir: None,
            reload: false,
            sources: FieldSources {
                out_dir: ConfigSource::Default,
                temp_dir: ConfigSource::Default,
                reload: ConfigSource::Default,
            },
        }
    }
}

impl RunConfig {
    /// Configuration with construction-time values on top of the defaults
    pub fn with_options(options: ConfigLayer) -> Self {
        LayeredConfig::new()
            .with_layer(ConfigSource::Construction, options)
            .resolve()
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn temp_dir(&self) -> Option<&Path> {
        self.temp_dir.as_deref()
    }

    pub fn sources(&self) -> FieldSources {
        self.sources
    }
}

/// Configuration layers, merged field by field.
///
/// For every field the value from the highest [`ConfigSource`] that sets it
/// wins: `Default < Construction < Flags`. Adding two layers with the same
/// source lets the later one win.
#[derive(Debug, Clone, Default)]
pub struct LayeredConfig {
    layers: Vec<(ConfigSource, ConfigLayer)>,
}

impl LayeredConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, source: ConfigSource, layer: ConfigLayer) -> Self {
        self.add_layer(source, layer);
        self
    }

    pub fn add_layer(&mut self, source: ConfigSource, layer: ConfigLayer) {
        self.layers.push((source, layer));
        // Stable sort keeps insertion order within a source
        self.layers.sort_by_key(|(source, _)| *source);
    }

    pub fn resolve(&self) -> RunConfig {
        let mut config = RunConfig::default();

        for (source, layer) in &self.layers {
            if let Some(out_dir) = &layer.out_dir {
                config.out_dir = out_dir.clone();
                config.sources.out_dir = *source;
            }
            if let Some(temp_dir) = &layer.temp_dir {
                config.temp_dir = Some(temp_dir.clone());
                config.sources.temp_dir = *source;
            }
            if let Some(reload) = layer.reload {
                config.reload = reload;
                config.sources.reload = *source;
            }
        }

        log::debug!(
            "Resolved config: out-dir={} ({}), temp-dir={} ({}), reload={} ({})",
            config.out_dir.display(),
            config.sources.out_dir.as_str(),
            config
                .temp_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<generated>".to_string()),
            config.sources.temp_dir.as_str(),
            config.reload,
            config.sources.reload.as_str(),
        );

        config
    }
}
