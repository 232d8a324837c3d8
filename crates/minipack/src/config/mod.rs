//! Run configuration
//!
//! A run is configured by three fields (`out_dir`, `temp_dir`, `reload`)
//! merged from several layers, resolved once before a run starts.
//!
//! # Configuration Sources (in priority order, highest to lowest)
//!
//! 1. Flags (command line, matched to fields by name)
//! 2. Construction (values passed to [`crate::Minipack::new`], e.g. from `minipack.toml`)
//! 3. Built-in defaults (`./vendor`, generated scratch directory, no reload)
//!
//! # Example
//!
//! ```rust
//! use minipack::config::{ConfigLayer, ConfigSource, LayeredConfig};
//!
//! let config = LayeredConfig::new()
//!     .with_layer(ConfigSource::Construction, ConfigLayer::new().with_temp_dir("./.temp"))
//!     .with_layer(ConfigSource::Flags, ConfigLayer::new().with_reload(true))
//!     .resolve();
//!
//! assert!(config.reload);
//! assert_eq!(config.out_dir.to_str(), Some("./vendor"));
//! ```

mod run;
mod source;

pub use run::{FieldSources, LayeredConfig, RunConfig, DEFAULT_OUT_DIR};
pub use source::{ConfigLayer, ConfigSource};
