mod config;

use config::{MinipackManifest, Task};

use anyhow::{Context, Result};
use clap::Parser;
use minipack::config::ConfigLayer;
use minipack::{ConfigSource, ConsoleReporter, LayeredConfig, Minipack, Reporter, Verbosity};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "minipack")]
#[command(about = "Vendor third-party build assets from tarballs, GitHub releases and npm")]
#[command(version)]
struct Args {
    /// Manifest file (default: minipack.toml, searched upward from the working directory)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Scratch directory, emptied before and removed after the run
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,

    /// Discard every cached dependency and fetch all of them again
    #[arg(long)]
    reload: bool,

    /// Print debug output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else if self.verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// The flag layer; `--reload` only counts when given
    fn flag_layer(&self) -> ConfigLayer {
        ConfigLayer {
            out_dir: self.out_dir.clone(),
            temp_dir: self.temp_dir.clone(),
            reload: self.reload.then_some(true),
        }
    }
}

fn init_logger(verbosity: Verbosity) {
    let default_filter = match verbosity {
        Verbosity::Verbose => "debug",
        Verbosity::Normal => "warn",
        Verbosity::Quiet => "error",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

/// Make relative manifest paths relative to the manifest's directory
fn anchor_options(mut options: ConfigLayer, manifest_dir: &Path) -> ConfigLayer {
    let anchor = |path: PathBuf| {
        if path.is_relative() {
            manifest_dir.join(path)
        } else {
            path
        }
    };
    options.out_dir = options.out_dir.map(anchor);
    options.temp_dir = options.temp_dir.map(anchor);
    options
}

fn load_manifest(args: &Args) -> Result<MinipackManifest> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => {
            let cwd = std::env::current_dir().context("Failed to read the working directory")?;
            match MinipackManifest::find(&cwd) {
                Some(path) => path,
                None => {
                    log::debug!("No {} found", config::MANIFEST_FILE);
                    return Ok(MinipackManifest::default());
                }
            }
        }
    };

    log::debug!("Reading {}", path.display());
    let mut manifest = MinipackManifest::load_file(&path)?;
    if let Some(dir) = path.parent() {
        manifest.options = anchor_options(manifest.options, dir);
    }
    Ok(manifest)
}

/// Returns false when the run failed; the reporter has shown the error
async fn vendor(args: Args, manifest: MinipackManifest) -> Result<bool> {
    let reporter: Arc<dyn Reporter> = Arc::new(ConsoleReporter::new(args.verbosity()));

    let config = LayeredConfig::new()
        .with_layer(ConfigSource::Construction, manifest.options)
        .with_layer(ConfigSource::Flags, args.flag_layer())
        .resolve();

    let mut minipack = Minipack::with_config(config)?.with_reporter(Arc::clone(&reporter));
    if let Some(url) = manifest.sources.npm {
        minipack = minipack.with_registry_url(url);
    }
    if let Some(url) = manifest.sources.github {
        minipack = minipack.with_github_base_url(url);
    }

    for spec in manifest.dependency {
        let queued = match spec.into_task() {
            Task::GitHub(options) => minipack.github(options).is_ok(),
            Task::Npm(options) => minipack.npm(options).await.is_ok(),
            Task::Tar(dependency) => minipack.tar(dependency).is_ok(),
        };
        if !queued {
            return Ok(false);
        }
    }

    Ok(minipack.pack().await.is_ok())
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();
    init_logger(args.verbosity());

    let manifest = load_manifest(&args)?;

    let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
    let success = rt.block_on(vendor(args, manifest))?;

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", console::style("Error:").red().bold(), e);
            // Print the error chain for debugging
            for cause in e.chain().skip(1) {
                eprintln!("  Caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_layer_only_sets_given_flags() {
        let args = Args::parse_from(["minipack", "--out-dir", "static/vendor"]);
        let layer = args.flag_layer();

        assert_eq!(layer.out_dir, Some(PathBuf::from("static/vendor")));
        assert_eq!(layer.temp_dir, None);
        assert_eq!(layer.reload, None);
    }

    #[test]
    fn test_flags_override_manifest() {
        let args = Args::parse_from(["minipack", "--reload", "--temp-dir", "/tmp/x"]);
        let manifest = ConfigLayer::new()
            .with_temp_dir("./.temp")
            .with_out_dir("./vendor")
            .with_reload(false);

        let config = LayeredConfig::new()
            .with_layer(ConfigSource::Construction, manifest)
            .with_layer(ConfigSource::Flags, args.flag_layer())
            .resolve();

        assert!(config.reload);
        assert_eq!(config.temp_dir, Some(PathBuf::from("/tmp/x")));
        assert_eq!(config.out_dir, PathBuf::from("./vendor"));
        assert_eq!(config.sources().out_dir, ConfigSource::Construction);
        assert_eq!(config.sources().reload, ConfigSource::Flags);
    }

    #[test]
    fn test_verbosity() {
        assert_eq!(Args::parse_from(["minipack"]).verbosity(), Verbosity::Normal);
        assert_eq!(Args::parse_from(["minipack", "-q"]).verbosity(), Verbosity::Quiet);
        assert_eq!(Args::parse_from(["minipack", "-v"]).verbosity(), Verbosity::Verbose);
        assert!(Args::try_parse_from(["minipack", "-v", "-q"]).is_err());
    }

    fn quiet_args(out_dir: &Path) -> Args {
        Args::parse_from(["minipack", "-q", "--out-dir", out_dir.to_str().unwrap()])
    }

    #[tokio::test]
    async fn test_vendor_without_dependencies_succeeds() {
        let temp = tempfile::TempDir::new().unwrap();
        let out_dir = temp.path().join("vendor");

        let success = vendor(quiet_args(&out_dir), MinipackManifest::default())
            .await
            .unwrap();

        assert!(success);
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn test_vendor_unresolvable_npm_package_fails_before_download() {
        let temp = tempfile::TempDir::new().unwrap();
        let out_dir = temp.path().join("vendor");
        let manifest = MinipackManifest::parse(
            r#"
[sources]
npm = "http://127.0.0.1:1"

[[dependency]]
type = "npm"
package = "vue@3.4"
"#,
        )
        .unwrap();

        let success = vendor(quiet_args(&out_dir), manifest).await.unwrap();

        assert!(!success);
        assert!(!out_dir.exists());
    }

    #[tokio::test]
    async fn test_vendor_failed_task_reports_failure() {
        let temp = tempfile::TempDir::new().unwrap();
        let out_dir = temp.path().join("vendor");
        let temp_dir = temp.path().join(".temp");
        let manifest = MinipackManifest::parse(
            r#"
[[dependency]]
type = "tar"
name = "fonts"
url = "http://127.0.0.1:1/fonts.tar.gz"
"#,
        )
        .unwrap();
        let args = Args::parse_from([
            "minipack",
            "-q",
            "--out-dir",
            out_dir.to_str().unwrap(),
            "--temp-dir",
            temp_dir.to_str().unwrap(),
        ]);

        let success = vendor(args, manifest).await.unwrap();

        assert!(!success);
        assert!(!temp_dir.exists());
    }

    #[tokio::test]
    async fn test_vendor_duplicate_names_fail() {
        let temp = tempfile::TempDir::new().unwrap();
        let out_dir = temp.path().join("vendor");
        let manifest = MinipackManifest::parse(
            r#"
[[dependency]]
type = "tar"
name = "fonts"
url = "http://127.0.0.1:1/a.tar.gz"

[[dependency]]
type = "tar"
name = "fonts"
url = "http://127.0.0.1:1/b.tar.gz"
"#,
        )
        .unwrap();

        let success = vendor(quiet_args(&out_dir), manifest).await.unwrap();

        assert!(!success);
        assert!(!out_dir.exists());
    }

    #[test]
    fn test_manifest_paths_are_anchored() {
        let options = ConfigLayer::new()
            .with_out_dir("vendor")
            .with_temp_dir("/abs/temp");
        let anchored = anchor_options(options, Path::new("/project"));

        assert_eq!(anchored.out_dir, Some(PathBuf::from("/project/vendor")));
        assert_eq!(anchored.temp_dir, Some(PathBuf::from("/abs/temp")));
    }
}
