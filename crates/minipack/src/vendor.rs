//! The orchestrator.
//!
//! [`Minipack`] holds the run configuration and an ordered task list and
//! drives a run through the states of [`PackState`]:
//!
//! ```text
//! Idle -> Verifying -> PreparingFilesystem -> RunningTasks -> CleaningUp -> Done
//! ```
//!
//! The scratch root is removed in `CleaningUp` on every path that created it.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{ConfigLayer, RunConfig};
use crate::http::{HttpClient, HttpClientConfig};
use crate::provider::{
    npm, ArchiveProvider, Dependency, ExecContext, GitHubOptions, GitHubResolver, NpmOptions,
    Provider,
};
use crate::registry::{NpmRegistry, PackageRegistry, NPM_REGISTRY_URL};
use crate::report::{ConsoleReporter, Reporter};
use crate::scratch::ScratchRoot;
use crate::util::{empty_dir, remove_dir_if_exists};
use crate::{MinipackError, Result};

/// How a finished run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackOutcome {
    Success,
    /// The run stopped at an error; earlier tasks' output is kept
    Degraded,
}

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackState {
    Idle,
    Verifying,
    PreparingFilesystem,
    RunningTasks { index: usize, name: String },
    CleaningUp,
    Done(PackOutcome),
}

impl fmt::Display for PackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackState::Idle => write!(f, "idle"),
            PackState::Verifying => write!(f, "verifying"),
            PackState::PreparingFilesystem => write!(f, "preparing filesystem"),
            PackState::RunningTasks { index, name } => {
                write!(f, "running task {} ({})", index + 1, name)
            }
            PackState::CleaningUp => write!(f, "cleaning up"),
            PackState::Done(PackOutcome::Success) => write!(f, "done"),
            PackState::Done(PackOutcome::Degraded) => write!(f, "done (degraded)"),
        }
    }
}

/// Display names of the tasks of a successful run, in task order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackSummary {
    pub fetched: Vec<String>,
    /// Cache hits
    pub skipped: Vec<String>,
}

/// Vendors a list of dependencies into the output directory
pub struct Minipack {
    config: RunConfig,
    tasks: Vec<Box<dyn Provider>>,
    http_client: Arc<HttpClient>,
    registry: Option<Arc<dyn PackageRegistry>>,
    registry_url: String,
    github: GitHubResolver,
    reporter: Arc<dyn Reporter>,
    state: PackState,
    last_scratch_dir: Option<PathBuf>,
}

impl fmt::Debug for Minipack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tasks: Vec<String> = self.tasks.iter().map(|task| task.display_name()).collect();
        f.debug_struct("Minipack")
            .field("config", &self.config)
            .field("tasks", &tasks)
            .field("registry_url", &self.registry_url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Minipack {
    /// Orchestrator with construction-time options over the defaults
    pub fn new(options: ConfigLayer) -> Result<Self> {
        Self::with_config(RunConfig::with_options(options))
    }

    /// Orchestrator with an already resolved configuration
    pub fn with_config(config: RunConfig) -> Result<Self> {
        let http_client = HttpClient::with_config(HttpClientConfig::default())
            .map_err(|e| MinipackError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            tasks: Vec::new(),
            http_client: Arc::new(http_client),
            registry: None,
            registry_url: NPM_REGISTRY_URL.to_string(),
            github: GitHubResolver::default(),
            reporter: Arc::new(ConsoleReporter::default()),
            state: PackState::Idle,
            last_scratch_dir: None,
        })
    }

    pub fn with_http_client(mut self, http_client: Arc<HttpClient>) -> Self {
        self.http_client = http_client;
        self
    }

    /// Resolve npm packages through `registry` instead of the npm registry
    pub fn with_registry(mut self, registry: Arc<dyn PackageRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Base URL of the npm registry (a mirror or a private registry)
    pub fn with_registry_url(mut self, url: impl Into<String>) -> Self {
        self.registry_url = url.into();
        self
    }

    pub fn with_github_base_url(mut self, url: impl Into<String>) -> Self {
        self.github = GitHubResolver::new(url);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn state(&self) -> &PackState {
        &self.state
    }

    /// Scratch root of the latest run, which no longer exists once it returned
    pub fn last_scratch_dir(&self) -> Option<&Path> {
        self.last_scratch_dir.as_deref()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Queue any provider
    pub fn add(&mut self, task: impl Provider + 'static) -> &mut Self {
        log::debug!("Queued {}", task.display_name());
        self.tasks.push(Box::new(task));
        self
    }

    /// Queue a tarball
    pub fn tar(&mut self, dependency: Dependency) -> Result<&mut Self> {
        let provider = self.reported(ArchiveProvider::new(dependency, Arc::clone(&self.http_client)))?;
        Ok(self.add(provider))
    }

    /// Queue a tagged GitHub release
    pub fn github(&mut self, options: GitHubOptions) -> Result<&mut Self> {
        let dependency = self.reported(self.github.resolve(&options))?;
        self.tar(dependency)
    }

    /// Resolve an npm package now and queue its tarball
    pub async fn npm(&mut self, options: NpmOptions) -> Result<&mut Self> {
        let registry = self.registry();
        let resolved = npm::resolve(registry.as_ref(), &options).await;
        let dependency = self.reported(resolved)?;
        self.tar(dependency)
    }

    /// Run every queued task.
    ///
    /// Errors are reported through the reporter before they are returned.
    /// Once the scratch root has been created it is removed again on every
    /// path. A verification failure returns before anything is touched, so a
    /// configured `temp_dir` that already existed is left as it was.
    pub async fn pack(&mut self) -> Result<PackSummary> {
        if self.tasks.is_empty() {
            self.reporter.warn("No dependencies specified");
            self.transition(PackState::Done(PackOutcome::Success));
            return Ok(PackSummary::default());
        }

        self.transition(PackState::Verifying);
        if let Err(e) = self.verify() {
            // Nothing was created yet
            self.transition(PackState::CleaningUp);
            return self.fail(e);
        }

        self.transition(PackState::PreparingFilesystem);
        let scratch = match ScratchRoot::create(self.config.temp_dir()) {
            Ok(scratch) => scratch,
            Err(e) => {
                self.transition(PackState::CleaningUp);
                if let Some(dir) = self.config.temp_dir() {
                    if let Err(cleanup) = remove_dir_if_exists(dir) {
                        log::warn!("Failed to remove {}: {}", dir.display(), cleanup);
                    }
                }
                return self.fail(e);
            }
        };
        self.last_scratch_dir = Some(scratch.path().to_path_buf());
        log::debug!("Scratch root: {}", scratch.path().display());

        let result = self.run(scratch.path()).await;

        self.transition(PackState::CleaningUp);
        let cleanup = scratch.remove();

        match (result, cleanup) {
            (Ok(summary), Ok(())) => {
                log::info!(
                    "Vendored {} dependencies ({} cached)",
                    summary.fetched.len() + summary.skipped.len(),
                    summary.skipped.len()
                );
                self.transition(PackState::Done(PackOutcome::Success));
                Ok(summary)
            }
            (Ok(_), Err(e)) => self.fail(e),
            (Err(e), cleanup) => {
                if let Err(cleanup) = cleanup {
                    log::warn!("Failed to remove scratch root: {}", cleanup);
                }
                self.fail(e)
            }
        }
    }

    fn verify(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name()) {
                return Err(MinipackError::DuplicateName {
                    name: task.name().to_string(),
                });
            }
        }
        Ok(())
    }

    async fn run(&mut self, scratch: &Path) -> Result<PackSummary> {
        let out_dir = self.config.out_dir.clone();

        if self.config.reload {
            self.reporter.info("Reloading all dependencies");
            empty_dir(&out_dir)?;
        } else {
            tokio::fs::create_dir_all(&out_dir).await?;
        }

        let tasks = std::mem::take(&mut self.tasks);
        let result = self.run_tasks(&tasks, scratch, &out_dir).await;
        self.tasks = tasks;

        result
    }

    async fn run_tasks(
        &mut self,
        tasks: &[Box<dyn Provider>],
        scratch: &Path,
        out_dir: &Path,
    ) -> Result<PackSummary> {
        let reporter = Arc::clone(&self.reporter);
        let mut summary = PackSummary::default();

        for (index, task) in tasks.iter().enumerate() {
            let display_name = task.display_name();
            self.transition(PackState::RunningTasks {
                index,
                name: display_name.clone(),
            });

            let target = out_dir.join(&display_name);
            if let Some(key) = task.key() {
                if target.is_dir() {
                    reporter.info(&format!(
                        "Skipping \"{}\", key \"{}\" has already been downloaded",
                        task.name(),
                        key
                    ));
                    summary.skipped.push(display_name);
                    continue;
                }
            }

            let temp_dir = scratch.join(task.name());
            empty_dir(&temp_dir)?;
            empty_dir(&target)?;

            let context = ExecContext {
                temp_dir,
                out_dir: target,
                reporter: reporter.as_ref(),
            };
            task.exec(&context).await?;
            summary.fetched.push(display_name);
        }

        Ok(summary)
    }

    fn registry(&self) -> Arc<dyn PackageRegistry> {
        match &self.registry {
            Some(registry) => Arc::clone(registry),
            None => Arc::new(NpmRegistry::with_registry_url(
                Arc::clone(&self.http_client),
                self.registry_url.clone(),
            )),
        }
    }

    fn reported<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.reporter.error(&e.to_string());
        }
        result
    }

    fn fail<T>(&mut self, error: MinipackError) -> Result<T> {
        self.reporter.error(&error.to_string());
        self.transition(PackState::Done(PackOutcome::Degraded));
        Err(error)
    }

    fn transition(&mut self, next: PackState) {
        log::debug!("{} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{EventKind, MemoryReporter};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    struct FakeProvider {
        name: String,
        key: Option<String>,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(name: &str, key: Option<&str>, calls: &Arc<AtomicUsize>) -> Self {
            Self {
                name: name.to_string(),
                key: key.map(str::to_string),
                fail: false,
                calls: Arc::clone(calls),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn key(&self) -> Option<&str> {
            self.key.as_deref()
        }

        async fn exec(&self, context: &ExecContext<'_>) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(std::fs::read_dir(&context.temp_dir).unwrap().count(), 0);
            assert_eq!(std::fs::read_dir(&context.out_dir).unwrap().count(), 0);

            if self.fail {
                return Err(MinipackError::Download {
                    url: format!("https://example.com/{}.tgz", self.name),
                    reason: "HTTP 404 Not Found".to_string(),
                });
            }
            std::fs::write(context.out_dir.join("file.txt"), &self.name)?;
            context.reporter.success(&self.display_name());
            Ok(())
        }
    }

    fn minipack(temp: &TempDir, reporter: &Arc<MemoryReporter>) -> Minipack {
        let options = ConfigLayer::new()
            .with_out_dir(temp.path().join("vendor"))
            .with_temp_dir(temp.path().join(".temp"));
        Minipack::new(options)
            .unwrap()
            .with_reporter(Arc::clone(reporter) as Arc<dyn Reporter>)
    }

    #[tokio::test]
    async fn test_pack_runs_tasks_in_order() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("b", Some("1"), &calls))
            .add(FakeProvider::new("a", None, &calls));

        let summary = mp.pack().await.unwrap();

        assert_eq!(summary.fetched, vec!["b@1", "a"]);
        assert!(summary.skipped.is_empty());
        assert_eq!(reporter.messages(EventKind::Success), vec!["b@1", "a"]);
        assert!(temp.path().join("vendor/b@1/file.txt").is_file());
        assert!(temp.path().join("vendor/a/file.txt").is_file());
        assert!(!temp.path().join(".temp").exists());
        assert_eq!(mp.state(), &PackState::Done(PackOutcome::Success));
        assert_eq!(mp.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_task_list_is_noop() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let mut mp = minipack(&temp, &reporter);

        let summary = mp.pack().await.unwrap();

        assert_eq!(summary, PackSummary::default());
        assert_eq!(reporter.messages(EventKind::Warn), vec!["No dependencies specified"]);
        assert!(!temp.path().join("vendor").exists());
        assert!(!temp.path().join(".temp").exists());
        assert_eq!(mp.last_scratch_dir(), None);
    }

    #[tokio::test]
    async fn test_duplicate_names_fail_before_io() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("vue", Some("3.4.0"), &calls))
            .add(FakeProvider::new("vue", Some("3.4.1"), &calls));

        let err = mp.pack().await.unwrap_err();

        assert!(matches!(err, MinipackError::DuplicateName { ref name } if name == "vue"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!temp.path().join("vendor").exists());
        assert!(!temp.path().join(".temp").exists());
        assert_eq!(mp.last_scratch_dir(), None);
        assert_eq!(mp.state(), &PackState::Done(PackOutcome::Degraded));
        assert_eq!(reporter.messages(EventKind::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_verification_failure_leaves_existing_temp_dir_alone() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        std::fs::create_dir_all(temp.path().join(".temp")).unwrap();
        std::fs::write(temp.path().join(".temp/leftover.txt"), "x").unwrap();
        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("vue", None, &calls))
            .add(FakeProvider::new("vue", None, &calls));

        assert!(mp.pack().await.is_err());

        assert!(temp.path().join(".temp/leftover.txt").is_file());
        assert_eq!(mp.state(), &PackState::Done(PackOutcome::Degraded));
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_tasks() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("first", Some("1"), &calls))
            .add(FakeProvider::new("broken", Some("1"), &calls).failing())
            .add(FakeProvider::new("never", Some("1"), &later));

        let err = mp.pack().await.unwrap_err();

        assert!(matches!(err, MinipackError::Download { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(later.load(Ordering::SeqCst), 0);
        // Completed work stays as a cache entry
        assert!(temp.path().join("vendor/first@1/file.txt").is_file());
        assert!(!temp.path().join(".temp").exists());
        assert_eq!(mp.state(), &PackState::Done(PackOutcome::Degraded));
    }

    #[tokio::test]
    async fn test_cache_hit_skips_keyed_tasks_only() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        std::fs::create_dir_all(temp.path().join("vendor/vue@3.4.1")).unwrap();
        std::fs::write(temp.path().join("vendor/vue@3.4.1/kept.js"), "cached").unwrap();
        std::fs::create_dir_all(temp.path().join("vendor/fonts")).unwrap();

        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("vue", Some("3.4.1"), &calls))
            .add(FakeProvider::new("fonts", None, &calls));

        let summary = mp.pack().await.unwrap();

        assert_eq!(summary.fetched, vec!["fonts"]);
        assert_eq!(summary.skipped, vec!["vue@3.4.1"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            reporter.messages(EventKind::Info),
            vec!["Skipping \"vue\", key \"3.4.1\" has already been downloaded"]
        );
        assert_eq!(
            std::fs::read_to_string(temp.path().join("vendor/vue@3.4.1/kept.js")).unwrap(),
            "cached"
        );
    }

    #[tokio::test]
    async fn test_reload_discards_cache() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        std::fs::create_dir_all(temp.path().join("vendor/vue@3.4.1")).unwrap();
        std::fs::write(temp.path().join("vendor/unrelated.txt"), "x").unwrap();

        let options = ConfigLayer::new()
            .with_out_dir(temp.path().join("vendor"))
            .with_reload(true);
        let mut mp = Minipack::new(options)
            .unwrap()
            .with_reporter(Arc::clone(&reporter) as Arc<dyn Reporter>);
        mp.add(FakeProvider::new("vue", Some("3.4.1"), &calls));

        mp.pack().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!temp.path().join("vendor/unrelated.txt").exists());
        assert_eq!(reporter.messages(EventKind::Info), vec!["Reloading all dependencies"]);
        // Generated scratch root
        let scratch = mp.last_scratch_dir().unwrap();
        assert!(!scratch.exists());
    }

    #[tokio::test]
    async fn test_tar_rejects_invalid_dependency() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let mut mp = minipack(&temp, &reporter);

        let result = mp.tar(Dependency::new("x", "not a url"));

        assert!(matches!(result, Err(MinipackError::InvalidDependency(_))));
        assert!(mp.is_empty());
        assert_eq!(reporter.messages(EventKind::Error).len(), 1);
    }

    #[test]
    fn test_debug_lists_queued_tasks() {
        let temp = TempDir::new().unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut mp = minipack(&temp, &reporter);
        mp.add(FakeProvider::new("vue", Some("3.4.1"), &calls));

        let debug = format!("{:?}", mp);

        assert!(debug.starts_with("Minipack {"));
        assert!(debug.contains("\"vue@3.4.1\""));
        assert!(debug.contains("state: Idle"));
    }

    #[test]
    fn test_state_display() {
        let state = PackState::RunningTasks {
            index: 0,
            name: "vue@3.4.1".to_string(),
        };
        assert_eq!(state.to_string(), "running task 1 (vue@3.4.1)");
        assert_eq!(PackState::Done(PackOutcome::Degraded).to_string(), "done (degraded)");
    }
}
