//! The routes monitor.
//!
//! [`RoutesMonitor`] ties the pieces together:
//!
//! ```text
//! WatchSource ──events──► pump ──apply──► MonitorHost ◄──reads── LanguageService
//!                           │                                       │
//!                     debounce window                            Program
//!                           │                                       │
//!                           └──► update_routes_result ──► RouteExtractor ──► analyze
//!                                         │
//!                                   broadcast: analysisStarted / analysisCompleted
//! ```
//!
//! Analysis passes are serialized by a single guard: a pass started while
//! another runs waits for it, so `analysisStarted`/`analysisCompleted`
//! pairs never interleave.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::{Mutex, RwLock};
use sa_core::{Config, MonitorConfig, ProjectConfig, paths};
use sa_ts_parser::{
    ExtractionResult, HonoRouteExtractor, LanguageService, Program, RouteExtractor, ServiceHost,
    SourceSnapshot, TreeSitterService,
};
use sa_watcher::{FileWatcher, WatchSource};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::analyze::analyze;
use crate::error::MonitorError;
use crate::events::AnalysisEvent;
use crate::host::MonitorHost;
use crate::pump;
use crate::result::RoutesResult;

/// Capacity of the analysis event channel; slow subscribers skip ahead.
const EVENT_CHANNEL_CAPACITY: usize = 64;

struct AnalysisState<S> {
    service: S,
    /// The last program and the host generation it was built from.
    program: Option<(u64, Arc<Program>)>,
}

/// State shared between the monitor, its event pump and blocking analysis tasks.
pub(crate) struct Shared<S, E> {
    pub(crate) config: MonitorConfig,
    pub(crate) host: MonitorHost,
    analysis: Mutex<AnalysisState<S>>,
    extractor: E,
    events: broadcast::Sender<AnalysisEvent>,
    running: watch::Sender<bool>,
    auto_create_result: AtomicBool,
    last_successful: RwLock<Option<RoutesResult>>,
}

impl<S, E> Shared<S, E>
where
    S: LanguageService,
    E: RouteExtractor,
{
    pub(crate) fn is_running(&self) -> bool {
        *self.running.borrow()
    }

    pub(crate) fn subscribe_running(&self) -> watch::Receiver<bool> {
        self.running.subscribe()
    }

    pub(crate) fn auto_create_result(&self) -> bool {
        self.auto_create_result.load(Ordering::Relaxed)
    }

    fn emit(&self, event: AnalysisEvent) {
        trace!(event = event.name(), "Emitting analysis event");
        if self.events.send(event).is_err() {
            trace!("No analysis subscribers");
        }
    }

    /// Runs one analysis pass and publishes its outcome.
    pub(crate) fn update_routes_result(&self) -> Result<RoutesResult, MonitorError> {
        if !self.is_running() {
            return Err(MonitorError::NotRunning);
        }

        let mut analysis = self.analysis.lock();
        self.emit(AnalysisEvent::Started);

        match self.build_result(&mut analysis) {
            Ok(result) => {
                *self.last_successful.write() = Some(result.clone());
                self.emit(AnalysisEvent::success(result.clone()));
                Ok(result)
            }
            Err(err) => {
                self.emit(AnalysisEvent::failure(err.to_string()));
                Err(err)
            }
        }
    }

    fn build_result(&self, analysis: &mut AnalysisState<S>) -> Result<RoutesResult, MonitorError> {
        let extraction = self.extract_routes(analysis)?;
        if extraction.error_count > 0 {
            warn!(
                errors = extraction.error_count,
                "{} error(s) found while extracting routes",
                extraction.error_count
            );
        }

        let root_id = analyze(&extraction.resource_manager)
            .map(|root| root.id.clone())
            .ok_or(MonitorError::NoRootRoute)?;

        Ok(RoutesResult::new(Arc::new(extraction.resource_manager), root_id))
    }

    /// Extracts the routes of the current program without publishing them.
    pub(crate) fn find_hono_routes(&self) -> Result<ExtractionResult, MonitorError> {
        let mut analysis = self.analysis.lock();
        self.extract_routes(&mut analysis)
    }

    fn extract_routes(
        &self,
        analysis: &mut AnalysisState<S>,
    ) -> Result<ExtractionResult, MonitorError> {
        self.host.clear_file_exists_cache();
        if !self.is_running() {
            return Err(MonitorError::NotRunning);
        }

        let program = self
            .program(analysis)
            .ok_or(MonitorError::ProgramUnavailable)?;
        let extraction = self
            .extractor
            .extract(&program, &self.host, self.host.project_root())?;
        Ok(extraction)
    }

    /// Returns the program for the current host state, rebuilding it only
    /// after the file map changed.
    fn program(&self, analysis: &mut AnalysisState<S>) -> Option<Arc<Program>> {
        let generation = self.host.generation();
        if let Some((built_from, program)) = &analysis.program {
            if *built_from == generation {
                return Some(Arc::clone(program));
            }
        }

        self.refetch_program(analysis)
    }

    /// Asks the service for a new program and caches it for the current
    /// host generation.
    fn refetch_program(&self, analysis: &mut AnalysisState<S>) -> Option<Arc<Program>> {
        let generation = self.host.generation();
        let started = Instant::now();
        let program = analysis.service.get_program(&self.host)?;
        debug!(
            files = program.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Program rebuilt"
        );
        analysis.program = Some((generation, Arc::clone(&program)));
        Some(program)
    }

    /// Returns the `known` files a freshly fetched program does not contain.
    ///
    /// The service may lag behind the file map, so the cached program is
    /// never reused here.
    fn missing_from_program(
        &self,
        known: &[Utf8PathBuf],
    ) -> Result<Vec<Utf8PathBuf>, MonitorError> {
        let mut analysis = self.analysis.lock();
        let program = self
            .refetch_program(&mut analysis)
            .ok_or(MonitorError::ProgramUnavailable)?;
        Ok(known
            .iter()
            .filter(|file_name| !program.contains(file_name))
            .cloned()
            .collect())
    }
}

struct Pump {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps a live [`RoutesResult`] for a project.
///
/// The type parameters default to the production stack (notify watcher,
/// tree-sitter service, Hono extractor); tests and editor integrations
/// substitute their own through [`RoutesMonitor::with_parts`].
///
/// # Examples
///
/// ```no_run
/// use sa_monitor::{AnalysisEvent, RoutesMonitor};
///
/// #[tokio::main]
/// async fn main() -> Result<(), sa_monitor::MonitorError> {
///     let mut monitor = RoutesMonitor::new(".")?;
///     let mut events = monitor.subscribe();
///     monitor.start().await?;
///
///     while let Ok(event) = events.recv().await {
///         if let AnalysisEvent::Completed(completed) = event {
///             if let Some(result) = completed.routes_result() {
///                 println!("{} routes", result.routes().len());
///             }
///         }
///     }
///     monitor.stop().await
/// }
/// ```
pub struct RoutesMonitor<W = FileWatcher, S = TreeSitterService, E = HonoRouteExtractor> {
    project_root: Utf8PathBuf,
    watcher: W,
    shared: Arc<Shared<S, E>>,
    pump: Option<Pump>,
}

impl RoutesMonitor {
    /// Creates a monitor for `project_root` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Watch`] if the project's watch locations are
    /// not valid globs.
    pub fn new(project_root: impl AsRef<Utf8Path>) -> Result<Self, MonitorError> {
        Self::with_config(project_root, &Config::default())
    }

    /// Creates a monitor for `project_root`, watching the locations its
    /// `tsconfig.json` includes.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Watch`] if the project's watch locations are
    /// not valid globs.
    pub fn with_config(
        project_root: impl AsRef<Utf8Path>,
        config: &Config,
    ) -> Result<Self, MonitorError> {
        let project = ProjectConfig::discover(project_root.as_ref());
        let watcher = FileWatcher::for_project(&project, &config.watch)?;
        debug!(bases = ?watcher.bases(), "Resolved watch locations");

        Ok(Self::with_parts(
            project.root(),
            config.monitor,
            watcher,
            TreeSitterService::new(),
            HonoRouteExtractor,
        ))
    }
}

impl<W, S, E> RoutesMonitor<W, S, E>
where
    W: WatchSource,
    S: LanguageService + 'static,
    E: RouteExtractor + 'static,
{
    /// Assembles a monitor from its parts.
    ///
    /// A project root that is not a directory is logged but accepted.
    pub fn with_parts(
        project_root: impl AsRef<Utf8Path>,
        config: MonitorConfig,
        watcher: W,
        service: S,
        extractor: E,
    ) -> Self {
        let project_root = paths::absolutize(project_root.as_ref());
        if !project_root.is_dir() {
            error!(root = %project_root, "Project root is not a directory");
            warn!("Continuing, but this is likely to cause issues");
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (running, _) = watch::channel(false);

        let shared = Shared {
            config,
            host: MonitorHost::new(&project_root, config.aggressive_caching),
            analysis: Mutex::new(AnalysisState {
                service,
                program: None,
            }),
            extractor,
            events,
            running,
            auto_create_result: AtomicBool::new(config.auto_create_result),
            last_successful: RwLock::new(None),
        };

        Self {
            project_root,
            watcher,
            shared: Arc::new(shared),
            pump: None,
        }
    }

    /// Starts watching and analysing.
    ///
    /// Waits until every file the watcher reported is part of the program,
    /// polling with a growing delay. If the files never all show up the
    /// monitor logs an error and starts anyway. Calling `start` on a running
    /// monitor does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Watch`] if the watcher cannot start.
    pub async fn start(&mut self) -> Result<(), MonitorError> {
        if self.is_running() {
            debug!("Routes monitor already running");
            return Ok(());
        }

        info!(root = %self.project_root, "Starting routes monitor");
        let events = self.watcher.start().await?;
        self.shared
            .host
            .retain_files(&self.watcher.known_file_names());

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(pump::run(
            Arc::clone(&self.shared),
            events,
            cancel.clone(),
        ));
        self.pump = Some(Pump { cancel, handle });

        let ready = self.wait_until_ready().await;

        self.shared.running.send_replace(true);
        info!(
            files = self.shared.host.file_count(),
            ready, "Routes monitor started"
        );
        Ok(())
    }

    async fn wait_until_ready(&self) -> bool {
        let readiness = self.shared.config.readiness;

        for retry_count in 0..=readiness.max_retries {
            let known = self.watcher.known_file_names();
            let shared = Arc::clone(&self.shared);
            let checked =
                tokio::task::spawn_blocking(move || shared.missing_from_program(&known)).await;

            match checked {
                Ok(Ok(missing)) if missing.is_empty() => {
                    debug!(retry_count, "All watched files are part of the program");
                    return true;
                }
                Ok(Ok(missing)) => {
                    for file_name in &missing {
                        warn!(file = %file_name, "File not yet part of the program");
                    }
                }
                Ok(Err(err)) => warn!(error = %err, "Readiness check failed"),
                Err(err) => {
                    error!(error = %err, "Readiness check task failed");
                    return false;
                }
            }

            if retry_count < readiness.max_retries {
                let delay = readiness.delay_for(retry_count);
                debug!(retry_count, delay_ms = delay.as_millis(), "Retrying readiness check");
                tokio::time::sleep(delay).await;
            }
        }

        error!(
            retries = readiness.max_retries,
            "Failed to monitor all files after {} retries, analysis might be incomplete",
            readiness.max_retries
        );
        false
    }

    /// Stops watching. A pending debounced analysis is dropped.
    ///
    /// Stopping a monitor that is not running does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::Watch`] if the watcher failed while running.
    pub async fn stop(&mut self) -> Result<(), MonitorError> {
        if !self.is_running() {
            return Ok(());
        }

        if let Some(pump) = self.pump.take() {
            pump.cancel.cancel();
            if let Err(err) = pump.handle.await {
                warn!(error = %err, "Event pump ended abnormally");
            }
        }

        let stopped = self.watcher.stop().await;
        self.shared.running.send_replace(false);
        info!(root = %self.project_root, "Routes monitor stopped");
        stopped.map_err(MonitorError::from)
    }

    /// Runs one analysis pass on the calling thread.
    ///
    /// Emits `analysisStarted` and then exactly one `analysisCompleted`.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NotRunning`] (without emitting anything) if
    /// the monitor is not running, and the failure reported in the
    /// `analysisCompleted` event otherwise.
    pub fn update_routes_result(&self) -> Result<RoutesResult, MonitorError> {
        self.shared.update_routes_result()
    }

    /// Extracts routes from the current program without running root
    /// selection or emitting events.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::NotRunning`] if the monitor is not running,
    /// [`MonitorError::ProgramUnavailable`] if the service produced no
    /// program, and any hard extraction error.
    pub fn find_hono_routes(&self) -> Result<ExtractionResult, MonitorError> {
        self.shared.find_hono_routes()
    }

    /// Runs one analysis pass on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// See [`update_routes_result`](Self::update_routes_result).
    pub async fn refresh(&self) -> Result<RoutesResult, MonitorError> {
        let shared = Arc::clone(&self.shared);
        tokio::task::spawn_blocking(move || shared.update_routes_result()).await?
    }

    /// Subscribes to analysis events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AnalysisEvent> {
        self.shared.events.subscribe()
    }

    /// Returns `true` between a completed `start` and `stop`.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Returns the result of the last successful pass.
    #[must_use]
    pub fn last_successful_result(&self) -> Option<RoutesResult> {
        self.shared.last_successful.read().clone()
    }

    /// Returns `true` if file events schedule analyses automatically.
    #[must_use]
    pub fn auto_create_result(&self) -> bool {
        self.shared.auto_create_result()
    }

    /// Enables or disables automatic analyses.
    pub fn set_auto_create_result(&self, enabled: bool) {
        self.shared
            .auto_create_result
            .store(enabled, Ordering::Relaxed);
    }

    /// Returns `true` if host lookups prefer in-memory state.
    #[must_use]
    pub fn aggressive_caching(&self) -> bool {
        self.shared.host.aggressive_caching()
    }

    /// Enables or disables aggressive caching.
    pub fn set_aggressive_caching(&self, enabled: bool) {
        self.shared.host.set_aggressive_caching(enabled);
    }

    /// Returns the absolute project root.
    #[must_use]
    pub fn project_root(&self) -> &Utf8Path {
        &self.project_root
    }

    /// Returns the files the monitor currently knows.
    #[must_use]
    pub fn file_names(&self) -> Vec<Utf8PathBuf> {
        self.shared.host.file_names()
    }

    /// Returns `true` if the file is known or exists on disk.
    #[must_use]
    pub fn file_exists(&self, file_name: &Utf8Path) -> bool {
        self.shared.host.file_exists(file_name)
    }

    /// Returns `true` if the directory holds known files or exists on disk.
    #[must_use]
    pub fn directory_exists(&self, directory: &Utf8Path) -> bool {
        self.shared.host.directory_exists(directory)
    }

    /// Returns a file's content.
    #[must_use]
    pub fn read_file(&self, file_name: &Utf8Path) -> Option<String> {
        self.shared.host.read_file(file_name)
    }

    /// Returns a snapshot of a file's content.
    #[must_use]
    pub fn script_snapshot(&self, file_name: &Utf8Path) -> Option<SourceSnapshot> {
        self.shared.host.script_snapshot(file_name)
    }

    /// Returns the in-memory host.
    #[must_use]
    pub fn host(&self) -> &MonitorHost {
        &self.shared.host
    }

    /// Returns the watch source.
    #[must_use]
    pub const fn watcher(&self) -> &W {
        &self.watcher
    }
}

impl<W, S, E> Drop for RoutesMonitor<W, S, E> {
    fn drop(&mut self) {
        if let Some(pump) = &self.pump {
            pump.cancel.cancel();
        }
    }
}
