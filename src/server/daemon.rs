//! Unix daemon keeping the identifier snapshot warm
//!
//! Serves search, suggestion and library requests over a Unix socket. On startup it
//! loads the persisted snapshot and kicks off a background rebuild.

use crate::document::ExtractorSet;
use crate::library::Library;
use crate::search::DocumentSearcher;
use crate::server::protocol::{
    read_message, write_message, Request, Response, SearchResponse, StatusResponse,
    SuggestResponse,
};
use crate::suggest::{spawn_refresh, IndexBuilder, Suggestion, SuggestionIndex};
use crate::utils::{get_pid_path, get_socket_path, AppConfig};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use lru::LruCache;
use std::fs;
use std::io::{BufReader, BufWriter};
use std::num::NonZeroUsize;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// LRU cache size for suggestion results
const CACHE_SIZE: NonZeroUsize = NonZeroUsize::new(128).unwrap();

/// Connection timeout
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Suggestion results keyed by (query, limit), valid for one snapshot generation
struct SuggestionCache {
    generation: u64,
    entries: LruCache<(String, usize), Vec<Suggestion>>,
}

impl SuggestionCache {
    fn new() -> Self {
        Self {
            generation: 0,
            entries: LruCache::new(CACHE_SIZE),
        }
    }

    /// Drop everything cached against an older snapshot
    fn sync_generation(&mut self, generation: u64) {
        if self.generation != generation {
            self.entries.clear();
            self.generation = generation;
        }
    }
}

/// Statistics for the server
struct ServerStats {
    start_time: Instant,
    queries_served: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            start_time: Instant::now(),
            queries_served: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
        }
    }

    fn cache_hit_rate(&self) -> f32 {
        let hits = self.cache_hits.load(Ordering::Relaxed);
        let misses = self.cache_misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f32 / total as f32
        }
    }
}

/// The pagex daemon
pub struct IndexServer {
    config: AppConfig,
    index: Arc<SuggestionIndex>,
    searcher: DocumentSearcher,
    library: Library,
    builder: Arc<dyn IndexBuilder>,
    suggestion_cache: Mutex<SuggestionCache>,
    rebuild: Mutex<Option<JoinHandle<crate::error::Result<usize>>>>,
    stats: ServerStats,
    shutdown: AtomicBool,
    socket_path: PathBuf,
    pid_path: PathBuf,
}

impl IndexServer {
    /// Create a server listening on the per-user socket
    pub fn new(config: AppConfig) -> Result<Arc<Self>> {
        Self::with_paths(config, get_socket_path(), get_pid_path())
    }

    /// Create a server with explicit socket and pid file locations
    pub fn with_paths(config: AppConfig, socket_path: PathBuf, pid_path: PathBuf) -> Result<Arc<Self>> {
        let searcher = DocumentSearcher::new(ExtractorSet::default(), config.search_config())
            .context("Failed to start search workers")?;
        let builder = config.index_builder()?;

        Ok(Arc::new(Self {
            index: Arc::new(SuggestionIndex::new(&config.index_file)),
            library: Library::new(&config.documents_dir),
            searcher,
            builder,
            config,
            suggestion_cache: Mutex::new(SuggestionCache::new()),
            rebuild: Mutex::new(None),
            stats: ServerStats::new(),
            shutdown: AtomicBool::new(false),
            socket_path,
            pid_path,
        }))
    }

    /// Start the server (blocking)
    pub fn run(self: &Arc<Self>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Remove stale socket file
        if self.socket_path.exists() {
            fs::remove_file(&self.socket_path)?;
        }

        fs::write(&self.pid_path, format!("{}", std::process::id()))?;

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind to {}", self.socket_path.display()))?;

        // Set socket permissions (user only)
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.socket_path, fs::Permissions::from_mode(0o600))?;
        }

        info!("listening on {}", self.socket_path.display());

        if let Err(e) = self.index.reload() {
            warn!("starting with an empty identifier index: {}", e);
        }
        self.start_rebuild();

        for stream in listener.incoming() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            match stream {
                Ok(stream) => {
                    let _ = stream.set_read_timeout(Some(CONNECTION_TIMEOUT));
                    let _ = stream.set_write_timeout(Some(CONNECTION_TIMEOUT));

                    let server = Arc::clone(self);
                    thread::spawn(move || {
                        if let Err(e) = server.handle_connection(stream) {
                            debug!("connection error: {}", e);
                        }
                    });
                }
                Err(e) => {
                    warn!("accept error: {}", e);
                }
            }
        }

        let _ = fs::remove_file(&self.socket_path);
        let _ = fs::remove_file(&self.pid_path);
        info!("shut down");

        Ok(())
    }

    /// Handle a single client connection
    fn handle_connection(&self, stream: UnixStream) -> Result<()> {
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        loop {
            let request: Request = match read_message(&mut reader) {
                Ok(req) => req,
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    // Client disconnected
                    break;
                }
                Err(e) => {
                    // The rest of a rejected frame may still be unread, so the
                    // stream cannot be trusted past this point
                    let resp = Response::Error {
                        message: format!("Invalid request: {}", e),
                    };
                    write_message(&mut writer, &resp)?;
                    break;
                }
            };

            let response = self.handle_request(request);
            write_message(&mut writer, &response)?;

            if matches!(response, Response::ShuttingDown) {
                // Wake the accept loop so it observes the flag
                let _ = UnixStream::connect(&self.socket_path);
                break;
            }
        }

        Ok(())
    }

    /// Handle a single request
    fn handle_request(&self, request: Request) -> Response {
        match request {
            Request::Search { term, root } => self.handle_search(&term, root.as_deref()),

            Request::Suggest { query, limit } => self.handle_suggest(query, limit),

            Request::Reload => self.handle_reload(),

            Request::Rebuild => {
                self.start_rebuild();
                Response::RebuildStarted
            }

            Request::ListFiles => match self.library.list() {
                Ok(files) => Response::Files { files },
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },

            Request::DeleteFiles { names } => match self.library.delete(names.as_slice()) {
                Ok(report) => {
                    if report.needs_reindex() {
                        self.start_rebuild();
                    }
                    Response::Deleted(report)
                }
                Err(e) => Response::Error {
                    message: e.to_string(),
                },
            },

            Request::Status => self.handle_status(),

            Request::Shutdown => {
                self.shutdown.store(true, Ordering::Relaxed);
                Response::ShuttingDown
            }

            Request::Ping => Response::Pong,
        }
    }

    fn handle_search(&self, term: &str, root: Option<&Path>) -> Response {
        let start = Instant::now();
        let root = root.unwrap_or(self.config.documents_dir.as_path());

        match self.searcher.search(term, root) {
            Ok(results) => {
                self.stats.queries_served.fetch_add(1, Ordering::Relaxed);
                Response::Search(SearchResponse {
                    results,
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                })
            }
            Err(e) => Response::Error {
                message: e.to_string(),
            },
        }
    }

    fn handle_suggest(&self, query: String, limit: Option<usize>) -> Response {
        let start = Instant::now();
        let limit = self.config.effective_suggestion_limit(limit);
        self.stats.queries_served.fetch_add(1, Ordering::Relaxed);

        // Generation is read before the snapshot so a concurrent reload can only
        // make the cached entry look older than it is
        let generation = self.index.generation();
        let key = (query, limit);

        {
            let mut cache = self
                .suggestion_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            cache.sync_generation(generation);
            if let Some(suggestions) = cache.entries.get(&key) {
                self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
                return Response::Suggestions(SuggestResponse {
                    suggestions: suggestions.clone(),
                    duration_ms: start.elapsed().as_secs_f64() * 1000.0,
                    cached: true,
                });
            }
        }

        self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        let suggestions = self.index.suggest(&key.0, limit);

        {
            let mut cache = self
                .suggestion_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if cache.generation == generation {
                cache.entries.put(key, suggestions.clone());
            }
        }

        Response::Suggestions(SuggestResponse {
            suggestions,
            duration_ms: start.elapsed().as_secs_f64() * 1000.0,
            cached: false,
        })
    }

    fn handle_status(&self) -> Response {
        Response::Status(StatusResponse {
            uptime_secs: self.stats.start_time.elapsed().as_secs(),
            index_entries: self.index.size(),
            index_generation: self.index.generation(),
            rebuilding: self.is_rebuilding(),
            documents_dir: self.config.documents_dir.clone(),
            queries_served: self.stats.queries_served.load(Ordering::Relaxed),
            cache_hit_rate: self.stats.cache_hit_rate(),
        })
    }

    fn handle_reload(&self) -> Response {
        match self.index.reload() {
            Ok(entries) => Response::Reloaded {
                success: true,
                entries,
                message: format!("Loaded {} identifiers", entries),
            },
            Err(e) => Response::Reloaded {
                success: false,
                entries: self.index.size(),
                message: format!("Failed to reload: {}", e),
            },
        }
    }

    /// Start a background rebuild unless one is already running
    fn start_rebuild(&self) {
        let mut slot = self.rebuild.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("rebuild already in progress");
            return;
        }

        match spawn_refresh(
            Arc::clone(&self.builder),
            self.config.documents_dir.clone(),
            Arc::clone(&self.index),
        ) {
            Ok(handle) => *slot = Some(handle),
            Err(e) => error!("failed to start index rebuild: {}", e),
        }
    }

    fn is_rebuilding(&self) -> bool {
        self.rebuild
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Block until the current rebuild (if any) finishes
    pub fn wait_for_rebuild(&self) {
        let handle = self
            .rebuild
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Daemonize the current process
pub fn daemonize(config: AppConfig) -> Result<()> {
    // Fork using double-fork technique for proper daemonization
    match unsafe { libc::fork() } {
        -1 => anyhow::bail!("First fork failed"),
        0 => {
            // Child process: create new session
            if unsafe { libc::setsid() } == -1 {
                anyhow::bail!("setsid failed");
            }

            // Second fork to prevent acquiring a controlling terminal
            match unsafe { libc::fork() } {
                -1 => anyhow::bail!("Second fork failed"),
                0 => {
                    // Grandchild becomes the daemon
                    unsafe {
                        libc::close(0);
                        libc::close(1);
                        libc::close(2);

                        let null = libc::open(
                            c"/dev/null".as_ptr(),
                            libc::O_RDWR,
                        );
                        if null != -1 {
                            libc::dup2(null, 0);
                            libc::dup2(null, 1);
                            libc::dup2(null, 2);
                            if null > 2 {
                                libc::close(null);
                            }
                        }
                    }

                    // Change to root directory to avoid holding mounts
                    let _ = std::env::set_current_dir("/");

                    // Worker threads must be created after the fork
                    let result = IndexServer::new(config).and_then(|server| server.run());
                    if let Err(e) = result {
                        // stderr is closed, leave the error next to the pid file
                        let _ = fs::write(get_pid_path().with_extension("err"), format!("{:#}", e));
                    }
                    std::process::exit(0);
                }
                _ => {
                    // First child exits immediately
                    std::process::exit(0);
                }
            }
        }
        _ => {
            // Parent process - wait for first child then exit
            unsafe {
                let mut status: libc::c_int = 0;
                libc::wait(&mut status);
            }
            Ok(())
        }
    }
}

/// Start the daemon in foreground (for debugging)
pub fn run_foreground(config: AppConfig) -> Result<()> {
    let server = IndexServer::new(config)?;
    server.run()
}

/// Stop the running daemon
pub fn stop_daemon() -> Result<bool> {
    let pid_path = get_pid_path();

    if !pid_path.exists() {
        return Ok(false);
    }

    let pid_str = fs::read_to_string(&pid_path)?;
    let pid: i32 = pid_str.trim().parse().context("Malformed pid file")?;

    // Send SIGTERM
    unsafe {
        if libc::kill(pid, libc::SIGTERM) == 0 {
            // Wait a bit for graceful shutdown
            thread::sleep(Duration::from_millis(500));

            // Check if still running, send SIGKILL if needed
            if libc::kill(pid, 0) == 0 {
                thread::sleep(Duration::from_secs(1));
                if libc::kill(pid, 0) == 0 {
                    libc::kill(pid, libc::SIGKILL);
                }
            }
        }
    }

    // Clean up socket and pid files
    let _ = fs::remove_file(get_socket_path());
    let _ = fs::remove_file(&pid_path);

    Ok(true)
}
