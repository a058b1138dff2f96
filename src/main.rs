use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use env_logger::Builder;
use log::LevelFilter;
use pagex::document::{export_page, ExtractorSet};
use pagex::library::{DeleteReport, Library, LibraryEntry};
use pagex::output;
use pagex::search::{DocumentSearcher, SearchResult};
use pagex::suggest::SuggestionIndex;
use pagex::utils::progress::Spinner;
use pagex::utils::AppConfig;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "pagex")]
#[command(about = "Page-level term search and identifier suggestions for document collections")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Find every page containing a term
    Search {
        term: String,

        /// Directory to search (defaults to the documents directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest indexed identifiers containing a query
    Suggest {
        query: String,

        /// Maximum number of suggestions
        #[arg(short, long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
    /// Save one page of a PDF as its own file
    Page {
        path: PathBuf,

        /// 1-based page number
        page: u32,

        /// Directory to write the page into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name for the page (".pdf" is added when missing)
        #[arg(long)]
        name: Option<String>,
    },
    /// Build the identifier index
    Index {
        /// Directory to index (defaults to the documents directory)
        path: Option<PathBuf>,
    },
    /// Manage the documents directory
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
    /// Control the background daemon
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
enum FilesAction {
    /// List documents
    List {
        #[arg(long)]
        json: bool,
    },
    /// Copy a document into the library
    Add {
        path: PathBuf,

        /// Store under a different file name
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete documents by name
    Delete {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DaemonAction {
    /// Start the daemon in background
    Start,
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
    /// Run daemon in foreground (for debugging)
    Foreground,
    /// Reload the identifier index from disk
    Reload,
    /// Rebuild the identifier index in the background
    Rebuild,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .format(|buf, record| writeln!(buf, "[{}] {}", record.level(), record.args()))
        .init();

    let config = AppConfig::load()?;
    let color = !cli.no_color;

    match cli.command {
        Commands::Search { term, path, json } => {
            let results = search(&config, &term, path)?;

            if json {
                output::print_json(&results)?;
            } else if results.is_empty() {
                eprintln!("No pages contain \"{}\"", term);
            } else {
                output::print_search_results(&results, color)?;
            }
        }
        Commands::Suggest { query, limit, json } => {
            let limit = config.effective_suggestion_limit(limit);
            let suggestions = suggest(&config, &query, limit)?;

            if json {
                output::print_json(&suggestions)?;
            } else {
                output::print_suggestions(&suggestions, color)?;
            }
        }
        Commands::Page {
            path,
            page,
            output,
            name,
        } => {
            let export = export_page(&path, page, &output, name.as_deref())?;
            println!(
                "Saved page {} of {} to {}",
                export.page,
                export.page_count,
                export.path.display()
            );
        }
        Commands::Index { path } => {
            let dir = path.unwrap_or_else(|| config.documents_dir.clone());
            build_index(&config, &dir)?;
            notify_daemon_reload();
        }
        Commands::Files { action } => {
            handle_files_command(&config, action, color)?;
        }
        Commands::Daemon { action } => {
            handle_daemon_command(config, action)?;
        }
    }

    Ok(())
}

/// Search through the daemon when it is up, else in-process
fn search(config: &AppConfig, term: &str, path: Option<PathBuf>) -> Result<Vec<SearchResult>> {
    #[cfg(unix)]
    {
        // The daemon runs from `/`, so a relative root must be resolved here. A root
        // that does not resolve is left to the local search to report.
        let remote_root = match &path {
            None => Some(None),
            Some(dir) => dir.canonicalize().ok().map(Some),
        };
        if let Some(remote_root) = remote_root
            && let Some(mut client) = pagex::server::IndexClient::connect()
        {
            match client.search(term, remote_root.as_deref()) {
                Ok(results) => return Ok(results),
                Err(pagex::server::ClientError::ServerError(message)) => anyhow::bail!(message),
                Err(e) => log::warn!("daemon search failed, searching directly: {}", e),
            }
        }
    }

    let root = path.unwrap_or_else(|| config.documents_dir.clone());
    let searcher = DocumentSearcher::new(ExtractorSet::default(), config.search_config())?;
    Ok(searcher.search(term, &root)?)
}

/// Suggestions from the daemon when it is up, else from the snapshot on disk
fn suggest(config: &AppConfig, query: &str, limit: usize) -> Result<Vec<pagex::suggest::Suggestion>> {
    #[cfg(unix)]
    if let Some(mut client) = pagex::server::IndexClient::connect() {
        match client.suggest(query, Some(limit)) {
            Ok(response) => return Ok(response.suggestions),
            Err(e) => log::warn!("daemon suggest failed, loading index directly: {}", e),
        }
    }

    let index = SuggestionIndex::new(&config.index_file);
    index
        .reload()
        .with_context(|| format!("Failed to load {}", config.index_file.display()))?;
    Ok(index.suggest(query, limit))
}

/// Run the configured builder over `dir` with a spinner
fn build_index(config: &AppConfig, dir: &Path) -> Result<usize> {
    let builder = config.index_builder()?;

    let spinner = Spinner::start(format!("Indexing {}...", dir.display()));
    let result = builder.build(dir, &config.index_file);
    spinner.finish();

    let count = result.with_context(|| format!("Failed to index {}", dir.display()))?;
    println!(
        "Indexed {} identifiers into {}",
        count,
        config.index_file.display()
    );
    Ok(count)
}

/// Ask a running daemon to pick up a snapshot written by this process
fn notify_daemon_reload() {
    #[cfg(unix)]
    if let Some(mut client) = pagex::server::IndexClient::connect()
        && let Err(e) = client.reload()
    {
        log::warn!("daemon reload failed: {}", e);
    }
}

/// Rebuild after a library change, through the daemon when it is running
fn refresh_after_change(config: &AppConfig) -> Result<()> {
    #[cfg(unix)]
    if let Some(mut client) = pagex::server::IndexClient::connect() {
        client.rebuild()?;
        println!("Index rebuild started in daemon");
        return Ok(());
    }

    build_index(config, &config.documents_dir)?;
    Ok(())
}

/// Library listing, from the daemon when it is running
fn list_documents(library: &Library) -> Result<Vec<LibraryEntry>> {
    #[cfg(unix)]
    if let Some(mut client) = pagex::server::IndexClient::connect() {
        match client.list_files() {
            Ok(files) => return Ok(files),
            Err(e) => log::warn!("daemon listing failed, reading directory: {}", e),
        }
    }

    Ok(library.list()?)
}

/// Delete documents, through the daemon when it is running.
///
/// Returns the report and whether the daemon handled it (and with it any rebuild).
fn delete_documents(library: &Library, names: &[String]) -> Result<(DeleteReport, bool)> {
    #[cfg(unix)]
    if let Some(mut client) = pagex::server::IndexClient::connect() {
        return Ok((client.delete_files(names)?, true));
    }

    Ok((library.delete(names)?, false))
}

fn handle_files_command(config: &AppConfig, action: FilesAction, color: bool) -> Result<()> {
    let library = Library::new(&config.documents_dir);

    match action {
        FilesAction::List { json } => {
            let entries = list_documents(&library)?;
            if json {
                output::print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No documents in {}", library.dir().display());
            } else {
                output::print_library(&entries, color)?;
            }
        }
        FilesAction::Add { path, name } => {
            let entry = library.import(&path, name.as_deref())?;
            println!("Added {} ({})", entry.name, output::format_size(entry.size));
            refresh_after_change(config)?;
        }
        FilesAction::Delete { names } => {
            let (report, by_daemon) = delete_documents(&library, &names)?;
            println!("Deleted {} document(s)", report.deleted);
            for name in &report.failed {
                eprintln!("Could not delete {}", name);
            }

            if report.needs_reindex() {
                if by_daemon {
                    println!("Index rebuild started in daemon");
                } else {
                    build_index(config, &config.documents_dir)?;
                }
            } else if report.deleted > 0 {
                eprintln!("Index not rebuilt; retry the failed deletions first");
            }
        }
    }

    Ok(())
}

#[cfg(unix)]
fn handle_daemon_command(config: AppConfig, action: DaemonAction) -> Result<()> {
    use pagex::server::{daemon, is_daemon_running, IndexClient};
    use pagex::utils::{get_pid_path, get_socket_path};

    match action {
        DaemonAction::Start => {
            if is_daemon_running() {
                println!("Daemon is already running");
                return Ok(());
            }

            println!("Starting pagex daemon...");
            daemon::daemonize(config)?;

            // Wait a moment for daemon to start
            std::thread::sleep(Duration::from_millis(500));

            if is_daemon_running() {
                println!("Daemon started (socket: {})", get_socket_path().display());
            } else {
                println!(
                    "Daemon may have failed to start. Check {}",
                    get_pid_path().with_extension("err").display()
                );
            }
        }

        DaemonAction::Stop => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            println!("Stopping daemon...");

            // Try graceful shutdown via client first
            if let Some(mut client) = IndexClient::connect() {
                let _ = client.shutdown();
                std::thread::sleep(Duration::from_millis(500));
            }

            // Force stop if still running
            if is_daemon_running() {
                daemon::stop_daemon()?;
            }

            println!("Daemon stopped");
        }

        DaemonAction::Status => {
            if !is_daemon_running() {
                println!("Daemon is not running");
                return Ok(());
            }

            match IndexClient::connect() {
                Some(mut client) => match client.status() {
                    Ok(status) => {
                        println!("pagex daemon status:");
                        println!("  Uptime: {}s", status.uptime_secs);
                        println!("  Documents: {}", status.documents_dir.display());
                        println!("  Indexed identifiers: {}", status.index_entries);
                        println!("  Index generation: {}", status.index_generation);
                        println!("  Rebuilding: {}", if status.rebuilding { "yes" } else { "no" });
                        println!("  Queries served: {}", status.queries_served);
                        println!("  Cache hit rate: {:.1}%", status.cache_hit_rate * 100.0);
                    }
                    Err(e) => {
                        println!("Failed to get status: {}", e);
                    }
                },
                None => {
                    println!("Daemon is running but not responding");
                }
            }
        }

        DaemonAction::Foreground => {
            if is_daemon_running() {
                println!("Daemon is already running in background. Stop it first with 'pagex daemon stop'");
                return Ok(());
            }

            println!("Running daemon in foreground (Ctrl+C to stop)...");
            daemon::run_foreground(config)?;
        }

        DaemonAction::Reload => {
            let Some(mut client) = IndexClient::connect() else {
                println!("Daemon is not running. Start it with 'pagex daemon start'");
                return Ok(());
            };

            match client.reload() {
                Ok((true, _, message)) => println!("Reloaded: {}", message),
                Ok((false, _, message)) => println!("Reload failed: {}", message),
                Err(e) => println!("Failed to reload: {}", e),
            }
        }

        DaemonAction::Rebuild => {
            let Some(mut client) = IndexClient::connect() else {
                println!("Daemon is not running. Start it with 'pagex daemon start'");
                return Ok(());
            };

            client.rebuild()?;
            println!("Rebuild started");
        }
    }

    Ok(())
}

#[cfg(not(unix))]
fn handle_daemon_command(_config: AppConfig, _action: DaemonAction) -> Result<()> {
    anyhow::bail!("the pagex daemon is only available on Unix platforms")
}
