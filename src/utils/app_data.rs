use crate::document::discover::DEFAULT_SKIP_DIRS;
use crate::document::{DiscoveryOptions, ExtractorSet};
use crate::search::executor::DEFAULT_MAX_DOCUMENT_SIZE;
use crate::search::SearchConfig;
use crate::suggest::{
    CommandIndexBuilder, IndexBuilder, NumberIndexBuilder, DEFAULT_IDENTIFIER_PATTERN,
    MAX_SUGGESTIONS,
};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const APP_NAME: &str = "pagex";
const CONFIG_FILE: &str = "config.json";
const INDEX_FILE: &str = "search_index.json";

/// Application configuration stored in the app data directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding the managed documents
    #[serde(default = "default_documents_dir")]
    pub documents_dir: PathBuf,

    /// Persisted identifier snapshot
    #[serde(default = "default_index_file")]
    pub index_file: PathBuf,

    /// Worker threads for searching (0 = number of CPUs)
    #[serde(default)]
    pub search_threads: usize,

    #[serde(default = "default_max_document_size")]
    pub max_document_size: u64,

    /// Default and maximum number of suggestions per query
    #[serde(default = "default_suggestion_limit")]
    pub suggestion_limit: usize,

    #[serde(default = "default_identifier_pattern")]
    pub identifier_pattern: String,

    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,

    /// Extra directory names skipped during discovery, on top of the built-in ones
    #[serde(default)]
    pub skip_dirs: Vec<String>,

    /// External indexer command line; the native builder is used when unset.
    ///
    /// `{dir}` and `{output}` arguments are replaced by the documents directory and
    /// `index_file`. Without either, both paths are appended in that order.
    #[serde(default)]
    pub index_command: Option<Vec<String>>,
}

fn default_documents_dir() -> PathBuf {
    get_app_data_dir()
        .map(|dir| dir.join("documents"))
        .unwrap_or_else(|_| PathBuf::from("assets"))
}

fn default_index_file() -> PathBuf {
    get_app_data_dir()
        .map(|dir| dir.join(INDEX_FILE))
        .unwrap_or_else(|_| PathBuf::from(INDEX_FILE))
}

fn default_max_document_size() -> u64 {
    DEFAULT_MAX_DOCUMENT_SIZE
}

fn default_suggestion_limit() -> usize {
    MAX_SUGGESTIONS
}

fn default_identifier_pattern() -> String {
    DEFAULT_IDENTIFIER_PATTERN.to_string()
}

fn default_include_globs() -> Vec<String> {
    DiscoveryOptions::default().include_globs
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            documents_dir: default_documents_dir(),
            index_file: default_index_file(),
            search_threads: 0,
            max_document_size: default_max_document_size(),
            suggestion_limit: default_suggestion_limit(),
            identifier_pattern: default_identifier_pattern(),
            include_globs: default_include_globs(),
            skip_dirs: Vec::new(),
            index_command: None,
        }
    }
}

impl AppConfig {
    /// Load config from the app data directory, or return default if not found
    pub fn load() -> Result<Self> {
        let config_path = get_config_path()?;

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            let config: AppConfig = serde_json::from_str(&content)
                .context("Failed to parse config file")?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Discovery rules: configured globs, built-in skip dirs plus configured ones
    pub fn discovery_options(&self) -> DiscoveryOptions {
        let mut skip_dirs: Vec<String> = DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect();
        for dir in &self.skip_dirs {
            if !skip_dirs.contains(dir) {
                skip_dirs.push(dir.clone());
            }
        }

        DiscoveryOptions {
            include_globs: self.include_globs.clone(),
            skip_dirs,
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            threads: self.search_threads,
            max_document_size: self.max_document_size,
            discovery: self.discovery_options(),
        }
    }

    /// Clamp a requested suggestion count to the configured limit
    pub fn effective_suggestion_limit(&self, requested: Option<usize>) -> usize {
        let cap = self.suggestion_limit.min(MAX_SUGGESTIONS);
        requested.map_or(cap, |n| n.min(cap))
    }

    /// The index builder selected by this configuration
    pub fn index_builder(&self) -> Result<Arc<dyn IndexBuilder>> {
        match &self.index_command {
            Some(command) => {
                let Some((program, args)) = command.split_first() else {
                    bail!("index_command must name a program");
                };
                Ok(Arc::new(CommandIndexBuilder::new(program.clone(), args.to_vec())))
            }
            None => {
                let builder = NumberIndexBuilder::new(
                    ExtractorSet::default(),
                    &self.identifier_pattern,
                    self.discovery_options(),
                )?;
                Ok(Arc::new(builder))
            }
        }
    }
}

/// Get the path to the config file
pub fn get_config_path() -> Result<PathBuf> {
    let app_dir = get_app_data_dir()?;
    Ok(app_dir.join(CONFIG_FILE))
}

/// Get the application data directory for the config and identifier snapshot
pub fn get_app_data_dir() -> Result<PathBuf> {
    let base = if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
    } else {
        // Linux/Unix: use XDG_DATA_HOME or ~/.local/share
        dirs::data_dir()
    };

    let base = base.context("Could not determine app data directory")?;
    let app_dir = base.join(APP_NAME);

    fs::create_dir_all(&app_dir)?;
    Ok(app_dir)
}

/// Per-user runtime directory for the daemon socket and pid file
fn runtime_path(extension: &str) -> PathBuf {
    let file_name = format!("{}.{}", APP_NAME, extension);

    // XDG_RUNTIME_DIR is tmpfs-backed and private to the user
    if let Ok(runtime_dir) = std::env::var("XDG_RUNTIME_DIR") {
        return PathBuf::from(runtime_dir).join(&file_name);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".local").join("run").join(&file_name);
    }

    #[cfg(unix)]
    let uid = unsafe { libc::getuid() };
    #[cfg(not(unix))]
    let uid = 0;
    PathBuf::from(format!("/tmp/{}-{}.{}", APP_NAME, uid, extension))
}

/// Get the socket path for the daemon
pub fn get_socket_path() -> PathBuf {
    runtime_path("sock")
}

/// Get the PID file path for the daemon
pub fn get_pid_path() -> PathBuf {
    runtime_path("pid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert_eq!(config.search_threads, 0);
        assert_eq!(config.suggestion_limit, 100);
        assert_eq!(config.identifier_pattern, DEFAULT_IDENTIFIER_PATTERN);
        assert!(config.index_command.is_none());
        assert!(config.index_file.ends_with(INDEX_FILE));
    }

    #[test]
    fn test_app_config_partial_json() {
        // Should use defaults for missing fields
        let json = r#"{"documents_dir": "/srv/manuals", "search_threads": 4}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.documents_dir, PathBuf::from("/srv/manuals"));
        assert_eq!(config.search_threads, 4);
        assert_eq!(config.max_document_size, DEFAULT_MAX_DOCUMENT_SIZE);
        assert_eq!(config.include_globs, vec!["*.pdf", "*.txt"]);
    }

    #[test]
    fn test_app_config_empty_json() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.suggestion_limit, MAX_SUGGESTIONS);
        assert!(config.skip_dirs.is_empty());
    }

    #[test]
    fn test_app_config_serialization() {
        let config = AppConfig {
            index_command: Some(vec!["python3".to_string(), "indexer.py".to_string()]),
            ..AppConfig::default()
        };

        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn test_discovery_options_merge_skip_dirs() {
        let config = AppConfig {
            skip_dirs: vec!["archive".to_string(), ".git".to_string()],
            ..AppConfig::default()
        };

        let options = config.discovery_options();
        assert!(options.skip_dirs.iter().any(|d| d == "node_modules"));
        assert!(options.skip_dirs.iter().any(|d| d == "archive"));
        assert_eq!(options.skip_dirs.iter().filter(|d| *d == ".git").count(), 1);
    }

    #[test]
    fn test_effective_suggestion_limit() {
        let config = AppConfig {
            suggestion_limit: 20,
            ..AppConfig::default()
        };

        assert_eq!(config.effective_suggestion_limit(None), 20);
        assert_eq!(config.effective_suggestion_limit(Some(5)), 5);
        assert_eq!(config.effective_suggestion_limit(Some(500)), 20);
    }

    #[test]
    fn test_index_builder_rejects_empty_command() {
        let config = AppConfig {
            index_command: Some(Vec::new()),
            ..AppConfig::default()
        };
        assert!(config.index_builder().is_err());
    }

    #[test]
    fn test_index_builder_rejects_bad_pattern() {
        let config = AppConfig {
            identifier_pattern: "[0-9".to_string(),
            ..AppConfig::default()
        };
        assert!(config.index_builder().is_err());
    }

    #[test]
    fn test_runtime_paths_share_directory() {
        let socket = get_socket_path();
        let pid = get_pid_path();
        assert_eq!(socket.parent(), pid.parent());
        assert_ne!(socket, pid);
    }
}
