//! Protocol messages for client-server communication
//!
//! Uses a simple length-prefixed JSON protocol:
//! - 4 bytes (little-endian u32): message length
//! - N bytes: JSON-encoded message

use crate::library::{DeleteReport, LibraryEntry};
use crate::search::SearchResult;
use crate::suggest::Suggestion;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::PathBuf;

/// Largest message accepted from the wire
pub(crate) const MAX_MESSAGE_LEN: usize = 100 * 1024 * 1024;

/// Request from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Search every document under `root` (the documents dir when unset)
    Search {
        term: String,
        #[serde(default)]
        root: Option<PathBuf>,
    },

    /// Ranked identifier suggestions
    Suggest {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Reload the identifier snapshot from disk
    Reload,

    /// Rebuild the identifier snapshot in the background
    Rebuild,

    /// List library documents
    ListFiles,

    /// Delete library documents by name, then rebuild
    DeleteFiles { names: Vec<String> },

    /// Check server health and get stats
    Status,

    /// Graceful shutdown request
    Shutdown,

    /// Ping for connection testing
    Ping,
}

/// Response from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    /// Search results
    Search(SearchResponse),

    /// Suggestion results
    Suggestions(SuggestResponse),

    /// Reload completed
    Reloaded {
        success: bool,
        entries: usize,
        message: String,
    },

    /// A background rebuild was started
    RebuildStarted,

    /// Library listing
    Files { files: Vec<LibraryEntry> },

    /// Outcome of a delete
    Deleted(DeleteReport),

    /// Server status
    Status(StatusResponse),

    /// Shutdown acknowledged
    ShuttingDown,

    /// Pong response
    Pong,

    /// Error response
    Error { message: String },
}

/// Search results response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Time taken in milliseconds
    pub duration_ms: f64,
}

/// Suggestion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestResponse {
    pub suggestions: Vec<Suggestion>,
    pub duration_ms: f64,
    /// Whether results came from cache
    pub cached: bool,
}

/// Server status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Identifiers in the live snapshot
    pub index_entries: usize,
    /// Number of snapshot replacements since startup
    pub index_generation: u64,
    /// Whether a rebuild is running
    pub rebuilding: bool,
    pub documents_dir: PathBuf,
    /// Total queries served
    pub queries_served: u64,
    /// Suggestion cache hit rate (0.0 - 1.0)
    pub cache_hit_rate: f32,
}

/// Write a message to a stream with length prefix
pub fn write_message<W: Write>(writer: &mut W, msg: &impl Serialize) -> std::io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })?;

    if json.len() > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let len = json.len() as u32;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(&json)?;
    writer.flush()?;

    Ok(())
}

/// Read a message from a stream with length prefix
pub fn read_message<R: Read, T: for<'de> Deserialize<'de>>(reader: &mut R) -> std::io::Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_le_bytes(len_buf) as usize;

    if len > MAX_MESSAGE_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Message too large",
        ));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    serde_json::from_slice(&buf).map_err(|e| {
        std::io::Error::new(std::io::ErrorKind::InvalidData, e)
    })
}
