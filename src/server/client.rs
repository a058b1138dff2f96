//! Client for connecting to the pagex daemon

use crate::library::{DeleteReport, LibraryEntry};
use crate::search::SearchResult;
use crate::server::protocol::{
    read_message, write_message, Request, Response, StatusResponse, SuggestResponse,
};
use crate::utils::get_socket_path;
use std::io::{BufReader, BufWriter};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Read/write timeout
const IO_TIMEOUT: Duration = Duration::from_secs(30);

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur in client operations
#[derive(Debug, Error)]
pub enum ClientError {
    /// Communication error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    /// Server returned an error
    #[error("Server error: {0}")]
    ServerError(String),
    /// Response variant did not match the request
    #[error("Invalid response from server")]
    InvalidResponse,
}

/// Client for the pagex daemon
pub struct IndexClient {
    reader: BufReader<UnixStream>,
    writer: BufWriter<UnixStream>,
}

impl IndexClient {
    /// Try to connect to the running daemon.
    /// Returns None if the daemon is not running, so callers can work in-process.
    pub fn connect() -> Option<Self> {
        Self::connect_to(&get_socket_path())
    }

    /// Connect to a daemon listening on `socket_path`
    pub fn connect_to(socket_path: &Path) -> Option<Self> {
        if !socket_path.exists() {
            return None;
        }

        let stream = UnixStream::connect(socket_path).ok()?;

        let _ = stream.set_read_timeout(Some(IO_TIMEOUT));
        let _ = stream.set_write_timeout(Some(IO_TIMEOUT));

        let reader = BufReader::new(stream.try_clone().ok()?);
        let writer = BufWriter::new(stream);

        Some(Self { reader, writer })
    }

    /// Send one request and read its response; server errors become `ServerError`
    fn call(&mut self, request: &Request) -> ClientResult<Response> {
        write_message(&mut self.writer, request)?;
        match read_message(&mut self.reader)? {
            Response::Error { message } => Err(ClientError::ServerError(message)),
            response => Ok(response),
        }
    }

    /// Search documents under `root` (the daemon's documents dir when `None`)
    pub fn search(&mut self, term: &str, root: Option<&Path>) -> ClientResult<Vec<SearchResult>> {
        let request = Request::Search {
            term: term.to_string(),
            root: root.map(Path::to_path_buf),
        };

        match self.call(&request)? {
            Response::Search(sr) => Ok(sr.results),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Ranked suggestions for `query`
    pub fn suggest(&mut self, query: &str, limit: Option<usize>) -> ClientResult<SuggestResponse> {
        let request = Request::Suggest {
            query: query.to_string(),
            limit,
        };

        match self.call(&request)? {
            Response::Suggestions(sr) => Ok(sr),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Get server status
    pub fn status(&mut self) -> ClientResult<StatusResponse> {
        match self.call(&Request::Status)? {
            Response::Status(status) => Ok(status),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Request a snapshot reload. Returns (success, entries, message).
    pub fn reload(&mut self) -> ClientResult<(bool, usize, String)> {
        match self.call(&Request::Reload)? {
            Response::Reloaded {
                success,
                entries,
                message,
            } => Ok((success, entries, message)),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Start a background rebuild
    pub fn rebuild(&mut self) -> ClientResult<()> {
        match self.call(&Request::Rebuild)? {
            Response::RebuildStarted => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    pub fn list_files(&mut self) -> ClientResult<Vec<LibraryEntry>> {
        match self.call(&Request::ListFiles)? {
            Response::Files { files } => Ok(files),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    pub fn delete_files(&mut self, names: &[String]) -> ClientResult<DeleteReport> {
        let request = Request::DeleteFiles {
            names: names.to_vec(),
        };

        match self.call(&request)? {
            Response::Deleted(report) => Ok(report),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Request graceful shutdown
    pub fn shutdown(&mut self) -> ClientResult<()> {
        match self.call(&Request::Shutdown)? {
            Response::ShuttingDown => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }

    /// Ping the server
    pub fn ping(&mut self) -> ClientResult<()> {
        match self.call(&Request::Ping)? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::InvalidResponse),
        }
    }
}
