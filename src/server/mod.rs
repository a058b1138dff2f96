//! Long-running daemon for warm suggestions and searches
//!
//! Architecture:
//! - Daemon: loads the identifier snapshot, listens on a Unix socket, handles requests
//! - Client: connects to the socket, sends requests, receives responses
//! - Fallback: if the daemon is unavailable the CLI works in-process

mod client;
pub mod daemon;
pub mod protocol;

pub use client::{ClientError, IndexClient};

use crate::utils::get_pid_path;

/// Check if the daemon is running
pub fn is_daemon_running() -> bool {
    let pid_path = get_pid_path();
    if !pid_path.exists() {
        return false;
    }

    // Read PID and check if process exists
    if let Ok(pid_str) = std::fs::read_to_string(&pid_path)
        && let Ok(pid) = pid_str.trim().parse::<i32>()
    {
        // kill(pid, 0) only checks for existence
        return unsafe { libc::kill(pid, 0) == 0 };
    }

    false
}
