use std::time::Duration;

use thiserror::Error;

/// Enumeration of ways establishing a connection can fail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectError {
    #[error("connection to {url} refused")]
    Refused { url: String },
    #[error("timed out after {timeout:?} connecting to {url}")]
    Timeout { url: String, timeout: Duration },
    #[error("connection attempt to {url} cancelled")]
    Cancelled { url: String },
}

/// Enumeration of errors returned by operations on an established connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatabaseError {
    #[error("database not connected")]
    NotConnected,
}
