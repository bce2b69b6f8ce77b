//! Error types for the VNC server library.

use std::io;
use thiserror::Error;

/// Result type for VNC operations.
pub type Result<T> = std::result::Result<T, VncError>;

/// Errors that can occur in VNC server operations.
#[derive(Debug, Error)]
pub enum VncError {
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// VNC protocol error.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Authentication failed.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Invalid pixel format.
    #[error("Invalid pixel format")]
    InvalidPixelFormat,

    /// Encoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Invalid operation or state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// A configured resource limit was exceeded (e.g. an oversized cut-text
    /// payload, or too many rectangles queued for a single update).
    #[error("Resource limit exceeded: {0}")]
    ResourceLimit(String),

    /// The client is in a state where the attempted operation is not
    /// meaningful (e.g. a `FramebufferUpdateRequest` before `ClientInit`).
    #[error("Unexpected client state: {0}")]
    UnexpectedState(String),
}
