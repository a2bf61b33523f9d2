//! Error types for the Vectorflow engine
//!
//! This module defines the error types used throughout the engine,
//! including device access, resource capacity and initialization.

use std::fmt;

/// Result type for Vectorflow engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Vectorflow engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (device creation, submission, recording)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (unallocated ring, missing texture, capacity overflow, ...)
    InvalidResource(String),

    /// Initialization failed (engine, render context, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
