//! Error types for NAS Linux IP operations.
//!
//! All errors implement `std::error::Error` via `thiserror`. A command that
//! runs but exits non-zero is usually *not* an error: operations report it as
//! `Ok(false)`. `CommandFailed` exists for callers that want to propagate it.

use std::io;
use thiserror::Error;

/// Result type alias for NAS Linux IP operations.
pub type NasResult<T> = Result<T, NasError>;

/// Errors that can occur while driving the Linux networking CLIs.
#[derive(Debug, Error)]
pub enum NasError {
    /// Failed to spawn a command (binary missing, permission denied, ...).
    #[error("Failed to execute command '{command}': {source}")]
    Spawn {
        /// The argument vector, space joined.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Command returned a non-zero exit code.
    #[error("Command failed: '{command}' (exit code {exit_code}): {output}")]
    CommandFailed {
        /// The argument vector, space joined.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined output lines.
        output: String,
    },

    /// A caller supplied a value that cannot be turned into a command.
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument {
        /// The offending parameter.
        field: String,
        /// Error message.
        message: String,
    },

    /// An observed-state event lacks a required attribute.
    #[error("Event attribute '{name}' missing")]
    MissingAttribute {
        /// The attribute path.
        name: String,
    },

    /// An observed-state event carries an attribute of the wrong shape.
    #[error("Event attribute '{name}' malformed: {message}")]
    BadAttribute {
        /// The attribute path.
        name: String,
        /// Error message.
        message: String,
    },

    /// Event bus connection or subscription failure.
    #[error("Event bus error: {message}")]
    EventBus {
        /// Error message.
        message: String,
    },

    /// Configuration file or validation error.
    #[error("Configuration error: {message}")]
    Config {
        /// Error message.
        message: String,
    },

    /// IO error outside of command spawning (sysfs reads, config files).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl NasError {
    /// Creates an invalid argument error.
    pub fn invalid_argument(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a missing attribute error.
    pub fn missing_attribute(name: impl Into<String>) -> Self {
        Self::MissingAttribute { name: name.into() }
    }

    /// Creates a malformed attribute error.
    pub fn bad_attribute(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadAttribute {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates an event bus error.
    pub fn event_bus(message: impl Into<String>) -> Self {
        Self::EventBus {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
