//! Error types for netconverge

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetconvergeError {
    /// Listing network devices or reading a hardware address failed
    #[error("Device enumeration failed at {}: {source}", path.display())]
    DeviceEnumeration { path: PathBuf, source: io::Error },
    /// Configuration could not be rendered
    #[error("Render error: {0}")]
    Render(String),
    /// Writing a configuration file failed
    #[error("Failed to write {}: {source}", path.display())]
    FileWrite { path: PathBuf, source: io::Error },
    /// Command execution failed
    #[error("Command '{cmd}' failed{}: {stderr}", code.map(|c| format!(" with code {}", c)).unwrap_or_default())]
    CommandFailed { cmd: String, code: Option<i32>, stderr: String },
    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Parse error
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A failure wrapped with the action that was being performed
    #[error("{action}: {source}")]
    Context {
        action: String,
        source: Box<NetconvergeError>,
    },
}

impl From<serde_json::Error> for NetconvergeError {
    fn from(error: serde_json::Error) -> Self {
        NetconvergeError::ParseError(error.to_string())
    }
}

impl NetconvergeError {
    /// Innermost error, skipping any `Context` layers
    pub fn root_cause(&self) -> &NetconvergeError {
        match self {
            NetconvergeError::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Attach the action being performed to an error
pub trait ResultExt<T> {
    fn context<S: Into<String>>(self, action: S) -> NetconvergeResult<T>;
}

impl<T, E: Into<NetconvergeError>> ResultExt<T> for Result<T, E> {
    fn context<S: Into<String>>(self, action: S) -> NetconvergeResult<T> {
        self.map_err(|e| NetconvergeError::Context {
            action: action.into(),
            source: Box::new(e.into()),
        })
    }
}

pub type NetconvergeResult<T> = Result<T, NetconvergeError>;
