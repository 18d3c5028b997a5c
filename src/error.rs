//! Error Module for JSX Prerender
//!
//! Every fallible operation in the crate returns [`Error`]. Startup errors
//! (`Config`, `Build`, `Compile`) are fatal to the host; `Render` only fails
//! the page that asked for it.

use std::io;
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Required host configuration is missing or unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// Registration target does not exist, or a component reference cannot be resolved.
    #[error("component not found: {0}")]
    NotFound(String),

    /// Input is neither an existing file nor a resolvable component reference.
    #[error("invalid component: {0}")]
    InvalidComponent(String),

    /// The external build procedure reported a runtime fault.
    #[error("bundle build failed: {0}")]
    Build(String),

    /// Bundle plus render shim is not valid executable script.
    #[error("bundle failed to compile: {0}")]
    Compile(String),

    /// The execution context reported a runtime fault during a render call.
    #[error("render failed: {0}")]
    Render(String),

    #[error("settings error: {0}")]
    Settings(#[from] toml::de::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn read(path: &Path, source: io::Error) -> Self {
        Self::io(format!("failed to read '{}'", path.display()), source)
    }

    pub(crate) fn write(path: &Path, source: io::Error) -> Self {
        Self::io(format!("failed to write '{}'", path.display()), source)
    }

    pub(crate) fn missing_file(path: PathBuf) -> Self {
        Error::NotFound(format!("'{}' does not exist", path.display()))
    }
}

/// Decodes a diagnostic payload produced by an external tool.
pub(crate) fn decode_diagnostic(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim_end().to_string()
}
