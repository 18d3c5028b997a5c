//! Host application settings.
//!
//! ```toml
//! static_path = "static"
//! bundle_file = "bundle.js"
//! debug = false
//! prerender = true
//! render_timeout_ms = 2000
//! build_timeout_ms = 60000
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_BUNDLE_FILE: &str = "bundle.js";
pub const DEFAULT_NODE_COMMAND: &str = "node";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory the bundle is written to and served from. Required at startup.
    pub static_path: Option<PathBuf>,
    pub bundle_file: String,
    /// Non-minified bundle output.
    pub debug: bool,
    /// Render markup on the server before the client mounts the component.
    pub prerender: bool,
    /// Executable used by the Node engine.
    pub node_command: String,
    /// Limit on each call into the render context.
    pub render_timeout_ms: Option<u64>,
    /// Limit on the bundle build. Unbounded unless set.
    pub build_timeout_ms: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            static_path: None,
            bundle_file: DEFAULT_BUNDLE_FILE.to_string(),
            debug: false,
            prerender: true,
            node_command: DEFAULT_NODE_COMMAND.to_string(),
            render_timeout_ms: None,
            build_timeout_ms: None,
        }
    }
}

impl Settings {
    pub fn new(static_path: impl Into<PathBuf>) -> Self {
        Self {
            static_path: Some(static_path.into()),
            ..Self::default()
        }
    }

    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|e| Error::read(path, e))?;
        Self::from_toml_str(&source)
    }

    /// `<static_path>/<bundle_file>`, or a `Config` error when no static directory is set.
    pub fn bundle_path(&self) -> Result<PathBuf> {
        let static_path = self
            .static_path
            .as_ref()
            .ok_or_else(|| Error::Config("please define 'static_path' in settings".to_string()))?;
        if self.bundle_file.trim().is_empty() {
            return Err(Error::Config("'bundle_file' must not be empty".to_string()));
        }
        Ok(static_path.join(&self.bundle_file))
    }

    pub fn render_timeout(&self) -> Option<Duration> {
        self.render_timeout_ms.map(Duration::from_millis)
    }

    pub fn build_timeout(&self) -> Option<Duration> {
        self.build_timeout_ms.map(Duration::from_millis)
    }
}
