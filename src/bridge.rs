//! Render Bridge
//!
//! Owns the one execution context that holds the bundle plus the render shim.
//! Calls into the context are serialized behind a mutex.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::debug;

use crate::engine::{ScriptContext, ScriptEngine, ScriptFault};
use crate::error::{Error, Result};
use crate::syntax;

/// Packaged render shim, concatenated after the bundle.
pub const RENDER_SHIM: &str = include_str!("../js/render.js");

pub const RENDER_ENTRY_POINT: &str = "render_jsx";

pub struct RenderBridge {
    bundle_path: PathBuf,
    context: Mutex<Box<dyn ScriptContext>>,
}

impl std::fmt::Debug for RenderBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderBridge")
            .field("bundle_path", &self.bundle_path)
            .finish_non_exhaustive()
    }
}

impl RenderBridge {
    pub fn open(engine: &dyn ScriptEngine, bundle_path: &Path, shim_source: &str) -> Result<Self> {
        let bundle = fs::read_to_string(bundle_path).map_err(|e| Error::read(bundle_path, e))?;
        Self::from_source(engine, bundle_path, &bundle, shim_source)
    }

    /// Like [`RenderBridge::open`], but reads the shim from a file.
    pub fn open_with_shim_file(engine: &dyn ScriptEngine, bundle_path: &Path, shim_path: &Path) -> Result<Self> {
        let shim = fs::read_to_string(shim_path).map_err(|e| Error::read(shim_path, e))?;
        Self::open(engine, bundle_path, &shim)
    }

    fn from_source(engine: &dyn ScriptEngine, bundle_path: &Path, bundle: &str, shim: &str) -> Result<Self> {
        let mut source = String::with_capacity(bundle.len() + shim.len() + 1);
        source.push_str(bundle);
        source.push('\n');
        source.push_str(shim);

        let outline = syntax::outline(&source).map_err(|errors| Error::Compile(errors.join("; ")))?;
        if !outline.declares(RENDER_ENTRY_POINT) {
            return Err(Error::Compile(format!(
                "render shim does not declare '{}'",
                RENDER_ENTRY_POINT
            )));
        }

        let context = engine.compile(&source).map_err(|fault| match fault {
            ScriptFault::Compile(message) => Error::Compile(message),
            other => Error::Compile(other.to_string()),
        })?;
        debug!("Opened render context for '{}'", bundle_path.display());

        Ok(Self {
            bundle_path: bundle_path.to_path_buf(),
            context: Mutex::new(context),
        })
    }

    pub fn bundle_path(&self) -> &Path {
        &self.bundle_path
    }

    /// Renders `component_name` with `properties` to an HTML fragment.
    pub fn render(&self, component_name: &str, properties: &Map<String, Value>) -> Result<String> {
        let args = [
            Value::String(component_name.to_string()),
            Value::Object(properties.clone()),
        ];
        let started = Instant::now();
        let result = self.context.lock().call(RENDER_ENTRY_POINT, &args);
        debug!("Rendered '{}' in {:?}", component_name, started.elapsed());

        match result {
            Ok(Value::String(html)) => Ok(html),
            Ok(Value::Null) => Ok(String::new()),
            Ok(other) => Err(Error::Render(format!(
                "'{}' returned {} instead of markup",
                RENDER_ENTRY_POINT, other
            ))),
            Err(fault) => Err(Error::Render(fault.to_string())),
        }
    }
}
