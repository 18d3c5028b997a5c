//! Bundle Module for JSX Prerender
//!
//! Hands the registry snapshot to an external build procedure that writes one
//! script file exposing every component and requirement by name. The build
//! always targets a scratch file next to the output and is renamed into place
//! only on success, so a failed build never clobbers the last good bundle.

use serde::Serialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::{ScriptEngine, ScriptFault};
use crate::error::{Error, Result};

/// Packaged build script. Exposes `make_bundle(output, requires, files, debug)`.
pub const BUILD_SCRIPT: &str = include_str!("../js/build.js");

pub const BUILD_ENTRY_POINT: &str = "make_bundle";

/// Everything the external build procedure receives.
#[derive(Debug, Clone, Copy)]
pub struct BundleRequest<'a> {
    pub output_path: &'a Path,
    pub requirements: &'a [String],
    pub registrations: &'a [(PathBuf, String)],
    pub debug: bool,
}

impl BundleRequest<'_> {
    /// Arguments in the order `make_bundle` takes them.
    pub fn to_args(&self) -> Vec<Value> {
        let files: Vec<Value> = self
            .registrations
            .iter()
            .map(|(path, name)| json!([path.to_string_lossy(), name]))
            .collect();
        vec![
            json!(self.output_path.to_string_lossy()),
            json!(self.requirements),
            Value::Array(files),
            json!(self.debug),
        ]
    }

    /// Hash of the inputs that determine the bundle's content. The output path
    /// is deliberately left out.
    pub fn fingerprint(&self) -> String {
        let args = self.to_args();
        compute_hash(Value::Array(args[1..].to_vec()).to_string().as_bytes())
    }
}

pub trait BuildProcedure: Send + Sync {
    fn make_bundle(&self, request: &BundleRequest<'_>) -> Result<(), ScriptFault>;
}

/// Runs a build script in a [`ScriptEngine`], calling its `make_bundle` entry point.
pub struct ScriptBuildProcedure {
    engine: Arc<dyn ScriptEngine>,
    source: String,
}

impl ScriptBuildProcedure {
    pub fn new(engine: Arc<dyn ScriptEngine>) -> Self {
        Self::with_source(engine, BUILD_SCRIPT)
    }

    pub fn with_source(engine: Arc<dyn ScriptEngine>, source: impl Into<String>) -> Self {
        Self {
            engine,
            source: source.into(),
        }
    }
}

impl BuildProcedure for ScriptBuildProcedure {
    fn make_bundle(&self, request: &BundleRequest<'_>) -> Result<(), ScriptFault> {
        let ctx = self.engine.compile(&self.source)?;
        ctx.call(BUILD_ENTRY_POINT, &request.to_args()).map(|_| ())
    }
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleArtifact {
    pub path: PathBuf,
    /// sha256 of the bundle file.
    pub digest: String,
    /// sha256 of the build inputs.
    pub fingerprint: String,
    pub requirements: Vec<String>,
    pub components: Vec<String>,
    pub debug: bool,
}

impl BundleArtifact {
    /// Every name the bundle makes importable.
    pub fn importable_names(&self) -> impl Iterator<Item = &str> {
        self.requirements
            .iter()
            .chain(self.components.iter())
            .map(String::as_str)
    }
}

#[derive(Clone)]
pub struct BundleBuilder {
    procedure: Arc<dyn BuildProcedure>,
}

impl BundleBuilder {
    pub fn new(procedure: Arc<dyn BuildProcedure>) -> Self {
        Self { procedure }
    }

    pub fn script(engine: Arc<dyn ScriptEngine>) -> Self {
        Self::new(Arc::new(ScriptBuildProcedure::new(engine)))
    }

    pub fn build(
        &self,
        output_path: &Path,
        requirements: &[String],
        registrations: &[(PathBuf, String)],
        debug: bool,
    ) -> Result<BundleArtifact> {
        let dir = match output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let scratch = tempfile::Builder::new()
            .prefix(".bundle-")
            .suffix(".js")
            .tempfile_in(dir)
            .map_err(|e| Error::write(output_path, e))?;

        let request = BundleRequest {
            output_path: scratch.path(),
            requirements,
            registrations,
            debug,
        };
        debug!(
            "Building '{}' from {} components and {} requirements",
            output_path.display(),
            registrations.len(),
            requirements.len()
        );
        self.procedure.make_bundle(&request).map_err(build_error)?;

        let content = fs::read(scratch.path()).map_err(|e| Error::read(scratch.path(), e))?;
        if content.is_empty() {
            return Err(Error::Build("build procedure produced an empty bundle".to_string()));
        }
        let fingerprint = request.fingerprint();

        if let Some(permissions) = output_permissions(output_path) {
            fs::set_permissions(scratch.path(), permissions).map_err(|e| Error::write(output_path, e))?;
        }
        scratch
            .persist(output_path)
            .map_err(|e| Error::write(output_path, e.error))?;
        info!("Rebuilt: '{}'.", output_path.display());

        Ok(BundleArtifact {
            path: output_path.to_path_buf(),
            digest: compute_hash(&content),
            fingerprint,
            requirements: requirements.to_vec(),
            components: registrations.iter().map(|(_, name)| name.clone()).collect(),
            debug,
        })
    }
}

/// Mode the renamed bundle should carry: that of the bundle it replaces, or
/// world-readable when there is none. Scratch files start out owner-only.
fn output_permissions(output_path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(output_path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn build_error(fault: ScriptFault) -> Error {
    match fault {
        ScriptFault::Runtime(message) | ScriptFault::Compile(message) => Error::Build(message),
        ScriptFault::Timeout(_) => Error::Build(fault.to_string()),
        ScriptFault::Unavailable(message) => {
            Error::io("build procedure unavailable", io::Error::other(message))
        }
    }
}

pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
