//! Embedding Facade
//!
//! Wires the registry, bundle builder and render bridge into a host web
//! application. Startup runs to completion before the host serves anything:
//!
//! 1. check the host settings (a static directory is mandatory)
//! 2. resolve `<static_path>/<bundle_file>`
//! 3. build the bundle from the registry snapshot
//! 4. open the render context on the fresh bundle
//! 5. register the [`JsxModule`] with the host under [`JsxModule::NAME`]
//!
//! Registrations made after startup are picked up only by [`Prerenderer::rebuild`].

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::bridge::{RenderBridge, RENDER_SHIM};
use crate::bundle::{BuildProcedure, BundleArtifact, BundleBuilder, ScriptBuildProcedure};
use crate::engine::ScriptEngine;
use crate::error::{Error, Result};
use crate::registry::ComponentRegistry;
use crate::settings::Settings;
use crate::unit::{JsxModule, MarkupSource};

/// Modules bundled regardless of registrations.
pub const DEFAULT_REQUIREMENTS: &[&str] = &["react", "react-dom/server", "react-dom/client"];

/// What the facade needs from a host web application.
pub trait WebApplication {
    fn settings(&self) -> &Settings;

    /// Makes `module` callable from page templates as `name`.
    fn register_ui_module(&mut self, name: &str, module: JsxModule);
}

/// Runs startup against `app`, using the host's settings and default collaborators.
pub fn install<A: WebApplication + ?Sized>(app: &mut A, registry: &ComponentRegistry) -> Result<Arc<Prerenderer>> {
    Prerenderer::builder(app.settings().clone()).install(app, registry)
}

pub struct PrerendererBuilder {
    settings: Settings,
    requirements: Vec<String>,
    engine: Option<Arc<dyn ScriptEngine>>,
    build_engine: Option<Arc<dyn ScriptEngine>>,
    procedure: Option<Arc<dyn BuildProcedure>>,
    shim: String,
}

impl PrerendererBuilder {
    pub fn requirements<I, S>(mut self, requirements: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requirements = requirements.into_iter().map(Into::into).collect();
        self
    }

    pub fn engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Engine the packaged build script runs in. Defaults to the render engine
    /// when one was given, otherwise a Node engine bounded by `build_timeout_ms`.
    pub fn build_engine(mut self, engine: Arc<dyn ScriptEngine>) -> Self {
        self.build_engine = Some(engine);
        self
    }

    /// Overrides the build procedure. Defaults to the packaged build script
    /// running in the build engine.
    pub fn build_procedure(mut self, procedure: Arc<dyn BuildProcedure>) -> Self {
        self.procedure = Some(procedure);
        self
    }

    pub fn shim(mut self, source: impl Into<String>) -> Self {
        self.shim = source.into();
        self
    }

    pub fn start(self, registry: &ComponentRegistry) -> Result<Arc<Prerenderer>> {
        let bundle_path = self.settings.bundle_path()?;
        let procedure: Arc<dyn BuildProcedure> = match (self.procedure, self.build_engine, &self.engine) {
            (Some(procedure), _, _) => procedure,
            (None, Some(build_engine), _) => Arc::new(ScriptBuildProcedure::new(build_engine)),
            (None, None, Some(engine)) => Arc::new(ScriptBuildProcedure::new(engine.clone())),
            (None, None, None) => Arc::new(ScriptBuildProcedure::new(default_build_engine(&self.settings)?)),
        };
        let engine = match self.engine {
            Some(engine) => engine,
            None => default_engine(&self.settings)?,
        };

        let prerenderer = Prerenderer {
            builder: BundleBuilder::new(procedure),
            live: RwLock::new(None),
            rebuilding: Mutex::new(()),
            settings: self.settings,
            requirements: self.requirements,
            engine,
            shim: self.shim,
            bundle_path,
        };
        let live = prerenderer.assemble(registry)?;
        *prerenderer.live.write() = Some(live);
        Ok(Arc::new(prerenderer))
    }

    pub fn install<A: WebApplication + ?Sized>(
        self,
        app: &mut A,
        registry: &ComponentRegistry,
    ) -> Result<Arc<Prerenderer>> {
        let prerenderer = self.start(registry)?;
        app.register_ui_module(JsxModule::NAME, prerenderer.module());
        Ok(prerenderer)
    }
}

#[cfg(feature = "node")]
fn default_engine(settings: &Settings) -> Result<Arc<dyn ScriptEngine>> {
    Ok(Arc::new(crate::node::NodeEngine::from_settings(settings)))
}

#[cfg(feature = "node")]
fn default_build_engine(settings: &Settings) -> Result<Arc<dyn ScriptEngine>> {
    Ok(Arc::new(crate::node::NodeEngine::for_build(settings)))
}

#[cfg(not(feature = "node"))]
fn default_engine(_settings: &Settings) -> Result<Arc<dyn ScriptEngine>> {
    Err(no_engine())
}

#[cfg(not(feature = "node"))]
fn default_build_engine(_settings: &Settings) -> Result<Arc<dyn ScriptEngine>> {
    Err(no_engine())
}

#[cfg(not(feature = "node"))]
fn no_engine() -> Error {
    Error::Config("no script engine configured; enable the `node` feature or pass one explicitly".to_string())
}

struct Live {
    bridge: Arc<RenderBridge>,
    artifact: BundleArtifact,
}

pub struct Prerenderer {
    settings: Settings,
    requirements: Vec<String>,
    bundle_path: PathBuf,
    builder: BundleBuilder,
    engine: Arc<dyn ScriptEngine>,
    shim: String,
    live: RwLock<Option<Live>>,
    rebuilding: Mutex<()>,
}

impl std::fmt::Debug for Prerenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prerenderer")
            .field("bundle_path", &self.bundle_path)
            .field("requirements", &self.requirements)
            .field("prerender", &self.settings.prerender)
            .finish_non_exhaustive()
    }
}

impl Prerenderer {
    pub fn builder(settings: Settings) -> PrerendererBuilder {
        PrerendererBuilder {
            settings,
            requirements: DEFAULT_REQUIREMENTS.iter().map(|s| s.to_string()).collect(),
            engine: None,
            build_engine: None,
            procedure: None,
            shim: RENDER_SHIM.to_string(),
        }
    }

    fn assemble(&self, registry: &ComponentRegistry) -> Result<Live> {
        let artifact = self.builder.build(
            &self.bundle_path,
            &self.requirements,
            &registry.entries(),
            self.settings.debug,
        )?;
        let bridge = RenderBridge::open(self.engine.as_ref(), &artifact.path, &self.shim)?;
        Ok(Live {
            bridge: Arc::new(bridge),
            artifact,
        })
    }

    /// Rebuilds the bundle from `registry` and swaps in a fresh render context.
    ///
    /// On failure the error is returned and the previous context keeps serving.
    /// Renders already in flight finish on the context they started with.
    pub fn rebuild(&self, registry: &ComponentRegistry) -> Result<BundleArtifact> {
        let _guard = self.rebuilding.lock();
        match self.assemble(registry) {
            Ok(live) => {
                let artifact = live.artifact.clone();
                *self.live.write() = Some(live);
                info!("Render context reloaded from '{}'.", self.bundle_path.display());
                Ok(artifact)
            }
            Err(e) => {
                warn!("Rebuild failed, keeping the previous render context: {}", e);
                Err(e)
            }
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }

    pub fn bundle_path(&self) -> &std::path::Path {
        &self.bundle_path
    }

    /// The artifact the current render context was opened on.
    pub fn artifact(&self) -> Result<BundleArtifact> {
        self.live
            .read()
            .as_ref()
            .map(|live| live.artifact.clone())
            .ok_or_else(not_open)
    }

    pub fn render(&self, component: &str, properties: &Map<String, Value>) -> Result<String> {
        let bridge = self
            .live
            .read()
            .as_ref()
            .map(|live| live.bridge.clone())
            .ok_or_else(not_open)?;
        bridge.render(component, properties)
    }

    pub fn module(self: &Arc<Self>) -> JsxModule {
        JsxModule::new(self.clone())
    }
}

fn not_open() -> Error {
    Error::Render("render context is not open".to_string())
}

impl MarkupSource for Prerenderer {
    fn prerender(&self) -> bool {
        self.settings.prerender
    }

    fn render_markup(&self, component: &str, properties: &Map<String, Value>) -> Result<String> {
        self.render(component, properties)
    }
}
