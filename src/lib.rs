//! # JSX Prerender
//!
//! Server-side pre-rendering of JSX components for Rust web applications.
//!
//! ## Lifecycle
//!
//! 1. **Registration**: components are registered by file or by reference into a
//!    [`ComponentRegistry`] owned by the host. Names are unique; re-registering a
//!    name with a different file overwrites it with a warning.
//! 2. **Startup**: the registry snapshot plus the requirement list are bundled by
//!    an external build procedure into `<static_path>/<bundle_file>`, and the
//!    bundle is compiled together with the render shim into one script context.
//! 3. **Rendering**: each [`JsxModule`] call renders the component to markup in
//!    that context and appends the script that hydrates it in the browser.
//!
//! The bundle is built once per startup. Later registrations are ignored until
//! [`Prerenderer::rebuild`] runs.
//!
//! ## Collaborators
//!
//! The script runtime is reached only through [`ScriptEngine`] and
//! [`ScriptContext`]; the bundler only through [`BuildProcedure`]. The default
//! engine (feature `node`) runs scripts in a `node` subprocess.

mod app;
mod bridge;
mod bundle;
mod component;
mod engine;
mod error;
#[cfg(feature = "node")]
mod node;
mod registry;
mod settings;
mod syntax;
mod unit;

#[cfg(test)]
mod testing;
#[cfg(test)]
mod registry_tests;

pub use app::{install, Prerenderer, PrerendererBuilder, WebApplication, DEFAULT_REQUIREMENTS};
pub use bridge::{RenderBridge, RENDER_ENTRY_POINT, RENDER_SHIM};
pub use bundle::{
    compute_hash, BuildProcedure, BundleArtifact, BundleBuilder, BundleRequest, ScriptBuildProcedure,
    BUILD_ENTRY_POINT, BUILD_SCRIPT,
};
pub use component::{ComponentRef, ModuleTable};
pub use engine::{ScriptContext, ScriptEngine, ScriptFault};
pub use error::{Error, Result};
#[cfg(feature = "node")]
pub use node::NodeEngine;
pub use registry::{ComponentRegistry, Registration, COMPONENT_EXTENSIONS};
pub use settings::{Settings, DEFAULT_BUNDLE_FILE, DEFAULT_NODE_COMMAND};
pub use syntax::{outline, ScriptOutline};
pub use unit::{hydration_script, JsxModule, MarkupSource, RenderRequest, DEFAULT_TAG};
