//! In-process stand-ins for the script runtime and the bundler.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::bundle::{BuildProcedure, BundleRequest};
use crate::engine::{ScriptContext, ScriptEngine, ScriptFault};
use crate::error::decode_diagnostic;

pub const TEST_SHIM: &str = "function render_jsx(name, props) { return ''; }\n";

pub const BROKEN_COMPONENT: &str = "broken";

pub fn write_file(dir: &Path, relative: &str, content: &str) -> PathBuf {
    let path = dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn module_key(name: &str) -> String {
    format!("modules[{}]", json!(name))
}

/// Writes a plain script with one `modules[...]` line per importable name.
#[derive(Default)]
pub struct FakeBuild {
    pub fail_with: Mutex<Option<Vec<u8>>>,
    pub builds: Mutex<Vec<Vec<(PathBuf, String)>>>,
}

impl FakeBuild {
    pub fn failing(diagnostic: &[u8]) -> Self {
        let build = Self::default();
        *build.fail_with.lock() = Some(diagnostic.to_vec());
        build
    }

    pub fn set_failure(&self, diagnostic: Option<&[u8]>) {
        *self.fail_with.lock() = diagnostic.map(<[u8]>::to_vec);
    }

    pub fn build_count(&self) -> usize {
        self.builds.lock().len()
    }
}

impl BuildProcedure for FakeBuild {
    fn make_bundle(&self, request: &BundleRequest<'_>) -> Result<(), ScriptFault> {
        if let Some(diagnostic) = self.fail_with.lock().as_ref() {
            return Err(ScriptFault::Runtime(decode_diagnostic(diagnostic)));
        }
        self.builds.lock().push(request.registrations.to_vec());

        let mut out = String::from("var modules = {};\n");
        for name in request.requirements {
            out.push_str(&format!("{} = {{}};\n", module_key(name)));
        }
        for (path, name) in request.registrations {
            out.push_str(&format!("{} = {};\n", module_key(name), json!(path.to_string_lossy())));
        }
        if request.debug {
            out.push_str("// debug build\n");
        }
        fs::write(request.output_path, out).map_err(|e| ScriptFault::Runtime(e.to_string()))
    }
}

/// Renders `<p>{name}</p>` for every component the compiled bundle knows.
#[derive(Default)]
pub struct FakeEngine {
    pub compiles: AtomicUsize,
}

impl FakeEngine {
    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl ScriptEngine for FakeEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn ScriptContext>, ScriptFault> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            source: source.to_string(),
        }))
    }
}

struct FakeContext {
    source: String,
}

impl ScriptContext for FakeContext {
    fn call(&self, entry_point: &str, args: &[Value]) -> Result<Value, ScriptFault> {
        if entry_point != "render_jsx" {
            return Err(ScriptFault::Runtime(format!("{} is not defined", entry_point)));
        }
        let name = args.first().and_then(Value::as_str).unwrap_or_default();
        if name == BROKEN_COMPONENT {
            return Err(ScriptFault::Runtime(decode_diagnostic(b"component exploded")));
        }
        if !self.source.contains(&module_key(name)) {
            return Err(ScriptFault::Runtime(format!("Cannot find module '{}'", name)));
        }
        let text = args
            .get(1)
            .and_then(|props| props.get("text"))
            .and_then(Value::as_str)
            .unwrap_or(name);
        Ok(Value::String(format!("<p>{}</p>", text)))
    }
}
