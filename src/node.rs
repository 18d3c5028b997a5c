//! Node.js Engine
//!
//! Runs compiled scripts in a `node` subprocess. The compiled source is kept
//! in a scratch file together with a small runner; every call starts a fresh
//! process, feeds `{entry, args}` on stdin and reads one tagged JSON result
//! back from stdout. A call can therefore never leave state behind in the
//! context, and a crashing call cannot poison the next one.

use serde_json::{json, Value};
use std::env;
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::engine::{ScriptContext, ScriptEngine, ScriptFault};
use crate::error::decode_diagnostic;
use crate::settings::{Settings, DEFAULT_NODE_COMMAND};

const RESULT_MARKER: &str = "\u{1e}__JSX_PRERENDER_RESULT__";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Appended to every compiled source. `eval` runs in the script's own scope so
/// top-level function declarations are reachable by name.
const RUNNER: &str = r#"
;(function (lookup, marker) {
  var chunks = [];
  process.stdin.on('data', function (chunk) { chunks.push(chunk); });
  process.stdin.on('end', function () {
    var out;
    try {
      var request = JSON.parse(Buffer.concat(chunks).toString('utf8'));
      var result = lookup(request.entry).apply(null, request.args);
      out = ['ok', result === undefined ? null : result];
    } catch (e) {
      out = ['err', String((e && e.stack) || e)];
    }
    process.stdout.write(marker + JSON.stringify(out));
  });
})(function (name) { return eval(name); }, "#;

#[derive(Debug, Clone)]
pub struct NodeEngine {
    program: OsString,
    current_dir: Option<PathBuf>,
    node_path: Option<OsString>,
    timeout: Option<Duration>,
}

impl Default for NodeEngine {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_COMMAND)
    }
}

impl NodeEngine {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            current_dir: None,
            node_path: None,
            timeout: None,
        }
    }

    /// Engine for the render context, bounded by `render_timeout_ms`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.node_command).timeout(settings.render_timeout())
    }

    /// Engine for the bundle build, bounded only by `build_timeout_ms`.
    pub fn for_build(settings: &Settings) -> Self {
        Self::new(&settings.node_command).timeout(settings.build_timeout())
    }

    /// Working directory for the subprocess; `node_modules` below it is used
    /// for module resolution unless `NODE_PATH` is set.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn node_path(mut self, path: impl Into<OsString>) -> Self {
        self.node_path = Some(path.into());
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn resolve_node_path(&self) -> Option<OsString> {
        if let Some(path) = &self.node_path {
            return Some(path.clone());
        }
        if let Some(existing) = env::var_os("NODE_PATH") {
            return Some(existing);
        }
        let base = match &self.current_dir {
            Some(dir) => dir.clone(),
            None => env::current_dir().ok()?,
        };
        Some(base.join("node_modules").into_os_string())
    }
}

impl ScriptEngine for NodeEngine {
    fn compile(&self, source: &str) -> Result<Box<dyn ScriptContext>, ScriptFault> {
        let mut script = tempfile::Builder::new()
            .prefix("jsx-prerender-")
            .suffix(".js")
            .tempfile()
            .map_err(|e| ScriptFault::Unavailable(format!("failed to create script file: {}", e)))?;

        let runner_tail = format!("{}{});\n", RUNNER, json!(RESULT_MARKER));
        script
            .write_all(source.as_bytes())
            .and_then(|_| script.write_all(runner_tail.as_bytes()))
            .and_then(|_| script.flush())
            .map_err(|e| ScriptFault::Unavailable(format!("failed to write script file: {}", e)))?;

        debug!("Compiled {} bytes into '{}'", source.len(), script.path().display());
        Ok(Box::new(NodeContext {
            engine: self.clone(),
            script,
        }))
    }
}

struct NodeContext {
    engine: NodeEngine,
    script: NamedTempFile,
}

impl NodeContext {
    fn spawn(&self) -> io::Result<Child> {
        let mut command = Command::new(&self.engine.program);
        command
            .arg(self.script.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &self.engine.current_dir {
            command.current_dir(dir);
        }
        if let Some(node_path) = self.engine.resolve_node_path() {
            command.env("NODE_PATH", node_path);
        }
        command.spawn()
    }
}

impl ScriptContext for NodeContext {
    fn call(&self, entry_point: &str, args: &[Value]) -> Result<Value, ScriptFault> {
        let request = json!({ "entry": entry_point, "args": args }).to_string();
        let started = Instant::now();

        let mut child = self.spawn().map_err(|e| {
            ScriptFault::Unavailable(format!(
                "failed to start '{}': {}",
                self.engine.program.to_string_lossy(),
                e
            ))
        })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(request.as_bytes()) {
                Ok(()) => {}
                // The script died during start-up; its exit status tells the story.
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Err(e) => {
                    let _ = child.kill();
                    return Err(ScriptFault::Unavailable(format!("failed to send request: {}", e)));
                }
            }
        }

        let status = wait(&mut child, self.engine.timeout)?;
        let stdout = stdout.join().unwrap_or_default();
        let stderr = stderr.join().unwrap_or_default();

        debug!("'{}' returned in {:?}", entry_point, started.elapsed());
        parse_output(status, &stdout, &stderr)
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

fn wait(child: &mut Child, timeout: Option<Duration>) -> Result<ExitStatus, ScriptFault> {
    let unavailable = |e: io::Error| ScriptFault::Unavailable(format!("failed to wait for script: {}", e));
    let Some(limit) = timeout else {
        return child.wait().map_err(unavailable);
    };

    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().map_err(unavailable)? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ScriptFault::Timeout(limit));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn parse_output(status: ExitStatus, stdout: &[u8], stderr: &[u8]) -> Result<Value, ScriptFault> {
    let stdout = String::from_utf8_lossy(stdout);
    let payload = stdout
        .rfind(RESULT_MARKER)
        .map(|at| &stdout[at + RESULT_MARKER.len()..]);

    let payload = match payload {
        Some(payload) if status.success() => payload,
        _ => {
            let mut message = decode_diagnostic(stderr);
            if message.is_empty() {
                message = format!("script runtime exited with {}", status);
            }
            return Err(ScriptFault::Runtime(message));
        }
    };

    let tagged: (String, Value) = serde_json::from_str(payload)
        .map_err(|e| ScriptFault::Runtime(format!("malformed result from script runtime: {}", e)))?;
    match tagged {
        (tag, value) if tag == "ok" => Ok(value),
        (_, Value::String(message)) => Err(ScriptFault::Runtime(message)),
        (_, other) => Err(ScriptFault::Runtime(other.to_string())),
    }
}
