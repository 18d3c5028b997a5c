//! Script Engine Interface
//!
//! The embedded script runtime is a black box behind two traits: an engine
//! compiles source into a context, and a context calls named entry points
//! with JSON arguments. Faults come back structured, never as raw bytes.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptFault {
    /// Source was rejected before anything ran.
    Compile(String),
    /// The script threw, or the runtime exited abnormally.
    Runtime(String),
    /// The call did not finish within its time budget.
    Timeout(Duration),
    /// The runtime itself could not be reached (missing binary, pipe failure).
    Unavailable(String),
}

impl fmt::Display for ScriptFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptFault::Compile(msg) => write!(f, "compile error: {}", msg),
            ScriptFault::Runtime(msg) => write!(f, "{}", msg),
            ScriptFault::Timeout(limit) => write!(f, "timed out after {:?}", limit),
            ScriptFault::Unavailable(msg) => write!(f, "script runtime unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ScriptFault {}

pub trait ScriptEngine: Send + Sync {
    fn compile(&self, source: &str) -> Result<Box<dyn ScriptContext>, ScriptFault>;
}

/// A compiled script. Calls must not leave persistent side effects behind.
pub trait ScriptContext: Send {
    fn call(&self, entry_point: &str, args: &[Value]) -> Result<Value, ScriptFault>;
}
