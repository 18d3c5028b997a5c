//! Component References
//!
//! A [`ComponentRef`] describes a component that lives next to the code that
//! declares it: an identifier, a file relative to its owning module, and the
//! components it depends on. [`ModuleTable`] knows where each module lives on
//! disk, which is what turns a reference into a concrete source file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRef {
    /// Component identifier inside its module, e.g. `Clock`.
    pub identifier: String,
    /// Source file, relative to the owning module's directory.
    pub file: PathBuf,
    /// Owning module, e.g. `widgets`.
    pub module: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ComponentRef>,
}

impl ComponentRef {
    pub fn new(identifier: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            identifier: identifier.into(),
            file: file.into(),
            module: None,
            dependencies: Vec::new(),
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    pub fn depends_on(mut self, dependency: ComponentRef) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// `<module>.<identifier>`
    pub fn default_name(&self) -> Result<String> {
        if self.identifier.is_empty() {
            return Err(Error::InvalidComponent(format!(
                "reference to '{}' has an empty identifier",
                self.file.display()
            )));
        }
        let module = self.owning_module()?;
        Ok(format!("{}.{}", module, self.identifier))
    }

    fn owning_module(&self) -> Result<&str> {
        match self.module.as_deref() {
            Some(module) if !module.is_empty() => Ok(module),
            _ => Err(Error::InvalidComponent(format!(
                "component '{}' does not belong to a module",
                self.identifier
            ))),
        }
    }
}

/// Module name -> directory holding its sources.
#[derive(Debug, Clone, Default)]
pub struct ModuleTable {
    dirs: HashMap<String, PathBuf>,
}

impl ModuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, module: impl Into<String>, dir: impl Into<PathBuf>) -> Option<PathBuf> {
        self.dirs.insert(module.into(), dir.into())
    }

    pub fn dir(&self, module: &str) -> Option<&Path> {
        self.dirs.get(module).map(PathBuf::as_path)
    }

    /// Resolves a reference to its source file. Existence is not checked here.
    pub fn resolve(&self, component: &ComponentRef) -> Result<PathBuf> {
        let module = component.owning_module()?;
        let dir = self.dir(module).ok_or_else(|| {
            Error::NotFound(format!(
                "module '{}' of component '{}' is not known",
                module, component.identifier
            ))
        })?;
        Ok(dir.join(&component.file))
    }
}
