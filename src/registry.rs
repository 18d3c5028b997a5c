//! Registry Module for JSX Prerender
//!
//! Maps component names to absolute source files. The registry is an explicit
//! object owned by the host: it is filled before startup, snapshotted once by
//! the bundle build, and later registrations only matter for the next build.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::component::{ComponentRef, ModuleTable};
use crate::error::{Error, Result};

/// Source extensions picked up by [`ComponentRegistry::register_dir`].
pub const COMPONENT_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

/// Input accepted by [`ComponentRegistry::register`].
#[derive(Debug, Clone)]
pub enum Registration {
    File {
        path: PathBuf,
        name: Option<String>,
    },
    Reference {
        component: ComponentRef,
        name: Option<String>,
    },
}

impl Registration {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Registration::File {
            path: path.into(),
            name: None,
        }
    }

    pub fn named(self, name: impl Into<String>) -> Self {
        let name = Some(name.into());
        match self {
            Registration::File { path, .. } => Registration::File { path, name },
            Registration::Reference { component, .. } => Registration::Reference { component, name },
        }
    }
}

impl From<ComponentRef> for Registration {
    fn from(component: ComponentRef) -> Self {
        Registration::Reference {
            component,
            name: None,
        }
    }
}

impl From<PathBuf> for Registration {
    fn from(path: PathBuf) -> Self {
        Registration::file(path)
    }
}

impl From<&Path> for Registration {
    fn from(path: &Path) -> Self {
        Registration::file(path)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    components: IndexMap<String, PathBuf>,
    modules: ModuleTable,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares where the sources of `module` live, for resolving [`ComponentRef`]s.
    pub fn register_module(&mut self, module: impl Into<String>, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(Error::missing_file(dir.to_path_buf()));
        }
        self.modules.insert(module, absolute(dir)?);
        Ok(())
    }

    pub fn modules(&self) -> &ModuleTable {
        &self.modules
    }

    pub fn register(&mut self, registration: impl Into<Registration>) -> Result<()> {
        match registration.into() {
            Registration::File { path, name } => self.register_file(path, name.as_deref()),
            Registration::Reference { component, name } => {
                self.register_reference(&component, name.as_deref())
            }
        }
    }

    /// Registers a source file. Without a name the file stem is used.
    ///
    /// Re-registering a name with a different file overwrites it and logs a warning.
    pub fn register_file(&mut self, path: impl AsRef<Path>, name: Option<&str>) -> Result<()> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::missing_file(path.to_path_buf()));
        }
        let path = absolute(path)?;
        let name = match name {
            Some(name) => name.to_string(),
            None => file_stem(&path)?,
        };
        self.insert(name, path);
        Ok(())
    }

    /// Registers a component reference and, transitively, everything it depends on.
    ///
    /// The whole dependency tree is resolved before anything is inserted, so a
    /// failure leaves the registry untouched.
    pub fn register_reference(&mut self, component: &ComponentRef, name: Option<&str>) -> Result<()> {
        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        self.resolve_tree(component, name, &mut seen, &mut resolved)?;
        for (name, path) in resolved {
            self.insert(name, path);
        }
        Ok(())
    }

    fn resolve_tree(
        &self,
        component: &ComponentRef,
        name: Option<&str>,
        seen: &mut HashSet<(String, PathBuf)>,
        resolved: &mut Vec<(String, PathBuf)>,
    ) -> Result<()> {
        let name = match name {
            Some(name) => name.to_string(),
            None => component.default_name()?,
        };
        let path = self.modules.resolve(component)?;
        if !path.exists() {
            return Err(Error::missing_file(path));
        }
        let path = absolute(&path)?;
        if !seen.insert((name.clone(), path.clone())) {
            return Ok(());
        }

        match resolved.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => {
                warn_overwrite(&name, existing.as_path(), &path);
                *existing = path;
            }
            None => resolved.push((name, path)),
        }

        for dependency in &component.dependencies {
            self.resolve_tree(dependency, None, seen, resolved)?;
        }
        Ok(())
    }

    /// Registers every component source below `root`.
    ///
    /// `widgets/forms/Input.jsx` under prefix `app` becomes `app.widgets.forms.Input`.
    /// Files are visited in sorted order and registered only once the whole tree
    /// was scanned. Returns the number of files registered.
    pub fn register_dir(&mut self, root: impl AsRef<Path>, prefix: Option<&str>) -> Result<usize> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(Error::missing_file(root.to_path_buf()));
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let context = format!("failed to scan '{}'", root.display());
                match e.into_io_error() {
                    Some(source) => Error::io(context, source),
                    None => Error::InvalidComponent(context),
                }
            })?;
            let path = entry.path();
            if !path.is_file() || !has_component_extension(path) {
                continue;
            }
            found.push((dotted_name(root, path, prefix)?, absolute(path)?));
        }

        let count = found.len();
        for (name, path) in found {
            self.insert(name, path);
        }
        Ok(count)
    }

    fn insert(&mut self, name: String, path: PathBuf) {
        match self.components.get(&name) {
            Some(existing) if *existing == path => return,
            Some(existing) => warn_overwrite(&name, existing, &path),
            None => debug!("Registered component '{}' -> '{}'", name, path.display()),
        }
        self.components.insert(name, path);
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.components.get(name).map(PathBuf::as_path)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// `(path, name)` pairs in registration order, as handed to the bundle builder.
    pub fn entries(&self) -> Vec<(PathBuf, String)> {
        self.components
            .iter()
            .map(|(name, path)| (path.clone(), name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

fn warn_overwrite(name: &str, existing: &Path, path: &Path) {
    warn!(
        "Component '{}' already registered for '{}', but will be overwritten for '{}'.",
        name,
        existing.display(),
        path.display()
    );
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path)
        .map_err(|e| Error::io(format!("failed to resolve '{}'", path.display()), e))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or_else(|| Error::InvalidComponent(format!("cannot name '{}'", path.display())))
}

fn has_component_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| COMPONENT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

fn dotted_name(root: &Path, path: &Path, prefix: Option<&str>) -> Result<String> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = prefix
        .filter(|p| !p.is_empty())
        .map(|p| vec![p.to_string()])
        .unwrap_or_default();

    if let Some(parent) = relative.parent() {
        parts.extend(
            parent
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string()),
        );
    }
    parts.push(file_stem(path)?);
    Ok(parts.join("."))
}
