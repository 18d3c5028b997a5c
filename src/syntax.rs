//! Syntax Module for JSX Prerender
//!
//! Parses a classic (non-module) script in process with Oxc so that a broken
//! bundle or shim is reported at startup rather than on the first render.

use oxc_allocator::Allocator;
use oxc_ast::ast::{BindingPattern, Statement};
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::BTreeSet;

/// Top-level bindings of a script that parsed cleanly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptOutline {
    pub functions: BTreeSet<String>,
    pub variables: BTreeSet<String>,
}

impl ScriptOutline {
    /// True when `name` is callable from the top level, either as a function
    /// declaration or a variable it might be assigned to.
    pub fn declares(&self, name: &str) -> bool {
        self.functions.contains(name) || self.variables.contains(name)
    }
}

/// Parses `source` as a script. Returns the parser diagnostics on failure.
pub fn outline(source: &str) -> Result<ScriptOutline, Vec<String>> {
    let allocator = Allocator::default();
    let source_type = SourceType::default().with_module(false);
    let ret = Parser::new(&allocator, source, source_type).parse();

    if ret.panicked || !ret.errors.is_empty() {
        let mut errors: Vec<String> = ret.errors.iter().map(|e| e.to_string()).collect();
        if errors.is_empty() {
            errors.push("parser aborted".to_string());
        }
        return Err(errors);
    }

    let mut outline = ScriptOutline::default();
    for stmt in &ret.program.body {
        match stmt {
            Statement::FunctionDeclaration(func_decl) => {
                if let Some(id) = &func_decl.id {
                    outline.functions.insert(id.name.to_string());
                }
            }
            Statement::VariableDeclaration(var_decl) => {
                for decl in &var_decl.declarations {
                    if let BindingPattern::BindingIdentifier(id) = &decl.id {
                        outline.variables.insert(id.name.to_string());
                    }
                }
            }
            _ => {}
        }
    }

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outline_functions_and_vars() {
        let src = "var React = {};\nfunction render_jsx(name, props) { return ''; }\nlet x = 1;";
        let outline = outline(src).unwrap();
        assert!(outline.functions.contains("render_jsx"));
        assert!(outline.variables.contains("React"));
        assert!(outline.declares("x"));
        assert!(!outline.declares("missing"));
    }

    #[test]
    fn test_nested_functions_are_not_top_level() {
        let outline = outline("(function () { function inner() {} })();").unwrap();
        assert!(!outline.declares("inner"));
    }

    #[test]
    fn test_syntax_error() {
        let errors = outline("function broken( {").unwrap_err();
        assert!(!errors.is_empty());
    }
}
