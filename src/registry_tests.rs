#[cfg(test)]
mod tests {
    use crate::component::ComponentRef;
    use crate::error::Error;
    use crate::registry::{ComponentRegistry, Registration};
    use crate::testing::write_file;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn abs(path: &std::path::Path) -> PathBuf {
        std::path::absolute(path).unwrap()
    }

    #[test]
    fn test_register_file_uses_stem_as_default_name() {
        let dir = TempDir::new().unwrap();
        let clock = write_file(dir.path(), "Clock.jsx", "export default () => null;");

        let mut registry = ComponentRegistry::new();
        registry.register_file(&clock, None).unwrap();

        assert_eq!(registry.get("Clock"), Some(abs(&clock).as_path()));
    }

    #[test]
    fn test_same_name_same_path_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let clock = write_file(dir.path(), "clock.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_file(&clock, Some("widgets.Clock")).unwrap();
        let before = registry.entries();
        registry.register_file(&clock, Some("widgets.Clock")).unwrap();

        assert_eq!(registry.entries(), before);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_name_different_path_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let old = write_file(dir.path(), "old/clock.jsx", "");
        let new = write_file(dir.path(), "new/clock.jsx", "");
        let other = write_file(dir.path(), "other.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_file(&old, Some("widgets.Clock")).unwrap();
        registry.register_file(&other, Some("widgets.Other")).unwrap();
        registry.register_file(&new, Some("widgets.Clock")).unwrap();

        assert_eq!(
            registry.entries(),
            vec![
                (abs(&new), "widgets.Clock".to_string()),
                (abs(&other), "widgets.Other".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_file_is_not_found_and_leaves_registry_unchanged() {
        let dir = TempDir::new().unwrap();
        let clock = write_file(dir.path(), "clock.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_file(&clock, Some("Clock")).unwrap();
        let before = registry.entries();

        let err = registry
            .register_file(dir.path().join("missing.jsx"), Some("Clock"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(registry.entries(), before);
    }

    #[test]
    fn test_registration_order_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let names = ["zeta", "alpha", "mid"];
        let paths: Vec<_> = names
            .iter()
            .map(|n| write_file(dir.path(), &format!("{}.jsx", n), ""))
            .collect();

        let build = || {
            let mut registry = ComponentRegistry::new();
            for path in &paths {
                registry.register_file(path, None).unwrap();
            }
            registry.names().map(String::from).collect::<Vec<_>>()
        };

        assert_eq!(build(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(build(), build());
    }

    #[test]
    fn test_reference_default_name_and_resolution() {
        let dir = TempDir::new().unwrap();
        let clock = write_file(dir.path(), "widgets/jsx/clock.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_module("widgets", dir.path().join("widgets")).unwrap();
        registry
            .register_reference(&ComponentRef::new("Clock", "jsx/clock.jsx").in_module("widgets"), None)
            .unwrap();

        assert_eq!(registry.get("widgets.Clock"), Some(abs(&clock).as_path()));
    }

    #[test]
    fn test_reference_with_explicit_name() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "widgets/clock.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_module("widgets", dir.path().join("widgets")).unwrap();
        registry
            .register_reference(
                &ComponentRef::new("Clock", "clock.jsx").in_module("widgets"),
                Some("Clock"),
            )
            .unwrap();

        assert!(registry.contains("Clock"));
        assert!(!registry.contains("widgets.Clock"));
    }

    #[test]
    fn test_dependencies_registered_once_per_name_at_any_depth() {
        let dir = TempDir::new().unwrap();
        for file in ["board.jsx", "row.jsx", "cell.jsx", "icon.jsx"] {
            write_file(dir.path(), &format!("games/{}", file), "");
        }
        let games = |id: &str, file: &str| ComponentRef::new(id, file).in_module("games");

        let icon = games("Icon", "icon.jsx");
        let cell = games("Cell", "cell.jsx").depends_on(icon.clone());
        let row = games("Row", "row.jsx")
            .depends_on(cell.clone())
            .depends_on(icon.clone());
        // Board -> Row -> Cell -> Icon, plus Board -> Cell and Board -> Icon directly.
        let board = games("Board", "board.jsx")
            .depends_on(row)
            .depends_on(cell)
            .depends_on(icon);

        let mut registry = ComponentRegistry::new();
        registry.register_module("games", dir.path().join("games")).unwrap();
        registry.register_reference(&board, None).unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["games.Board", "games.Row", "games.Cell", "games.Icon"]);
    }

    #[test]
    fn test_cyclic_dependencies_terminate() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "ui/a.jsx", "");
        write_file(dir.path(), "ui/b.jsx", "");

        // B depends back on A.
        let a_again = ComponentRef::new("A", "a.jsx").in_module("ui");
        let b = ComponentRef::new("B", "b.jsx").in_module("ui").depends_on(a_again);
        let a = ComponentRef::new("A", "a.jsx").in_module("ui").depends_on(b);

        let mut registry = ComponentRegistry::new();
        registry.register_module("ui", dir.path().join("ui")).unwrap();
        registry.register_reference(&a, None).unwrap();

        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unresolvable_dependency_registers_nothing() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "ui/page.jsx", "");

        let page = ComponentRef::new("Page", "page.jsx")
            .in_module("ui")
            .depends_on(ComponentRef::new("Ghost", "ghost.jsx").in_module("ui"));

        let mut registry = ComponentRegistry::new();
        registry.register_module("ui", dir.path().join("ui")).unwrap();
        let err = registry.register_reference(&page, None).unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unknown_module_is_not_found() {
        let mut registry = ComponentRegistry::new();
        let err = registry
            .register_reference(&ComponentRef::new("Clock", "clock.jsx").in_module("nowhere"), None)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_reference_without_module_is_invalid() {
        let mut registry = ComponentRegistry::new();
        let err = registry
            .register(ComponentRef::new("Clock", "clock.jsx"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidComponent(_)));
    }

    #[test]
    fn test_polymorphic_register() {
        let dir = TempDir::new().unwrap();
        let clock = write_file(dir.path(), "clock.jsx", "");
        write_file(dir.path(), "mod/timer.jsx", "");

        let mut registry = ComponentRegistry::new();
        registry.register_module("mod", dir.path().join("mod")).unwrap();
        registry.register(clock.as_path()).unwrap();
        registry
            .register(Registration::file(&clock).named("widgets.Clock"))
            .unwrap();
        registry
            .register(ComponentRef::new("Timer", "timer.jsx").in_module("mod"))
            .unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["clock", "widgets.Clock", "mod.Timer"]);
    }

    #[test]
    fn test_register_dir_uses_dotted_relative_names() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "widgets/Clock.jsx", "");
        write_file(dir.path(), "widgets/forms/Input.tsx", "");
        write_file(dir.path(), "Layout.js", "");
        write_file(dir.path(), "README.md", "");

        let mut registry = ComponentRegistry::new();
        let count = registry.register_dir(dir.path(), Some("app")).unwrap();

        assert_eq!(count, 3);
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["app.Layout", "app.widgets.Clock", "app.widgets.forms.Input"]);
    }

    #[test]
    fn test_register_dir_missing_root() {
        let dir = TempDir::new().unwrap();
        let mut registry = ComponentRegistry::new();
        let err = registry.register_dir(dir.path().join("nope"), None).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_dependency_name_collision_takes_latest_file() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "ui/page.jsx", "");
        write_file(dir.path(), "ui/icon.jsx", "");
        let themed = write_file(dir.path(), "ui/themed/icon.jsx", "");

        let page = ComponentRef::new("Page", "page.jsx")
            .in_module("ui")
            .depends_on(ComponentRef::new("Icon", "icon.jsx").in_module("ui"))
            .depends_on(ComponentRef::new("Icon", "themed/icon.jsx").in_module("ui"));

        let mut registry = ComponentRegistry::new();
        registry.register_module("ui", dir.path().join("ui")).unwrap();
        registry.register_reference(&page, None).unwrap();

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["ui.Page", "ui.Icon"]);
        assert_eq!(registry.get("ui.Icon"), Some(abs(&themed).as_path()));
    }

    #[test]
    fn test_alternating_files_under_one_name_terminate() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "ui/a.jsx", "");
        let other = write_file(dir.path(), "ui/other/a.jsx", "");

        let a_back = ComponentRef::new("A", "a.jsx").in_module("ui");
        let a_other = ComponentRef::new("A", "other/a.jsx").in_module("ui").depends_on(a_back);
        let a = ComponentRef::new("A", "a.jsx").in_module("ui").depends_on(a_other);

        let mut registry = ComponentRegistry::new();
        registry.register_module("ui", dir.path().join("ui")).unwrap();
        registry.register_reference(&a, None).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("ui.A"), Some(abs(&other).as_path()));
    }

    #[cfg(unix)]
    #[test]
    fn test_register_dir_failure_registers_nothing() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "widgets/Clock.jsx", "");
        std::os::unix::fs::symlink(dir.path().join("gone.jsx"), dir.path().join("widgets/Zed.jsx")).unwrap();

        let mut registry = ComponentRegistry::new();
        assert!(registry.register_dir(dir.path(), None).is_err());
        assert!(registry.is_empty());
    }
}
