//! Workspace assembly.
//!
//! Owns the module manifests and the workspace file: each service module
//! depends on the shared library through its declared module path, a
//! development run adds a relative `replace` at `../../pkg/lib/core`, and
//! the workspace file lists the shared library plus every service. The final
//! `go work sync` is delegated to the collaborator exactly once, by the
//! pipeline.

use serde::Serialize;

use monoforge_core::resolver::ServiceView;
use monoforge_core::spec::Backend;

use crate::emit::{emit, write_file};
use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

/// Relative path from a service module to the shared library.
const LIB_REPLACE: &str = "../../pkg/lib/core";

#[derive(Serialize)]
struct GoModRecord {
    module: String,
    lib_module: String,
    sqlite: bool,
    mongo: bool,
    dev: bool,
    lib_replace: &'static str,
}

#[derive(Serialize)]
struct GoWorkRecord {
    services: Vec<String>,
}

/// Copy the input specification verbatim into the layout root.
pub fn copy_spec(layout: &Layout, file_name: &str, bytes: &[u8]) -> Result<(), ForgeError> {
    write_file("assembler", &layout.spec_copy(file_name), bytes)
}

/// Emit one service's module manifest.
pub fn emit_service_module(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
    dev: bool,
) -> Result<(), ForgeError> {
    let record = GoModRecord {
        module: layout.service_module(&view.name),
        lib_module: layout.lib_module(),
        sqlite: view.uses_backend(Backend::Sqlite),
        mongo: view.uses_backend(Backend::Mongo),
        dev,
        lib_replace: LIB_REPLACE,
    };
    emit(
        registry,
        "go_mod",
        &layout.service_dir(&view.name).join("go.mod"),
        &record,
    )
}

/// Emit the workspace file listing the shared library and every service.
pub fn emit_workspace(
    registry: &Registry,
    layout: &Layout,
    views: &[ServiceView],
) -> Result<(), ForgeError> {
    let record = GoWorkRecord {
        services: views.iter().map(|v| v.name.clone()).collect(),
    };
    emit(registry, "go_work", &layout.go_work(), &record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::testutil::atom_view;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_dev_mode_adds_relative_replace() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();

        emit_service_module(&registry, &layout, &atom_view(), true).unwrap();
        let out = fs::read_to_string(tmp.path().join("services/todo/go.mod")).unwrap();
        assert!(out.contains("module example.com/todo/services/todo"));
        assert!(out.contains("example.com/todo/pkg/lib/core v0.0.0"));
        assert!(out.contains("replace example.com/todo/pkg/lib/core => ../../pkg/lib/core"));
        assert!(out.contains("modernc.org/sqlite"));
        assert!(!out.contains("mongo-driver"));
    }

    #[test]
    fn test_default_mode_has_no_replace() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();

        emit_service_module(&registry, &layout, &atom_view(), false).unwrap();
        let out = fs::read_to_string(tmp.path().join("services/todo/go.mod")).unwrap();
        assert!(!out.contains("replace "));
    }

    #[test]
    fn test_workspace_lists_lib_and_services() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();

        emit_workspace(&registry, &layout, &[atom_view()]).unwrap();
        let out = fs::read_to_string(tmp.path().join("go.work")).unwrap();
        assert!(out.contains("./pkg/lib/core"));
        assert!(out.contains("./services/todo"));
    }
}
