//! Shared-library emission.
//!
//! A small public library at `pkg/lib/core` gives every generated service
//! its logging, response envelopes, validation error types, lifecycle
//! helpers, and hypermedia links. It is deliberately a standalone module so
//! the generated code's lifetime is decoupled from the generator's.

use serde::Serialize;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;

#[derive(Serialize)]
struct LibModRecord {
    lib_module: String,
}

/// Emit the shared library once per run.
pub fn emit_shared_lib(registry: &Registry, layout: &Layout) -> Result<(), ForgeError> {
    let dir = layout.lib_dir();
    let empty = serde_json::json!({});
    emit(registry, "core_lib:logger", &dir.join("logger.go"), &empty)?;
    emit(registry, "core_lib:responses", &dir.join("responses.go"), &empty)?;
    emit(registry, "core_lib:validation", &dir.join("validation.go"), &empty)?;
    emit(registry, "core_lib:lifecycle", &dir.join("lifecycle.go"), &empty)?;
    emit(registry, "core_lib:links", &dir.join("links.go"), &empty)?;
    let record = LibModRecord {
        lib_module: layout.lib_module(),
    };
    emit(registry, "core_lib:go_mod", &dir.join("go.mod"), &record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_shared_lib_tree() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/demo");
        let registry = Registry::new().unwrap();
        emit_shared_lib(&registry, &layout).unwrap();

        let lib = tmp.path().join("pkg/lib/core");
        for file in ["logger.go", "responses.go", "validation.go", "lifecycle.go", "links.go"] {
            assert!(lib.join(file).exists(), "missing {file}");
        }
        let go_mod = fs::read_to_string(lib.join("go.mod")).unwrap();
        assert!(go_mod.contains("module example.com/demo/pkg/lib/core"));

        let lifecycle = fs::read_to_string(lib.join("lifecycle.go")).unwrap();
        assert!(lifecycle.contains("ErrConcurrentModification"));
        assert!(lifecycle.contains("func Actor(ctx context.Context) string"));
    }
}
