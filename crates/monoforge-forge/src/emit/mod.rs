//! Per-artifact emitters.
//!
//! Every emitter follows the same shape: shape a self-contained record from
//! the [`ServiceView`](monoforge_core::resolver::ServiceView), render one
//! template from the registry, and write the file through [`emit`]. Directory
//! creation is idempotent and files are overwritten unconditionally; the
//! generator owns its outputs.

use std::fs;
use std::path::Path;

use serde::Serialize;

use monoforge_core::resolver::FieldView;
use monoforge_core::spec::FieldType;

use crate::error::ForgeError;
use crate::registry::Registry;

pub mod deployment;
pub mod handler;
pub mod model;
pub mod mongo;
pub mod repository;
pub mod scaffold;
pub mod shared_lib;
pub mod sqlite;
pub mod validator;

/// Render `template` with `record` and write it to `path`, creating parent
/// directories as needed and overwriting any existing file.
pub fn emit<T: Serialize>(
    registry: &Registry,
    template: &str,
    path: &Path,
    record: &T,
) -> Result<(), ForgeError> {
    let rendered = registry.render(template, record)?;
    write_file(&format!("emitter:{template}"), path, rendered.as_bytes())
}

/// Write raw bytes to `path` with idempotent directory creation.
pub fn write_file(phase: &str, path: &Path, contents: &[u8]) -> Result<(), ForgeError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ForgeError::io(phase, parent, source))?;
    }
    fs::write(path, contents).map_err(|source| ForgeError::io(phase, path, source))
}

/// One struct field as templates see it.
#[derive(Serialize)]
pub(crate) struct FieldRecord {
    pub go_name: String,
    pub go_type: String,
    pub json_tag: String,
}

pub(crate) fn field_records(fields: &[FieldView]) -> Vec<FieldRecord> {
    fields
        .iter()
        .map(|f| FieldRecord {
            go_name: f.go_name.clone(),
            go_type: f.go_type.clone(),
            json_tag: f.json_tag.clone(),
        })
        .collect()
}

/// Stdlib imports a struct file needs. Every persisted entity carries
/// `time.Time` stamps; `json.RawMessage` appears only for json fields.
pub(crate) fn struct_imports(fields: &[FieldView]) -> Vec<String> {
    let mut imports = Vec::with_capacity(2);
    if fields.iter().any(|f| f.ty == FieldType::Json) {
        imports.push("encoding/json".to_string());
    }
    imports.push("time".to_string());
    imports
}
