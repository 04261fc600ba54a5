//! Specification loading.
//!
//! [`load`] is the only entry point: bytes in, a validated [`Spec`] out.
//! Decoding is strict and validation runs before the spec is returned, so a
//! caller never observes a partially valid specification.

use crate::error::SpecError;
use crate::resolver;
use crate::spec::Spec;

/// Decode and validate a specification document.
///
/// Pure: no I/O happens here. On any failure no spec is returned.
pub fn load(bytes: &[u8]) -> Result<Spec, SpecError> {
    let spec: Spec = serde_yaml::from_slice(bytes)?;
    resolver::validate(&spec)?;
    Ok(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
schema_version: 1
name: demo
services:
  todo:
    kind: atom
    repo_impl: sqlite
    models:
      Item:
        fields:
          text: {type: text, validations: [required]}
          done: {type: bool, default: false}
    api:
      - id: item-create
        route: POST /items
        model: Item
        op: create
"#;

    #[test]
    fn test_load_minimal_spec() {
        let spec = load(MINIMAL.as_bytes()).unwrap();
        assert_eq!(spec.sanitized_name(), "demo");
        assert_eq!(spec.services.len(), 1);
    }

    #[test]
    fn test_load_rejects_malformed_yaml() {
        let err = load(b"schema_version: [not closed").unwrap_err();
        assert!(matches!(err, SpecError::Parse(_)));
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let doc = MINIMAL.replace("kind: atom", "kind: atom\n    shiny: yes");
        let err = load(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, SpecError::Parse(_)));
    }

    #[test]
    fn test_load_runs_validation() {
        let doc = MINIMAL.replace("model: Item", "model: Ghost");
        let err = load(doc.as_bytes()).unwrap_err();
        assert!(matches!(err, SpecError::Validation { .. }));
        assert!(err.to_string().contains("unknown model `Ghost`"));
    }
}
