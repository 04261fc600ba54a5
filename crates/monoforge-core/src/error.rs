//! Error kinds for specification loading and resolution.
//!
//! Every failure is fatal for the run. Diagnostics are a single line
//! identifying the failing phase and, for validation failures, a dotted path
//! into the input document (`services.todo.aggregates.List.children.items.fk.ref`).

use thiserror::Error;

/// Errors produced while loading or resolving a specification.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The YAML document could not be decoded into the specification shape.
    #[error("loader: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// A reference, invariant, or enumeration constraint failed.
    #[error("resolver: {path}: {message}")]
    Validation {
        /// Dotted path to the offending node in the input document.
        path: String,
        /// Human-readable description of the violated constraint.
        message: String,
    },
}

impl SpecError {
    /// Build a validation error for the document node at `path`.
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_includes_path() {
        let err = SpecError::validation("services.todo.api[0].model", "unknown model `Missing`");
        let msg = err.to_string();
        assert!(msg.starts_with("resolver: services.todo.api[0].model"));
        assert!(msg.contains("unknown model"));
    }

    #[test]
    fn test_parse_display_names_loader_phase() {
        let inner = serde_yaml::from_str::<usize>("not-a-number").unwrap_err();
        let err = SpecError::from(inner);
        assert!(err.to_string().starts_with("loader: "));
    }
}
