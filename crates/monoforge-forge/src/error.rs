//! Generation-side error kinds.
//!
//! The pipeline is fail-fast: the first error of any kind ends the run. Each
//! variant's message leads with the failing phase
//! (`loader`/`resolver`/`emitter:<name>`/`assembler`/`collaborator`) so a
//! single diagnostic line tells the user where to look.

use std::path::PathBuf;

use monoforge_core::SpecError;
use thiserror::Error;

/// Errors produced while generating the workspace.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Specification loading or resolution failed; the inner error already
    /// names its phase.
    #[error(transparent)]
    Spec(#[from] SpecError),

    /// A template failed to compile or execute.
    #[error("emitter:{name}: {source}")]
    Template {
        /// Logical template name.
        name: String,
        /// The underlying engine error.
        #[source]
        source: tera::Error,
    },

    /// A file or directory operation failed.
    #[error("{phase}: {path}: {source}")]
    Io {
        /// Failing phase (`emitter:<name>` or `assembler`).
        phase: String,
        /// Path in the output tree.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An external collaborator exited non-zero; its stderr is surfaced.
    #[error("collaborator: {name}: {detail}")]
    Collaborator {
        /// Collaborator name (`gofmt`, `go mod tidy`, `go work sync`).
        name: String,
        /// Captured stderr or spawn failure.
        detail: String,
    },
}

impl ForgeError {
    /// Build an I/O error for `path` inside `phase`.
    pub fn io(phase: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            phase: phase.into(),
            path: path.into(),
            source,
        }
    }
}
