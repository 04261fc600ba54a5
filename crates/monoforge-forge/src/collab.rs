//! External collaborators.
//!
//! The formatter, dependency tidy, and workspace sync are bounded
//! sub-processes outside the generation core. The pipeline talks to them
//! through [`Collaborator`]; production runs use [`ProcessCollaborators`],
//! tests use [`NoopCollaborators`].

use std::path::Path;
use std::process::Command;

use crate::error::ForgeError;

/// The post-generation tool surface the pipeline depends on.
pub trait Collaborator {
    /// Format a generated module in place. Best-effort: callers log a
    /// warning on failure instead of aborting.
    fn format(&self, dir: &Path) -> Result<(), ForgeError>;

    /// Reconcile a module's dependency manifest. Fatal on failure.
    fn tidy(&self, dir: &Path) -> Result<(), ForgeError>;

    /// Synchronize the workspace in its root. Invoked exactly once per run.
    fn work_sync(&self, root: &Path) -> Result<(), ForgeError>;
}

/// Shells out to the Go toolchain.
pub struct ProcessCollaborators;

impl ProcessCollaborators {
    fn run(name: &str, program: &str, args: &[&str], dir: &Path) -> Result<(), ForgeError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(dir)
            .output()
            .map_err(|err| ForgeError::Collaborator {
                name: name.to_string(),
                detail: err.to_string(),
            })?;
        if !output.status.success() {
            return Err(ForgeError::Collaborator {
                name: name.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Collaborator for ProcessCollaborators {
    fn format(&self, dir: &Path) -> Result<(), ForgeError> {
        Self::run("gofmt", "gofmt", &["-w", "."], dir)
    }

    fn tidy(&self, dir: &Path) -> Result<(), ForgeError> {
        Self::run("go mod tidy", "go", &["mod", "tidy"], dir)
    }

    fn work_sync(&self, root: &Path) -> Result<(), ForgeError> {
        Self::run("go work sync", "go", &["work", "sync"], root)
    }
}

/// A collaborator that does nothing; used by tests and dry runs.
pub struct NoopCollaborators;

impl Collaborator for NoopCollaborators {
    fn format(&self, _dir: &Path) -> Result<(), ForgeError> {
        Ok(())
    }

    fn tidy(&self, _dir: &Path) -> Result<(), ForgeError> {
        Ok(())
    }

    fn work_sync(&self, _root: &Path) -> Result<(), ForgeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_surfaces_collaborator_error() {
        let err = ProcessCollaborators::run(
            "definitely-missing",
            "monoforge-no-such-binary",
            &[],
            Path::new("."),
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("collaborator: definitely-missing"));
    }

    #[test]
    fn test_noop_always_succeeds() {
        let noop = NoopCollaborators;
        assert!(noop.format(Path::new("/nowhere")).is_ok());
        assert!(noop.tidy(Path::new("/nowhere")).is_ok());
        assert!(noop.work_sync(Path::new("/nowhere")).is_ok());
    }
}
