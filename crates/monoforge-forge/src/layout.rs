//! Output-tree layout.
//!
//! The layout is the single owner of every generated path and module name:
//! emitters ask it where files go and what the module imports are, and never
//! compute paths themselves.

use std::path::{Path, PathBuf};

use monoforge_core::spec::Backend;

/// Computed locations and module paths for one generation run.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    module_root: String,
}

impl Layout {
    /// A layout rooted at `root` with the given module-path prefix.
    pub fn new(root: impl Into<PathBuf>, module_root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            module_root: module_root.into(),
        }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The module-path prefix shared by every generated module.
    pub fn module_root(&self) -> &str {
        &self.module_root
    }

    /// Where the verbatim spec copy lands.
    pub fn spec_copy(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Module path of the shared library.
    pub fn lib_module(&self) -> String {
        format!("{}/pkg/lib/core", self.module_root)
    }

    /// Directory of the shared library.
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("pkg").join("lib").join("core")
    }

    /// Module path of one service.
    pub fn service_module(&self, service: &str) -> String {
        format!("{}/services/{}", self.module_root, service)
    }

    /// Root directory of one service.
    pub fn service_dir(&self, service: &str) -> PathBuf {
        self.root.join("services").join(service)
    }

    /// The `internal/<service>` tree holding models, handlers, validators.
    pub fn service_internal_dir(&self, service: &str) -> PathBuf {
        self.service_dir(service).join("internal").join(service)
    }

    /// Import path of the `internal/<service>` package.
    pub fn service_import(&self, service: &str) -> String {
        format!("{}/internal/{}", self.service_module(service), service)
    }

    /// The `internal/<backend>` adapter tree.
    pub fn backend_dir(&self, service: &str, backend: Backend) -> PathBuf {
        self.service_dir(service).join("internal").join(backend.as_str())
    }

    /// Import path of a backend adapter package.
    pub fn backend_import(&self, service: &str, backend: Backend) -> String {
        format!("{}/internal/{}", self.service_module(service), backend.as_str())
    }

    /// The workspace manifest.
    pub fn go_work(&self) -> PathBuf {
        self.root.join("go.work")
    }

    /// Directory of deployment job files.
    pub fn deployment_jobs_dir(&self) -> PathBuf {
        self.root.join("deployments").join("nomad").join("jobs")
    }

    /// Directory of per-service platform config templates.
    pub fn deployment_config_dir(&self) -> PathBuf {
        self.root.join("deployments").join("nomad").join("config")
    }

    /// Directory of operational scripts.
    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join("scripts")
    }

    /// Listen port assigned to the service at document position `index`.
    pub fn service_port(&self, index: usize) -> u16 {
        8080 + index as u16
    }
}
