//! The emission pipeline.
//!
//! One spec, one pass. For every service a fixed stage order runs: interior
//! trees, config scaffolding, models and interfaces, backend adapters
//! (relational first), handlers and validators, then entrypoint, module
//! manifest, the formatter/tidy collaborators, and support files. The
//! pipeline is fail-fast: the first error ends the run.

use std::fs;
use std::path::PathBuf;

use tracing::{info, warn};

use monoforge_core::resolver::{derive_all, ServiceView};
use monoforge_core::spec::Backend;
use monoforge_core::Spec;

use crate::assembler;
use crate::collab::Collaborator;
use crate::emit::{
    deployment, handler, model, mongo, repository, scaffold, shared_lib, sqlite, validator,
};
use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Output root of the generated workspace.
    pub output: PathBuf,
    /// Module-path prefix override (`--module-path`).
    pub module_root: Option<String>,
    /// Development mode: wire the shared library through a local replace.
    pub dev: bool,
}

/// The staged emission pipeline.
pub struct Pipeline<'a> {
    registry: Registry,
    collab: &'a dyn Collaborator,
}

impl<'a> Pipeline<'a> {
    /// Compile the template registry and bind the collaborators.
    pub fn new(collab: &'a dyn Collaborator) -> Result<Self, ForgeError> {
        Ok(Self {
            registry: Registry::new()?,
            collab,
        })
    }

    /// Run the whole pipeline for a validated spec. Returns the layout the
    /// run wrote into.
    pub fn generate(
        &self,
        spec: &Spec,
        spec_bytes: &[u8],
        spec_file_name: &str,
        opts: &GenerateOptions,
    ) -> Result<Layout, ForgeError> {
        let module_root = opts
            .module_root
            .clone()
            .unwrap_or_else(|| spec.module_root());
        let layout = Layout::new(&opts.output, module_root);
        info!(root = %layout.root().display(), "generating workspace");

        assembler::copy_spec(&layout, spec_file_name, spec_bytes)?;
        shared_lib::emit_shared_lib(&self.registry, &layout)?;

        let views = derive_all(spec)?;
        for (index, view) in views.iter().enumerate() {
            self.emit_service(&layout, view, index, opts)?;
        }

        assembler::emit_workspace(&self.registry, &layout, &views)?;
        deployment::emit_deployments(&self.registry, &layout, &views)?;

        self.collab.work_sync(layout.root())?;
        info!(services = views.len(), "workspace generated");
        Ok(layout)
    }

    fn emit_service(
        &self,
        layout: &Layout,
        view: &ServiceView,
        index: usize,
        opts: &GenerateOptions,
    ) -> Result<(), ForgeError> {
        info!(service = %view.name, "emitting service");

        // Stage 1: interior trees.
        let internal = layout.service_internal_dir(&view.name);
        fs::create_dir_all(&internal)
            .map_err(|source| ForgeError::io("assembler", &internal, source))?;
        for backend in &view.backends {
            let dir = layout.backend_dir(&view.name, *backend);
            fs::create_dir_all(&dir).map_err(|source| ForgeError::io("assembler", &dir, source))?;
        }

        // Stage 2: config scaffolding.
        scaffold::emit_config(&self.registry, layout, view, layout.service_port(index))?;

        // Stage 3: models, repository interfaces, service seams.
        model::emit_service_models(&self.registry, layout, view)?;
        repository::emit_interfaces(&self.registry, layout, view)?;

        // Stage 4: backend adapters, relational before document store.
        if view.uses_backend(Backend::Sqlite) {
            sqlite::emit_sqlite(&self.registry, layout, view)?;
        }
        if view.uses_backend(Backend::Mongo) {
            mongo::emit_mongo(&self.registry, layout, view)?;
        }

        // Stage 5: handlers, then validators.
        handler::emit_handlers(&self.registry, layout, view)?;
        validator::emit_validators(&self.registry, layout, view)?;

        // Stage 6: entrypoint, module manifest, collaborators, support files.
        scaffold::emit_entrypoint(&self.registry, layout, view)?;
        assembler::emit_service_module(&self.registry, layout, view, opts.dev)?;
        let dir = layout.service_dir(&view.name);
        if let Err(err) = self.collab.format(&dir) {
            warn!(service = %view.name, %err, "formatter failed; continuing");
        }
        self.collab.tidy(&dir)?;
        scaffold::emit_support(&self.registry, layout, view)?;
        Ok(())
    }
}
