//! Precompiled template registry.
//!
//! Templates live in an embedded asset tree (`templates/`) and are compiled
//! into a single [`tera::Tera`] instance at construction; a compilation
//! failure is fatal. Emitters address templates by stable logical name and
//! feed each invocation a self-contained, serializable record. Templates are
//! never partially applied with shared context.

use serde::Serialize;
use tera::Tera;

use crate::error::ForgeError;

/// The embedded asset tree: (logical name, template source).
const ASSETS: &[(&str, &str)] = &[
    ("model", include_str!("../templates/model.go.tera")),
    ("aggregate_root", include_str!("../templates/aggregate_root.go.tera")),
    ("child_collection", include_str!("../templates/child_collection.go.tera")),
    ("repo_interface", include_str!("../templates/repo_interface.go.tera")),
    (
        "aggregate_repo_interface",
        include_str!("../templates/aggregate_repo_interface.go.tera"),
    ),
    ("service_interface", include_str!("../templates/service_interface.go.tera")),
    ("repo_sqlite", include_str!("../templates/repo_sqlite.go.tera")),
    (
        "aggregate_repo_sqlite",
        include_str!("../templates/aggregate_repo_sqlite.go.tera"),
    ),
    ("queries_sqlite", include_str!("../templates/queries_sqlite.go.tera")),
    ("repo_mongo", include_str!("../templates/repo_mongo.go.tera")),
    (
        "aggregate_repo_mongo",
        include_str!("../templates/aggregate_repo_mongo.go.tera"),
    ),
    ("store_mongo", include_str!("../templates/store_mongo.go.tera")),
    ("handler", include_str!("../templates/handler.go.tera")),
    ("aggregate_handler", include_str!("../templates/aggregate_handler.go.tera")),
    ("validator", include_str!("../templates/validator.go.tera")),
    ("xparams", include_str!("../templates/xparams.go.tera")),
    ("main", include_str!("../templates/main.go.tera")),
    ("config_go", include_str!("../templates/config_go.go.tera")),
    ("config_yaml", include_str!("../templates/config_yaml.yaml.tera")),
    ("go_mod", include_str!("../templates/go_mod.tera")),
    ("go_work", include_str!("../templates/go_work.tera")),
    ("makefile", include_str!("../templates/makefile.tera")),
    ("gitignore", include_str!("../templates/gitignore.tera")),
    ("deployment_job", include_str!("../templates/deployment_job.nomad.tera")),
    (
        "deployment_config",
        include_str!("../templates/deployment_config.yaml.tera"),
    ),
    ("script_deploy", include_str!("../templates/script_deploy.sh.tera")),
    ("script_health", include_str!("../templates/script_health.sh.tera")),
    ("core_lib:logger", include_str!("../templates/core_lib/logger.go.tera")),
    ("core_lib:responses", include_str!("../templates/core_lib/responses.go.tera")),
    ("core_lib:validation", include_str!("../templates/core_lib/validation.go.tera")),
    ("core_lib:lifecycle", include_str!("../templates/core_lib/lifecycle.go.tera")),
    ("core_lib:links", include_str!("../templates/core_lib/links.go.tera")),
    ("core_lib:go_mod", include_str!("../templates/core_lib/go_mod.tera")),
];

/// Compiled template set keyed by logical name.
pub struct Registry {
    tera: Tera,
}

impl Registry {
    /// Compile the embedded asset tree. Any template failing to compile is a
    /// fatal [`ForgeError::Template`].
    pub fn new() -> Result<Self, ForgeError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(ASSETS.to_vec())
            .map_err(|source| ForgeError::Template {
                name: "registry".to_string(),
                source,
            })?;
        Ok(Self { tera })
    }

    /// Whether a logical template name exists.
    pub fn contains(&self, name: &str) -> bool {
        ASSETS.iter().any(|(n, _)| *n == name)
    }

    /// Every registered logical name.
    pub fn names(&self) -> impl Iterator<Item = &'static str> {
        ASSETS.iter().map(|(name, _)| *name)
    }

    /// Render a template with a self-contained record.
    pub fn render<T: Serialize>(&self, name: &str, record: &T) -> Result<String, ForgeError> {
        let context =
            tera::Context::from_serialize(record).map_err(|source| ForgeError::Template {
                name: name.to_string(),
                source,
            })?;
        self.tera
            .render(name, &context)
            .map_err(|source| ForgeError::Template {
                name: name.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_assets_compile() {
        let registry = Registry::new().unwrap();
        assert!(registry.contains("aggregate_repo_sqlite"));
        assert!(registry.contains("core_lib:lifecycle"));
        assert!(!registry.contains("nonexistent"));
    }

    #[test]
    fn test_names_are_unique() {
        let registry = Registry::new().unwrap();
        let mut names: Vec<_> = registry.names().collect();
        let before = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(before, names.len());
    }

    #[test]
    fn test_render_gitignore_is_static() {
        let registry = Registry::new().unwrap();
        let out = registry
            .render("gitignore", &serde_json::json!({}))
            .unwrap();
        assert!(out.contains("*.db"));
    }

    #[test]
    fn test_render_go_work_lists_services() {
        let registry = Registry::new().unwrap();
        let out = registry
            .render("go_work", &serde_json::json!({"services": ["a", "b"]}))
            .unwrap();
        assert!(out.contains("./pkg/lib/core"));
        assert!(out.contains("./services/a"));
        assert!(out.contains("./services/b"));
    }
}
