//! Service scaffolding: config, entrypoint, and support files.

use serde::Serialize;

use monoforge_core::resolver::ServiceView;
use monoforge_core::spec::Backend;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;
use super::handler::handler_name_for;
use super::repository::custom_ops_for;

#[derive(Serialize)]
pub(crate) struct AuthRecord {
    kind: String,
    issuer: Option<String>,
    audience: Option<String>,
}

/// Shared record behind `config_go`, `config_yaml`, and `deployment_config`.
#[derive(Serialize)]
pub(crate) struct ConfigRecord {
    pub(crate) service: String,
    pub(crate) env_var: String,
    pub(crate) port: u16,
    pub(crate) sqlite: bool,
    pub(crate) mongo: bool,
    pub(crate) auth: Option<AuthRecord>,
}

pub(crate) fn config_record(view: &ServiceView, port: u16) -> ConfigRecord {
    ConfigRecord {
        service: view.name.clone(),
        env_var: format!("{}_CONFIG", view.name.to_uppercase()),
        port,
        sqlite: view.uses_backend(Backend::Sqlite),
        mongo: view.uses_backend(Backend::Mongo),
        auth: view.auth.as_ref().map(|auth| AuthRecord {
            kind: auth.kind.clone(),
            issuer: auth.issuer.clone(),
            audience: auth.audience.clone(),
        }),
    }
}

/// Emit the service's config scaffolding (stage 2).
pub fn emit_config(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
    port: u16,
) -> Result<(), ForgeError> {
    let dir = layout.service_dir(&view.name);
    let record = config_record(view, port);
    emit(registry, "config_go", &dir.join("config.go"), &record)?;
    emit(registry, "config_yaml", &dir.join("config.yaml"), &record)
}

#[derive(Serialize)]
struct WireRecord {
    repo_var: String,
    repo_ctor: String,
    handler_var: String,
    handler_ctor: String,
    dep_expr: String,
}

#[derive(Serialize)]
struct MainRecord {
    service: String,
    service_package: String,
    service_import: String,
    lib_import: String,
    backend_package: &'static str,
    backend_import: String,
    base_path: String,
    wires: Vec<WireRecord>,
}

/// Emit the service entrypoint wired against the primary backend.
pub fn emit_entrypoint(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let primary = view.primary_backend();
    let mut wires = Vec::new();

    for model in view.standalone_models() {
        let has_handlers = view.handlers.iter().any(|h| h.model == model.name);
        if !has_handlers {
            continue;
        }
        let repo_var = format!("{}Repo", model.var_name);
        let through_service = !custom_ops_for(view, &model.name).is_empty()
            || view
                .handlers
                .iter()
                .any(|h| h.model == model.name && h.source != monoforge_core::spec::HandlerSource::Repo);
        let dep_expr = if through_service {
            format!("{}.New{}Service({repo_var})", view.name, model.go_name)
        } else {
            repo_var.clone()
        };
        wires.push(WireRecord {
            repo_var,
            repo_ctor: format!("New{}Repository", model.go_name),
            handler_var: format!("{}Handler", model.var_name),
            handler_ctor: format!("New{}", handler_name_for(view, &model.name, &model.go_name)),
            dep_expr,
        });
    }

    for aggregate in &view.aggregates {
        let repo_var = format!("{}Repo", aggregate.var_name);
        wires.push(WireRecord {
            repo_var: repo_var.clone(),
            repo_ctor: format!("New{}Repository", aggregate.go_name),
            handler_var: format!("{}Handler", aggregate.var_name),
            handler_ctor: format!(
                "New{}",
                handler_name_for(view, &aggregate.name, &aggregate.go_name)
            ),
            dep_expr: repo_var,
        });
    }

    let record = MainRecord {
        service: view.name.clone(),
        service_package: view.name.clone(),
        service_import: layout.service_import(&view.name),
        lib_import: layout.lib_module(),
        backend_package: primary.as_str(),
        backend_import: layout.backend_import(&view.name, primary),
        base_path: format!("/{}", view.name),
        wires,
    };
    emit(
        registry,
        "main",
        &layout.service_dir(&view.name).join("main.go"),
        &record,
    )
}

/// Emit the build manifest and ignore file.
pub fn emit_support(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.service_dir(&view.name);
    let empty = serde_json::json!({});
    emit(registry, "makefile", &dir.join("Makefile"), &empty)?;
    emit(registry, "gitignore", &dir.join(".gitignore"), &empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::testutil::{atom_view, todo_view};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_entrypoint_wires_aggregate_through_primary_backend() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_entrypoint(&registry, &layout, &todo_view()).unwrap();

        let out = fs::read_to_string(tmp.path().join("services/todo/main.go")).unwrap();
        assert!(out.contains("db, err := sqlite.Open(cfg.DatabaseDSN)"));
        assert!(out.contains("listRepo := sqlite.NewListRepository(db)"));
        assert!(out.contains("listHandler := todo.NewListHandler(listRepo)"));
        assert!(out.contains(r#"r.Route("/todo", func(r chi.Router) {"#));
    }

    #[test]
    fn test_config_defaults_per_backend() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_config(&registry, &layout, &atom_view(), 8080).unwrap();

        let go = fs::read_to_string(tmp.path().join("services/todo/config.go")).unwrap();
        assert!(go.contains("DatabaseDSN string `yaml:\"database_dsn\"`"));
        assert!(!go.contains("MongoURI"));
        assert!(go.contains("os.Getenv(\"TODO_CONFIG\")"));

        let yaml = fs::read_to_string(tmp.path().join("services/todo/config.yaml")).unwrap();
        assert!(yaml.contains("listen_addr: \":8080\""));
        assert!(yaml.contains("database_dsn: \"todo.db\""));
    }
}
