//! Repository interface and service seam emission.

use serde::Serialize;

use monoforge_core::resolver::ServiceView;
use monoforge_core::spec::Operation;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;
use super::handler::repo_name_for;

#[derive(Serialize)]
struct InterfaceRecord {
    package: String,
    go_name: String,
    repo_name: String,
}

#[derive(Serialize)]
struct ServiceInterfaceRecord {
    package: String,
    lib_import: String,
    go_name: String,
    service_name: String,
    impl_name: String,
    repo_name: String,
    custom_ops: Vec<String>,
}

/// Custom operation method names declared for a model, in document order.
pub(crate) fn custom_ops_for(view: &ServiceView, model: &str) -> Vec<String> {
    view.handlers
        .iter()
        .filter(|h| h.model == model && h.op == Operation::Custom)
        .map(|h| h.method_name.clone())
        .collect()
}

/// Emit aggregate repository interfaces, standalone-model repository
/// interfaces, and per-model service seams. Models owned by an aggregate get
/// neither: their persistence goes through the aggregate repository.
pub fn emit_interfaces(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.service_internal_dir(&view.name);

    for aggregate in &view.aggregates {
        let record = InterfaceRecord {
            package: view.name.clone(),
            go_name: aggregate.go_name.clone(),
            repo_name: repo_name_for(view, &aggregate.name, &aggregate.go_name),
        };
        let path = dir.join(format!("repo_{}.go", aggregate.snake));
        emit(registry, "aggregate_repo_interface", &path, &record)?;
    }

    for model in view.standalone_models() {
        let repo_name = repo_name_for(view, &model.name, &model.go_name);
        let record = InterfaceRecord {
            package: view.name.clone(),
            go_name: model.go_name.clone(),
            repo_name: repo_name.clone(),
        };
        let path = dir.join(format!("repo_{}.go", model.snake));
        emit(registry, "repo_interface", &path, &record)?;

        let record = ServiceInterfaceRecord {
            package: view.name.clone(),
            lib_import: layout.lib_module(),
            go_name: model.go_name.clone(),
            service_name: format!("{}Service", model.go_name),
            impl_name: format!("{}Service", model.var_name),
            repo_name,
            custom_ops: custom_ops_for(view, &model.name),
        };
        let path = dir.join(format!("service_{}.go", model.snake));
        emit(registry, "service_interface", &path, &record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::testutil::todo_view;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_aggregate_interface_has_save_and_no_update() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_interfaces(&registry, &layout, &todo_view()).unwrap();

        let list = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/repo_list.go"),
        )
        .unwrap();
        assert!(list.contains("type ListRepo interface {"));
        assert!(list.contains("Save(ctx context.Context, agg *List) error"));
        assert!(!list.contains("Update(ctx"));
    }

    #[test]
    fn test_child_models_get_no_repo_interface() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_interfaces(&registry, &layout, &todo_view()).unwrap();

        // Item and Tag are children of List: no standalone repositories.
        assert!(!tmp.path().join("services/todo/internal/todo/repo_item.go").exists());
        assert!(!tmp.path().join("services/todo/internal/todo/repo_tag.go").exists());
        assert!(!tmp
            .path()
            .join("services/todo/internal/todo/service_item.go")
            .exists());
    }
}
