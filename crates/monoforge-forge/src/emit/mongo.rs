//! Document-store adapter emission.
//!
//! Aggregates persist as one document keyed by the root id: children are
//! captured structurally, `Save` is a full-document replace with
//! `upsert=false`, and no diff code path exists.

use serde::Serialize;

use monoforge_core::resolver::ServiceView;
use monoforge_core::spec::Backend;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;
use super::handler::repo_name_for;

#[derive(Serialize)]
struct ModelRecord {
    service_package: String,
    service_import: String,
    lib_import: String,
    go_name: String,
    repo_type: String,
    interface: String,
    collection: String,
    audit: bool,
}

#[derive(Serialize)]
struct ChildRecord {
    go_field: String,
    model_go: String,
    id_go: String,
    fk_go: String,
    order_go: Option<String>,
    audit: bool,
}

#[derive(Serialize)]
struct AggregateRecord {
    service_package: String,
    service_import: String,
    lib_import: String,
    go_name: String,
    repo_type: String,
    interface: String,
    collection: String,
    id_go: String,
    version_go: Option<String>,
    audit: bool,
    needs_actor: bool,
    children: Vec<ChildRecord>,
}

/// Emit the document-store surface of one service: the connection hooks,
/// plain per-model adapters, and whole-document aggregate adapters.
pub fn emit_mongo(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.backend_dir(&view.name, Backend::Mongo);

    emit(registry, "store_mongo", &dir.join("store.go"), &serde_json::json!({}))?;

    for model in view.standalone_models() {
        let record = ModelRecord {
            service_package: view.name.clone(),
            service_import: layout.service_import(&view.name),
            lib_import: layout.lib_module(),
            go_name: model.go_name.clone(),
            repo_type: format!("{}Repository", model.go_name),
            interface: repo_name_for(view, &model.name, &model.go_name),
            collection: model.table.clone(),
            audit: model.audit,
        };
        let path = dir.join(format!("repo_{}.go", model.snake));
        emit(registry, "repo_mongo", &path, &record)?;
    }

    for aggregate in &view.aggregates {
        let record = AggregateRecord {
            service_package: view.name.clone(),
            service_import: layout.service_import(&view.name),
            lib_import: layout.lib_module(),
            go_name: aggregate.go_name.clone(),
            repo_type: format!("{}Repository", aggregate.go_name),
            interface: repo_name_for(view, &aggregate.name, &aggregate.go_name),
            collection: aggregate.table.clone(),
            id_go: aggregate.id_go.clone(),
            version_go: aggregate
                .version_field
                .as_deref()
                .map(monoforge_core::naming::pascal_case),
            audit: aggregate.audit,
            needs_actor: aggregate.audit || aggregate.children.iter().any(|c| c.audit),
            children: aggregate
                .children
                .iter()
                .map(|child| ChildRecord {
                    go_field: child.go_field.clone(),
                    model_go: child.model_go.clone(),
                    id_go: child.id_go.clone(),
                    fk_go: child.fk_go.clone(),
                    order_go: child.order.as_ref().map(|o| o.go_name.clone()),
                    audit: child.audit,
                })
                .collect(),
        };
        let path = dir.join(format!("repo_{}.go", aggregate.snake));
        emit(registry, "aggregate_repo_mongo", &path, &record)?;
    }
    Ok(())
}
