//! Entity struct emission: models, child collections, aggregate roots.

use serde::Serialize;

use monoforge_core::resolver::{AggregateView, ChildView, ServiceView};
use monoforge_core::spec::Backend;

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::{emit, field_records, struct_imports, FieldRecord};

#[derive(Serialize)]
struct ModelRecord {
    package: String,
    service: String,
    go_name: String,
    bson: bool,
    audit: bool,
    imports: Vec<String>,
    fields: Vec<FieldRecord>,
}

#[derive(Serialize)]
struct ChildModelRecord {
    package: String,
    go_name: String,
    root_go: String,
    fk_go: String,
    fk_json: String,
    bson: bool,
    audit: bool,
    imports: Vec<String>,
    fields: Vec<FieldRecord>,
}

#[derive(Serialize)]
struct ChildSliceRecord {
    go_field: String,
    model_go: String,
    json_tag: String,
}

#[derive(Serialize)]
struct AggregateRecord {
    package: String,
    go_name: String,
    id_go: String,
    id_json: String,
    version_go: Option<String>,
    version_json: Option<String>,
    audit: bool,
    soft_delete: bool,
    bson: bool,
    imports: Vec<String>,
    fields: Vec<FieldRecord>,
    children: Vec<ChildSliceRecord>,
}

/// Find the aggregate and child descriptor owning `model`, if any.
pub(crate) fn child_of<'a>(
    view: &'a ServiceView,
    model: &str,
) -> Option<(&'a AggregateView, &'a ChildView)> {
    view.aggregates.iter().find_map(|aggregate| {
        aggregate
            .children
            .iter()
            .find(|child| child.model == model)
            .map(|child| (aggregate, child))
    })
}

/// Emit every entity struct of one service: standalone models, child
/// collection models (with their foreign-key field), and aggregate roots
/// (with their child slices).
pub fn emit_service_models(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let bson = view.uses_backend(Backend::Mongo);
    let dir = layout.service_internal_dir(&view.name);

    for model in &view.models {
        let path = dir.join(format!("model_{}.go", model.snake));
        match child_of(view, &model.name) {
            Some((aggregate, child)) => {
                let record = ChildModelRecord {
                    package: view.name.clone(),
                    go_name: model.go_name.clone(),
                    root_go: aggregate.go_name.clone(),
                    fk_go: child.fk_go.clone(),
                    fk_json: child.fk_column.clone(),
                    bson,
                    audit: child.audit,
                    imports: struct_imports(&model.fields),
                    fields: field_records(&model.fields),
                };
                emit(registry, "child_collection", &path, &record)?;
            }
            None => {
                let record = ModelRecord {
                    package: view.name.clone(),
                    service: view.name.clone(),
                    go_name: model.go_name.clone(),
                    bson,
                    audit: model.audit,
                    imports: struct_imports(&model.fields),
                    fields: field_records(&model.fields),
                };
                emit(registry, "model", &path, &record)?;
            }
        }
    }

    for aggregate in &view.aggregates {
        let path = dir.join(format!("model_{}.go", aggregate.snake));
        let record = AggregateRecord {
            package: view.name.clone(),
            go_name: aggregate.go_name.clone(),
            id_go: aggregate.id_go.clone(),
            id_json: aggregate.id_column.clone(),
            version_go: aggregate.version_field.as_deref().map(monoforge_core::naming::pascal_case),
            version_json: aggregate.version_column.clone(),
            audit: aggregate.audit,
            soft_delete: aggregate.soft_delete,
            bson,
            imports: struct_imports(&aggregate.fields),
            fields: field_records(&aggregate.fields),
            children: aggregate
                .children
                .iter()
                .map(|child| ChildSliceRecord {
                    go_field: child.go_field.clone(),
                    model_go: child.model_go.clone(),
                    json_tag: child.json_tag.clone(),
                })
                .collect(),
        };
        emit(registry, "aggregate_root", &path, &record)?;
    }
    Ok(())
}
