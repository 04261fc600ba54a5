//! HTTP handler emission.
//!
//! Standalone models get a top-level resource handler. Models owned by an
//! aggregate get no handler of their own: the aggregate's handler carries
//! nested child routes whose semantics are load aggregate, mutate the child
//! list, save the aggregate through its repository.

use serde::Serialize;

use monoforge_core::resolver::{AggregateView, HandlerView, ServiceView};
use monoforge_core::spec::{HandlerSource, HttpMethod, Operation};

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;

/// Repository type name for a handler target, honoring a declared override.
pub(crate) fn repo_name_for(view: &ServiceView, target: &str, go_name: &str) -> String {
    let default = format!("{go_name}Repo");
    view.handlers
        .iter()
        .filter(|h| h.model == target)
        .map(|h| h.repo_name.clone())
        .find(|name| *name != default)
        .unwrap_or(default)
}

/// Handler type name for a target, honoring a declared override.
pub(crate) fn handler_name_for(view: &ServiceView, target: &str, go_name: &str) -> String {
    let default = format!("{go_name}Handler");
    view.handlers
        .iter()
        .filter(|h| h.model == target)
        .map(|h| h.handler_name.clone())
        .find(|name| *name != default)
        .unwrap_or(default)
}

fn chi_method(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "Get",
        HttpMethod::Post => "Post",
        HttpMethod::Put => "Put",
        HttpMethod::Patch => "Patch",
        HttpMethod::Delete => "Delete",
    }
}

fn op_fn(handler: &HandlerView) -> String {
    match handler.op {
        Operation::Create => "Create".to_string(),
        Operation::Get => "Get".to_string(),
        Operation::List => "List".to_string(),
        Operation::Update => "Update".to_string(),
        Operation::Delete => "Delete".to_string(),
        Operation::Custom => handler.method_name.clone(),
    }
}

#[derive(Serialize, Default)]
struct OpsRecord {
    create: bool,
    get: bool,
    list: bool,
    update: bool,
    delete: bool,
}

impl OpsRecord {
    fn from_handlers(handlers: &[&HandlerView]) -> Self {
        let mut ops = Self::default();
        for handler in handlers {
            match handler.op {
                Operation::Create => ops.create = true,
                Operation::Get => ops.get = true,
                Operation::List => ops.list = true,
                Operation::Update => ops.update = true,
                Operation::Delete => ops.delete = true,
                Operation::Custom => {}
            }
        }
        ops
    }

    fn all() -> Self {
        Self {
            create: true,
            get: true,
            list: true,
            update: true,
            delete: true,
        }
    }
}

#[derive(Serialize)]
struct RouteRecord {
    chi_method: &'static str,
    path: String,
    #[serde(rename = "fn")]
    fn_name: String,
}

#[derive(Serialize)]
struct CustomRecord {
    #[serde(rename = "fn")]
    fn_name: String,
    method_name: String,
}

#[derive(Serialize)]
struct XparamsRecord {
    package: String,
    lib_import: String,
}

#[derive(Serialize)]
struct HandlerRecord {
    package: String,
    lib_import: String,
    go_name: String,
    var: String,
    handler_type: String,
    dep_field: &'static str,
    dep_type: String,
    dep_doc: &'static str,
    needs_json: bool,
    collection_path: String,
    routes: Vec<RouteRecord>,
    ops: OpsRecord,
    customs: Vec<CustomRecord>,
}

#[derive(Serialize)]
struct ChildHandlerRecord {
    go_field: String,
    model_go: String,
    model_var: String,
    id_go: String,
    path_segment: String,
}

#[derive(Serialize)]
struct AggregateHandlerRecord {
    package: String,
    lib_import: String,
    go_name: String,
    var: String,
    handler_type: String,
    repo_interface: String,
    id_go: String,
    needs_json: bool,
    collection_path: String,
    routes: Vec<RouteRecord>,
    ops: OpsRecord,
    children: Vec<ChildHandlerRecord>,
}

fn default_aggregate_routes(plural: &str) -> Vec<RouteRecord> {
    let collection = format!("/{plural}");
    let item = format!("/{plural}/{{id}}");
    vec![
        RouteRecord {
            chi_method: "Post",
            path: collection.clone(),
            fn_name: "Create".to_string(),
        },
        RouteRecord {
            chi_method: "Get",
            path: collection,
            fn_name: "List".to_string(),
        },
        RouteRecord {
            chi_method: "Get",
            path: item.clone(),
            fn_name: "Get".to_string(),
        },
        RouteRecord {
            chi_method: "Put",
            path: item.clone(),
            fn_name: "Update".to_string(),
        },
        RouteRecord {
            chi_method: "Delete",
            path: item,
            fn_name: "Delete".to_string(),
        },
    ]
}

fn declared_routes(handlers: &[&HandlerView]) -> Vec<RouteRecord> {
    handlers
        .iter()
        .map(|h| RouteRecord {
            chi_method: chi_method(h.method),
            path: h.path.clone(),
            fn_name: op_fn(h),
        })
        .collect()
}

/// Whether the model's handlers go through the service seam instead of the
/// repository: any non-repo source or any custom operation forces it.
fn needs_service(handlers: &[&HandlerView]) -> bool {
    handlers
        .iter()
        .any(|h| h.source != HandlerSource::Repo || h.op == Operation::Custom)
}

fn aggregate_record(
    layout: &Layout,
    view: &ServiceView,
    aggregate: &AggregateView,
) -> AggregateHandlerRecord {
    let declared: Vec<&HandlerView> = view
        .handlers
        .iter()
        .filter(|h| h.model == aggregate.name)
        .collect();
    let (routes, ops) = if declared.is_empty() {
        (default_aggregate_routes(&aggregate.plural), OpsRecord::all())
    } else {
        (declared_routes(&declared), OpsRecord::from_handlers(&declared))
    };
    AggregateHandlerRecord {
        package: view.name.clone(),
        lib_import: layout.lib_module(),
        go_name: aggregate.go_name.clone(),
        var: aggregate.var_name.clone(),
        handler_type: handler_name_for(view, &aggregate.name, &aggregate.go_name),
        repo_interface: repo_name_for(view, &aggregate.name, &aggregate.go_name),
        id_go: aggregate.id_go.clone(),
        needs_json: ops.create || ops.update || !aggregate.children.is_empty(),
        collection_path: format!("/{}", aggregate.plural),
        routes,
        ops,
        children: aggregate
            .children
            .iter()
            .map(|child| ChildHandlerRecord {
                go_field: child.go_field.clone(),
                model_go: child.model_go.clone(),
                model_var: child.model_var.clone(),
                id_go: child.id_go.clone(),
                path_segment: child.json_tag.clone(),
            })
            .collect(),
    }
}

/// Emit the HTTP surface of one service: the shared request helpers, one
/// resource handler per standalone model with declared routes, and one
/// aggregate handler (with nested child routes) per aggregate.
pub fn emit_handlers(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.service_internal_dir(&view.name);

    let record = XparamsRecord {
        package: view.name.clone(),
        lib_import: layout.lib_module(),
    };
    emit(registry, "xparams", &dir.join("xparams.go"), &record)?;

    for model in view.standalone_models() {
        let declared: Vec<&HandlerView> = view
            .handlers
            .iter()
            .filter(|h| h.model == model.name)
            .collect();
        if declared.is_empty() {
            continue;
        }
        let service = needs_service(&declared);
        let ops = OpsRecord::from_handlers(&declared);
        let customs: Vec<CustomRecord> = declared
            .iter()
            .filter(|h| h.op == Operation::Custom)
            .map(|h| CustomRecord {
                fn_name: h.method_name.clone(),
                method_name: h.method_name.clone(),
            })
            .collect();
        let record = HandlerRecord {
            package: view.name.clone(),
            lib_import: layout.lib_module(),
            go_name: model.go_name.clone(),
            var: model.var_name.clone(),
            handler_type: handler_name_for(view, &model.name, &model.go_name),
            dep_field: if service { "svc" } else { "repo" },
            dep_type: if service {
                format!("{}Service", model.go_name)
            } else {
                repo_name_for(view, &model.name, &model.go_name)
            },
            dep_doc: if service { "service seam" } else { "repository" },
            needs_json: ops.create || ops.update || !customs.is_empty(),
            collection_path: format!("/{}", model.plural),
            routes: declared_routes(&declared),
            ops,
            customs,
        };
        let path = dir.join(format!("handler_{}.go", model.snake));
        emit(registry, "handler", &path, &record)?;
    }

    for aggregate in &view.aggregates {
        let record = aggregate_record(layout, view, aggregate);
        let path = dir.join(format!("handler_{}.go", aggregate.snake));
        emit(registry, "aggregate_handler", &path, &record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::testutil::{atom_view, todo_view};
    use std::fs;
    use tempfile::TempDir;

    fn emit_handlers_for(view: &ServiceView) -> TempDir {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_handlers(&registry, &layout, view).unwrap();
        tmp
    }

    #[test]
    fn test_resource_handler_has_five_routes() {
        let tmp = emit_handlers_for(&atom_view());
        let out = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/handler_item.go"),
        )
        .unwrap();
        assert!(out.contains("type ItemHandler struct {"));
        assert!(out.contains(r#"r.Post("/items", h.Create)"#));
        assert!(out.contains(r#"r.Get("/items", h.List)"#));
        assert!(out.contains(r#"r.Get("/items/{id}", h.Get)"#));
        assert!(out.contains(r#"r.Put("/items/{id}", h.Update)"#));
        assert!(out.contains(r#"r.Delete("/items/{id}", h.Delete)"#));
        assert!(out.contains("ValidateCreateItem(&m)"));
    }

    #[test]
    fn test_child_models_get_no_top_level_handler() {
        let tmp = emit_handlers_for(&todo_view());
        // Item and Tag belong to List: their handlers are nested routes on
        // the aggregate handler, not standalone files.
        assert!(!tmp
            .path()
            .join("services/todo/internal/todo/handler_item.go")
            .exists());
        assert!(!tmp
            .path()
            .join("services/todo/internal/todo/handler_tag.go")
            .exists());
    }

    #[test]
    fn test_aggregate_handler_exposes_nested_child_routes() {
        let tmp = emit_handlers_for(&todo_view());
        let out = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/handler_list.go"),
        )
        .unwrap();
        assert!(out.contains(r#"r.Post("/lists", h.Create)"#));
        assert!(out.contains(r#"r.Get("/lists/{id}", h.Get)"#));
        assert!(out.contains(r#"r.Post("/lists/{id}/items", h.AddItem)"#));
        assert!(out.contains(r#"r.Put("/lists/{id}/items/{childId}", h.UpdateItem)"#));
        assert!(out.contains(r#"r.Delete("/lists/{id}/items/{childId}", h.RemoveItem)"#));
        assert!(out.contains(r#"r.Post("/lists/{id}/tags", h.AddTag)"#));
        // child mutations save the whole aggregate
        assert!(out.contains("h.repo.Save(req.Context(), agg)"));
    }

    #[test]
    fn test_handler_names_honor_overrides() {
        let mut spec = crate::emit::testutil::atom_spec();
        let service = spec.services.get_mut("todo").unwrap();
        service.api[0].overrides = Some(monoforge_core::spec::HandlerOverrides {
            repository: Some("ItemStore".to_string()),
            method: None,
            handler: Some("ItemAPI".to_string()),
        });
        monoforge_core::validate(&spec).unwrap();
        let view = monoforge_core::derive(&spec, "todo").unwrap();

        assert_eq!(repo_name_for(&view, "Item", "Item"), "ItemStore");
        assert_eq!(handler_name_for(&view, "Item", "Item"), "ItemAPI");
    }
}
