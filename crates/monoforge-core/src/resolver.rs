//! Cross-validation and the derived per-service view.
//!
//! [`validate`] walks the whole specification and checks every reference and
//! invariant, reporting the first violation with a dotted path into the
//! document. [`derive`] precomputes, per service, everything the emitters
//! need: Go identifiers, plural forms, physical names, field
//! categorizations, per-aggregate child descriptors, and the
//! part-of-aggregate predicate. Both are pure functions of the spec; running
//! them twice yields identical results.

use indexmap::IndexMap;

use crate::error::SpecError;
use crate::naming;
use crate::spec::{
    Auth, Backend, ChildCollection, Deployment, Field, FieldType, Handler, HandlerSource,
    HttpMethod, Model, OnDelete, Operation, Spec, Validation,
};

/// Categorization of a field within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldClass {
    /// A field declared in the specification, owned by the model.
    Owned,
    /// A derived audit stamp column.
    Audit,
    /// The optimistic-concurrency version column.
    Version,
    /// A foreign-key column tying a child to its root.
    ForeignKey,
}

/// Derived view of a single field.
#[derive(Debug, Clone)]
pub struct FieldView {
    /// Name as written in the specification.
    pub name: String,
    /// Exported Go identifier.
    pub go_name: String,
    /// Physical column name.
    pub column: String,
    /// JSON tag.
    pub json_tag: String,
    /// Emitted Go type.
    pub go_type: String,
    /// Specification field type.
    pub ty: FieldType,
    /// Categorization.
    pub class: FieldClass,
    /// Declared default value, if any.
    pub default: Option<serde_yaml::Value>,
    /// Declared validation rules.
    pub validations: Vec<Validation>,
}

impl FieldView {
    fn owned(name: &str, field: &Field) -> Self {
        FieldView {
            name: name.to_string(),
            go_name: naming::pascal_case(name),
            column: naming::snake_case(name),
            json_tag: naming::snake_case(name),
            go_type: naming::go_type(field.ty).to_string(),
            ty: field.ty,
            class: FieldClass::Owned,
            default: field.default.clone(),
            validations: field.validations.clone(),
        }
    }

    fn derived(name: &str, ty: FieldType, class: FieldClass) -> Self {
        FieldView {
            name: name.to_string(),
            go_name: naming::pascal_case(name),
            column: naming::snake_case(name),
            json_tag: naming::snake_case(name),
            go_type: naming::go_type(ty).to_string(),
            ty,
            class,
            default: None,
            validations: vec![],
        }
    }
}

/// The lifecycle stamp columns every persisted entity carries; the actor
/// columns join only when the audit flag is set.
fn stamp_views(audit: bool) -> Vec<FieldView> {
    let mut stamps = vec![
        FieldView::derived("created_at", FieldType::Datetime, FieldClass::Audit),
        FieldView::derived("updated_at", FieldType::Datetime, FieldClass::Audit),
    ];
    if audit {
        stamps.push(FieldView::derived("created_by", FieldType::String, FieldClass::Audit));
        stamps.push(FieldView::derived("updated_by", FieldType::String, FieldClass::Audit));
    }
    stamps
}

/// Derived view of a model.
#[derive(Debug, Clone)]
pub struct ModelView {
    /// Name as written.
    pub name: String,
    /// Exported Go type name.
    pub go_name: String,
    /// Unexported Go variable name.
    pub var_name: String,
    /// snake_case form.
    pub snake: String,
    /// Plural snake_case form (route segments, table names).
    pub plural: String,
    /// Physical table / collection name.
    pub table: String,
    /// Primary-key column.
    pub id_column: String,
    /// Declared fields, in document order.
    pub fields: Vec<FieldView>,
    /// Every persisted column after the primary key, classified: the
    /// declared fields ([`FieldClass::Owned`]) followed by the stamp
    /// columns ([`FieldClass::Audit`]).
    pub columns: Vec<FieldView>,
    /// Whether audit columns are stamped.
    pub audit: bool,
    /// Declared lifecycle hook names.
    pub lifecycle: Vec<String>,
    /// Name of the owning aggregate when this model is a child.
    pub part_of: Option<String>,
}

/// Derived ordering descriptor of a child collection.
#[derive(Debug, Clone)]
pub struct OrderView {
    /// Field name as written.
    pub field: String,
    /// Physical order column.
    pub column: String,
    /// Exported Go field name.
    pub go_name: String,
    /// Columns the order value is unique within.
    pub unique_scope: Vec<String>,
}

/// Derived view of a child collection.
#[derive(Debug, Clone)]
pub struct ChildView {
    /// Collection name as written (`items`).
    pub name: String,
    /// Exported Go field name on the root struct (`Items`).
    pub go_field: String,
    /// JSON tag of the collection.
    pub json_tag: String,
    /// Child model name (`Item`).
    pub model: String,
    /// Child model Go type name.
    pub model_go: String,
    /// Child model variable name.
    pub model_var: String,
    /// Physical child table.
    pub table: String,
    /// Child identifier field and column.
    pub id_field: String,
    /// Exported Go name of the identifier field.
    pub id_go: String,
    /// Physical identifier column.
    pub id_column: String,
    /// Foreign-key column on the child table.
    pub fk_column: String,
    /// Exported Go name of the foreign-key field.
    pub fk_go: String,
    /// Root table referenced by the foreign key.
    pub root_table: String,
    /// Root identifier column referenced by the foreign key.
    pub root_id_column: String,
    /// Delete policy.
    pub on_delete: OnDelete,
    /// Ordering descriptor, when the collection is ordered.
    pub order: Option<OrderView>,
    /// Columns that may be mutated in place by the save diff.
    pub updatable_columns: Vec<String>,
    /// Whether child rows carry audit stamps.
    pub audit: bool,
    /// Unique column groups from the constraint hints.
    pub unique: Vec<Vec<String>>,
    /// Plain index column groups from the constraint hints.
    pub indexes: Vec<Vec<String>>,
    /// Every persisted column after the primary key, classified: the
    /// foreign key ([`FieldClass::ForeignKey`]), the child model's declared
    /// fields ([`FieldClass::Owned`]), then the stamp columns
    /// ([`FieldClass::Audit`]).
    pub columns: Vec<FieldView>,
}

/// Derived view of an aggregate root.
#[derive(Debug, Clone)]
pub struct AggregateView {
    /// Name as written.
    pub name: String,
    /// Exported Go type name.
    pub go_name: String,
    /// Unexported Go variable name.
    pub var_name: String,
    /// snake_case form.
    pub snake: String,
    /// Plural snake_case form.
    pub plural: String,
    /// Physical root table.
    pub table: String,
    /// Identifier field name as written.
    pub id_field: String,
    /// Exported Go name of the identifier.
    pub id_go: String,
    /// Physical identifier column.
    pub id_column: String,
    /// Version field name, when optimistic concurrency is enabled.
    pub version_field: Option<String>,
    /// Physical version column.
    pub version_column: Option<String>,
    /// Whether audit columns are stamped.
    pub audit: bool,
    /// Whether deletes are soft.
    pub soft_delete: bool,
    /// Declared root fields.
    pub fields: Vec<FieldView>,
    /// Every persisted root column after the primary key, classified: the
    /// declared fields ([`FieldClass::Owned`]), the version column
    /// ([`FieldClass::Version`]) when optimistic concurrency is on, then
    /// the stamp columns ([`FieldClass::Audit`]).
    pub columns: Vec<FieldView>,
    /// Child collections in document order.
    pub children: Vec<ChildView>,
}

/// Target kind of a declared handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerTarget {
    /// The handler operates on a standalone model.
    Model,
    /// The handler operates on an aggregate root.
    Aggregate,
}

/// Derived view of a declared handler.
#[derive(Debug, Clone)]
pub struct HandlerView {
    /// Stable handler id.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path pattern.
    pub path: String,
    /// Delegation source.
    pub source: HandlerSource,
    /// Target model or aggregate name.
    pub model: String,
    /// Whether the target is a model or an aggregate.
    pub target: HandlerTarget,
    /// Operation.
    pub op: Operation,
    /// Custom operation name when `op` is `custom`.
    pub custom_operation: Option<String>,
    /// Handler type name (with overrides applied).
    pub handler_name: String,
    /// Repository type name (with overrides applied).
    pub repo_name: String,
    /// Repository method name (with overrides applied).
    pub method_name: String,
}

/// Precomputed per-service view consumed by every emitter.
#[derive(Debug, Clone)]
pub struct ServiceView {
    /// Service name.
    pub name: String,
    /// Opaque service kind.
    pub kind: String,
    /// Storage backends, primary first.
    pub backends: Vec<Backend>,
    /// Authentication block, when declared.
    pub auth: Option<Auth>,
    /// Effective deployment descriptor (service override merged over the
    /// repository-wide one).
    pub deployment: Option<Deployment>,
    /// All models, children included, in document order.
    pub models: Vec<ModelView>,
    /// Aggregates in document order.
    pub aggregates: Vec<AggregateView>,
    /// Declared handlers in document order.
    pub handlers: Vec<HandlerView>,
}

impl ServiceView {
    /// Name of the aggregate owning `model`, when the model is a child.
    pub fn is_part_of_aggregate(&self, model: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|m| m.name == model)
            .and_then(|m| m.part_of.as_deref())
    }

    /// Models that are top-level resources (not owned by any aggregate).
    pub fn standalone_models(&self) -> impl Iterator<Item = &ModelView> {
        self.models.iter().filter(|m| m.part_of.is_none())
    }

    /// Whether any aggregate or standalone model uses the given backend.
    pub fn uses_backend(&self, backend: Backend) -> bool {
        self.backends.contains(&backend)
    }

    /// The primary (first declared) backend.
    pub fn primary_backend(&self) -> Backend {
        self.backends[0]
    }
}

/// Validate every cross-reference and invariant in the specification.
///
/// Fails on the first violation with a dotted document path.
pub fn validate(spec: &Spec) -> Result<(), SpecError> {
    if spec.schema_version != 1 {
        return Err(SpecError::validation(
            "schema_version",
            format!("unsupported schema version {}", spec.schema_version),
        ));
    }
    if let Some(name) = &spec.name {
        if naming::sanitize(name).is_empty() {
            return Err(SpecError::validation(
                "name",
                format!("`{name}` sanitizes to an empty identifier"),
            ));
        }
    }
    if let Some(deployment) = &spec.deployment {
        validate_deployment("deployment.platform", deployment)?;
    }
    for (service_name, service) in &spec.services {
        if !is_valid_service_name(service_name) {
            return Err(SpecError::validation(
                format!("services.{service_name}"),
                "service names must match [a-z][a-z0-9_]*",
            ));
        }
        if let Some(deployment) = &service.deployment {
            validate_deployment(
                format!("services.{service_name}.deployment.platform"),
                deployment,
            )?;
        }
        validate_service(service_name, service)?;
    }
    Ok(())
}

fn is_valid_service_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn validate_deployment(
    path: impl Into<String>,
    deployment: &crate::spec::Deployment,
) -> Result<(), SpecError> {
    if deployment.platform != "nomad" {
        return Err(SpecError::validation(
            path,
            format!("unknown platform `{}`", deployment.platform),
        ));
    }
    Ok(())
}

fn validate_service(service_name: &str, service: &crate::spec::Service) -> Result<(), SpecError> {
    let base = format!("services.{service_name}");

    if service.repo_impl.is_empty() {
        return Err(SpecError::validation(
            format!("{base}.repo_impl"),
            "at least one storage backend is required",
        ));
    }
    for backend in &service.repo_impl {
        if *backend == Backend::Postgres {
            return Err(SpecError::validation(
                format!("{base}.repo_impl"),
                "backend `postgres` is recognized but not generated yet",
            ));
        }
    }
    let mut seen_backends = Vec::new();
    for backend in &service.repo_impl {
        if seen_backends.contains(backend) {
            return Err(SpecError::validation(
                format!("{base}.repo_impl"),
                format!("backend `{backend}` declared twice"),
            ));
        }
        seen_backends.push(*backend);
    }

    // Aggregate names must not shadow model names; handler targets would be
    // ambiguous otherwise.
    for aggregate_name in service.aggregates.keys() {
        if service.models.contains_key(aggregate_name) {
            return Err(SpecError::validation(
                format!("{base}.aggregates.{aggregate_name}"),
                "aggregate name collides with a model name",
            ));
        }
    }

    let mut part_of: IndexMap<&str, &str> = IndexMap::new();
    for (aggregate_name, aggregate) in &service.aggregates {
        let agg_base = format!("{base}.aggregates.{aggregate_name}");
        if aggregate.table.is_empty() {
            return Err(SpecError::validation(
                format!("{agg_base}.table"),
                "table name must not be empty",
            ));
        }
        for (child_name, child) in &aggregate.children {
            let child_base = format!("{agg_base}.children.{child_name}");
            let model = service.models.get(&child.of).ok_or_else(|| {
                SpecError::validation(
                    format!("{child_base}.of"),
                    format!("unknown model `{}`", child.of),
                )
            })?;
            if let Some(owner) = part_of.get(child.of.as_str()) {
                return Err(SpecError::validation(
                    format!("{child_base}.of"),
                    format!("model `{}` is already part of aggregate `{owner}`", child.of),
                ));
            }
            part_of.insert(child.of.as_str(), aggregate_name.as_str());

            validate_child(&child_base, aggregate, child, model)?;
        }
    }

    let mut handler_ids: Vec<&str> = Vec::new();
    let mut routes: Vec<(HttpMethod, &str)> = Vec::new();
    for (idx, handler) in service.api.iter().enumerate() {
        let handler_base = format!("{base}.api[{idx}]");
        if handler_ids.contains(&handler.id.as_str()) {
            return Err(SpecError::validation(
                format!("{handler_base}.id"),
                format!("duplicate handler id `{}`", handler.id),
            ));
        }
        handler_ids.push(&handler.id);

        let route_key = (handler.route.method, handler.route.path.as_str());
        if routes.contains(&route_key) {
            return Err(SpecError::validation(
                format!("{handler_base}.route"),
                format!(
                    "duplicate route `{} {}`",
                    handler.route.method, handler.route.path
                ),
            ));
        }
        routes.push(route_key);

        if !service.models.contains_key(&handler.model)
            && !service.aggregates.contains_key(&handler.model)
        {
            return Err(SpecError::validation(
                format!("{handler_base}.model"),
                format!("unknown model `{}`", handler.model),
            ));
        }

        match (handler.op, &handler.custom_operation) {
            (Operation::Custom, None) => {
                return Err(SpecError::validation(
                    format!("{handler_base}.custom_operation"),
                    "op `custom` requires a custom_operation name",
                ));
            }
            (Operation::Custom, Some(_)) => {}
            (_, Some(_)) => {
                return Err(SpecError::validation(
                    format!("{handler_base}.custom_operation"),
                    "custom_operation is only allowed with op `custom`",
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

fn validate_child(
    child_base: &str,
    aggregate: &crate::spec::AggregateRoot,
    child: &ChildCollection,
    model: &Model,
) -> Result<(), SpecError> {
    let (ref_table, ref_column) = child.fk.target().ok_or_else(|| {
        SpecError::validation(
            format!("{child_base}.fk.ref"),
            format!(
                "malformed reference `{}`; expected `root_table.root_id_column`",
                child.fk.reference
            ),
        )
    })?;
    if ref_table != aggregate.table {
        return Err(SpecError::validation(
            format!("{child_base}.fk.ref"),
            format!("unknown table `{ref_table}`"),
        ));
    }
    let root_id_column = naming::snake_case(&aggregate.id);
    if ref_column != root_id_column {
        return Err(SpecError::validation(
            format!("{child_base}.fk.ref"),
            format!("`{ref_column}` is not the root identifier column `{root_id_column}`"),
        ));
    }

    if let Some(order) = &child.order {
        if !model.fields.contains_key(&order.field) {
            return Err(SpecError::validation(
                format!("{child_base}.order.field"),
                format!("unknown field `{}` on model `{}`", order.field, child.of),
            ));
        }
        let known_scope_columns: Vec<String> = model
            .fields
            .keys()
            .map(|f| naming::snake_case(f))
            .chain(std::iter::once(naming::snake_case(&child.fk.name)))
            .collect();
        for column in &order.unique_scope {
            if !known_scope_columns.contains(column) {
                return Err(SpecError::validation(
                    format!("{child_base}.order.unique_scope"),
                    format!("unknown column `{column}`"),
                ));
            }
        }
    }

    for field in &child.updatable {
        if !model.fields.contains_key(field) {
            return Err(SpecError::validation(
                format!("{child_base}.updatable"),
                format!("unknown field `{field}` on model `{}`", child.of),
            ));
        }
    }
    Ok(())
}

/// Derive the precomputed view of one service.
///
/// Pure and total over a validated spec; unknown service names fail with a
/// validation error.
pub fn derive(spec: &Spec, service_name: &str) -> Result<ServiceView, SpecError> {
    let service = spec.services.get(service_name).ok_or_else(|| {
        SpecError::validation(
            format!("services.{service_name}"),
            "unknown service".to_string(),
        )
    })?;

    // Which models are owned by which aggregate.
    let mut part_of: IndexMap<&str, &str> = IndexMap::new();
    for (aggregate_name, aggregate) in &service.aggregates {
        for child in aggregate.children.values() {
            part_of.insert(child.of.as_str(), aggregate_name.as_str());
        }
    }

    let models: Vec<ModelView> = service
        .models
        .iter()
        .map(|(name, model)| {
            let snake = naming::snake_case(name);
            let fields: Vec<FieldView> = model
                .fields
                .iter()
                .map(|(fname, field)| FieldView::owned(fname, field))
                .collect();
            let columns = fields
                .iter()
                .cloned()
                .chain(stamp_views(model.options.audit))
                .collect();
            ModelView {
                name: name.clone(),
                go_name: naming::pascal_case(name),
                var_name: naming::lower_camel(name),
                plural: naming::pluralize(&snake),
                table: naming::table_name(name),
                id_column: "id".to_string(),
                fields,
                columns,
                audit: model.options.audit,
                lifecycle: model.options.lifecycle.clone(),
                part_of: part_of.get(name.as_str()).map(|s| s.to_string()),
                snake,
            }
        })
        .collect();

    let aggregates: Vec<AggregateView> = service
        .aggregates
        .iter()
        .map(|(name, aggregate)| {
            let snake = naming::snake_case(name);
            let children = aggregate
                .children
                .iter()
                .map(|(child_name, child)| {
                    let model = &service.models[&child.of];
                    derive_child(child_name, child, model)
                })
                .collect();
            let fields: Vec<FieldView> = aggregate
                .fields
                .iter()
                .filter(|(fname, _)| {
                    *fname != &aggregate.id
                        && Some(fname.as_str()) != aggregate.version_field.as_deref()
                })
                .map(|(fname, field)| FieldView::owned(fname, field))
                .collect();
            let columns = fields
                .iter()
                .cloned()
                .chain(aggregate.version_field.as_deref().map(|version| {
                    FieldView::derived(version, FieldType::Int, FieldClass::Version)
                }))
                .chain(stamp_views(aggregate.audit))
                .collect();
            AggregateView {
                name: name.clone(),
                go_name: naming::pascal_case(name),
                var_name: naming::lower_camel(name),
                plural: naming::pluralize(&snake),
                table: aggregate.table.clone(),
                id_field: aggregate.id.clone(),
                id_go: naming::pascal_case(&aggregate.id),
                id_column: naming::snake_case(&aggregate.id),
                version_field: aggregate.version_field.clone(),
                version_column: aggregate.version_field.as_deref().map(naming::snake_case),
                audit: aggregate.audit,
                soft_delete: aggregate.soft_delete,
                fields,
                columns,
                children,
                snake,
            }
        })
        .collect();

    let handlers: Vec<HandlerView> = service
        .api
        .iter()
        .map(|handler| derive_handler(service, handler))
        .collect();

    Ok(ServiceView {
        name: service_name.to_string(),
        kind: service.kind.clone(),
        backends: service.repo_impl.clone(),
        auth: service.auth.clone(),
        deployment: Deployment::merged(spec.deployment.as_ref(), service.deployment.as_ref()),
        models,
        aggregates,
        handlers,
    })
}

/// Derive views for every service, in document order.
pub fn derive_all(spec: &Spec) -> Result<Vec<ServiceView>, SpecError> {
    spec.services
        .keys()
        .map(|name| derive(spec, name))
        .collect()
}

fn derive_child(child_name: &str, child: &ChildCollection, model: &Model) -> ChildView {
    // Validated upstream; a malformed reference cannot reach here.
    let (root_table, root_id_column) = child
        .fk
        .target()
        .unwrap_or((child.fk.reference.as_str(), "id"));
    let columns = std::iter::once(FieldView::derived(
        &child.fk.name,
        FieldType::Uuid,
        FieldClass::ForeignKey,
    ))
    .chain(
        model
            .fields
            .iter()
            .map(|(fname, field)| FieldView::owned(fname, field)),
    )
    .chain(stamp_views(child.audit))
    .collect();
    ChildView {
        name: child_name.to_string(),
        go_field: naming::pascal_case(child_name),
        json_tag: naming::snake_case(child_name),
        model: child.of.clone(),
        model_go: naming::pascal_case(&child.of),
        model_var: naming::lower_camel(&child.of),
        table: child.table.clone(),
        id_field: child.id.clone(),
        id_go: naming::pascal_case(&child.id),
        id_column: naming::snake_case(&child.id),
        fk_column: naming::snake_case(&child.fk.name),
        fk_go: naming::pascal_case(&child.fk.name),
        root_table: root_table.to_string(),
        root_id_column: root_id_column.to_string(),
        on_delete: child.fk.on_delete,
        order: child.order.as_ref().map(|order| OrderView {
            field: order.field.clone(),
            column: naming::snake_case(&order.field),
            go_name: naming::pascal_case(&order.field),
            unique_scope: order.unique_scope.clone(),
        }),
        updatable_columns: child.updatable.iter().map(|f| naming::snake_case(f)).collect(),
        audit: child.audit,
        unique: child
            .constraints
            .as_ref()
            .map(|c| c.unique.clone())
            .unwrap_or_default(),
        indexes: child
            .constraints
            .as_ref()
            .map(|c| c.indexes.clone())
            .unwrap_or_default(),
        columns,
    }
}

fn derive_handler(service: &crate::spec::Service, handler: &Handler) -> HandlerView {
    let target = if service.aggregates.contains_key(&handler.model) {
        HandlerTarget::Aggregate
    } else {
        HandlerTarget::Model
    };
    let overrides = handler.overrides.clone().unwrap_or_default();
    let model_go = naming::pascal_case(&handler.model);
    let method_name = overrides.method.unwrap_or_else(|| match handler.op {
        Operation::Create => "Create".to_string(),
        Operation::Get => "Get".to_string(),
        Operation::List => "List".to_string(),
        Operation::Update => "Update".to_string(),
        Operation::Delete => "Delete".to_string(),
        Operation::Custom => naming::pascal_case(
            handler
                .custom_operation
                .as_deref()
                .unwrap_or("custom"),
        ),
    });
    HandlerView {
        id: handler.id.clone(),
        method: handler.route.method,
        path: handler.route.path.clone(),
        source: handler.source,
        model: handler.model.clone(),
        target,
        op: handler.op,
        custom_operation: handler.custom_operation.clone(),
        handler_name: overrides
            .handler
            .unwrap_or_else(|| format!("{model_go}Handler")),
        repo_name: overrides
            .repository
            .unwrap_or_else(|| format!("{model_go}Repo")),
        method_name,
    }
}
