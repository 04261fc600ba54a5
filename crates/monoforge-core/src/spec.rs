//! The normalized, in-memory specification model.
//!
//! One YAML document describes the whole multi-service repository. Decoding
//! is strict: unknown keys are rejected, and every mapping that influences
//! output ordering decodes into an [`IndexMap`] so that the document order is
//! preserved and reruns are byte-identical.
//!
//! The spec is constructed once per run and never mutated afterwards; every
//! emitter receives a read-only view.

use indexmap::IndexMap;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::naming;

/// Root of the specification document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Spec {
    /// Schema version of the document; only version 1 is recognized.
    pub schema_version: u32,
    /// Optional display name of the generated repository.
    #[serde(default)]
    pub name: Option<String>,
    /// Module-path prefix for every generated Go module.
    #[serde(default)]
    pub package_root: Option<String>,
    /// Repository-wide deployment descriptor; services may override it.
    #[serde(default)]
    pub deployment: Option<Deployment>,
    /// Services keyed by service name, in document order.
    #[serde(default)]
    pub services: IndexMap<String, Service>,
}

impl Spec {
    /// The sanitized repository name: lowercased, spaces/hyphens mapped to
    /// underscores, everything outside `[a-z0-9_]` dropped. Falls back to
    /// `monorepo` when the document declares no name.
    pub fn sanitized_name(&self) -> String {
        match &self.name {
            Some(name) => naming::sanitize(name),
            None => "monorepo".to_string(),
        }
    }

    /// The module-path prefix for generated modules. Defaults to
    /// `example.com/<sanitized-name>` when `package_root` is absent.
    pub fn module_root(&self) -> String {
        match &self.package_root {
            Some(root) => root.trim_end_matches('/').to_string(),
            None => format!("example.com/{}", self.sanitized_name()),
        }
    }
}

/// A single service in the repository.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    /// Opaque service discriminator (`atom`, `domain`, `composite`, `web`,
    /// `auth`, `authz`, ...). Not interpreted by the generator beyond being
    /// carried into deployment metadata.
    pub kind: String,
    /// Storage backends, primary first. Accepts a single scalar or a
    /// sequence; both normalize to an ordered list.
    #[serde(default, deserialize_with = "one_or_many_backends")]
    pub repo_impl: Vec<Backend>,
    /// Optional authentication block, surfaced into the service config.
    #[serde(default)]
    pub auth: Option<Auth>,
    /// Service-level deployment override.
    #[serde(default)]
    pub deployment: Option<Deployment>,
    /// Domain models keyed by model name.
    #[serde(default)]
    pub models: IndexMap<String, Model>,
    /// Aggregate roots keyed by aggregate name.
    #[serde(default)]
    pub aggregates: IndexMap<String, AggregateRoot>,
    /// Declared HTTP handler surface.
    #[serde(default)]
    pub api: Vec<Handler>,
}

/// Recognized storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Relational store, SQLite dialect.
    Sqlite,
    /// Relational store, PostgreSQL dialect. Recognized but not emitted yet;
    /// the resolver rejects it with a path-bearing error.
    Postgres,
    /// Document store (MongoDB).
    Mongo,
}

impl Backend {
    /// Directory / package name for the backend's adapter tree.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgres => "postgres",
            Backend::Mongo => "mongo",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn one_or_many_backends<'de, D>(deserializer: D) -> Result<Vec<Backend>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Backend),
        Many(Vec<Backend>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(backend) => vec![backend],
        OneOrMany::Many(backends) => backends,
    })
}

/// Authentication block. Parsed and carried into the generated service
/// config; no authentication happens at generation time.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Auth {
    /// Authentication kind (`jwt`, `session`, ...). Opaque to the generator.
    pub kind: String,
    /// Token issuer, when applicable.
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected token audience, when applicable.
    #[serde(default)]
    pub audience: Option<String>,
}

/// Deployment descriptor for the orchestrator platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Deployment {
    /// Target platform. Only `nomad` descriptors are rendered.
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Datacenters the job is eligible for.
    #[serde(default)]
    pub datacenters: Vec<String>,
    /// Optional platform namespace.
    #[serde(default)]
    pub namespace: Option<String>,
    /// Instance count.
    #[serde(default)]
    pub count: Option<u32>,
    /// CPU reservation in MHz.
    #[serde(default)]
    pub cpu: Option<u32>,
    /// Memory reservation in MB.
    #[serde(default)]
    pub memory: Option<u32>,
}

fn default_platform() -> String {
    "nomad".to_string()
}

impl Deployment {
    /// Merge a service-level override over a repository-wide descriptor.
    /// Scalar fields from `over` win when present.
    pub fn merged(base: Option<&Deployment>, over: Option<&Deployment>) -> Option<Deployment> {
        match (base, over) {
            (None, None) => None,
            (Some(d), None) | (None, Some(d)) => Some(d.clone()),
            (Some(base), Some(over)) => Some(Deployment {
                platform: over.platform.clone(),
                datacenters: if over.datacenters.is_empty() {
                    base.datacenters.clone()
                } else {
                    over.datacenters.clone()
                },
                namespace: over.namespace.clone().or_else(|| base.namespace.clone()),
                count: over.count.or(base.count),
                cpu: over.cpu.or(base.cpu),
                memory: over.memory.or(base.memory),
            }),
        }
    }
}

/// A domain model: an ordered set of fields plus options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Model {
    /// Fields keyed by field name, in document order.
    pub fields: IndexMap<String, Field>,
    /// Model options.
    #[serde(default)]
    pub options: ModelOptions,
}

/// Options attached to a model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelOptions {
    /// Stamp audit columns on this model.
    #[serde(default)]
    pub audit: bool,
    /// Named lifecycle hooks, emitted as shared-library helper calls.
    #[serde(default)]
    pub lifecycle: Vec<String>,
}

/// A single field of a model or aggregate root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Field {
    /// Field type.
    #[serde(rename = "type")]
    pub ty: FieldType,
    /// Default value, carried verbatim into emitted code where sensible.
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
    /// Ordered validation rules.
    #[serde(default)]
    pub validations: Vec<Validation>,
}

/// Enumerated field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free-form text.
    Text,
    /// Short string.
    String,
    /// Email address (string with email validation semantics).
    Email,
    /// Boolean.
    Bool,
    /// UUID, persisted as text.
    Uuid,
    /// 64-bit integer.
    Int,
    /// Decimal number.
    Decimal,
    /// Timestamp.
    Datetime,
    /// Opaque JSON document.
    Json,
}

/// A validation rule attached to a field.
///
/// Accepts either a bare rule name (`- required`) or a mapping with a value
/// (`- {name: min_length, value: 3}`).
#[derive(Debug, Clone, Serialize)]
pub struct Validation {
    /// The rule.
    pub rule: ValidationRule,
    /// Rule argument, when the rule takes one.
    pub value: Option<serde_yaml::Value>,
}

impl<'de> Deserialize<'de> for Validation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Full {
            name: ValidationRule,
            #[serde(default)]
            value: Option<serde_yaml::Value>,
        }
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shorthand {
            Bare(ValidationRule),
            Full(Full),
        }
        Ok(match Shorthand::deserialize(deserializer)? {
            Shorthand::Bare(rule) => Validation { rule, value: None },
            Shorthand::Full(full) => Validation {
                rule: full.name,
                value: full.value,
            },
        })
    }
}

/// Recognized validation rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationRule {
    /// Value must be present and non-empty.
    Required,
    /// Value must look like an email address.
    Email,
    /// Minimum string length.
    MinLength,
    /// Maximum string length.
    MaxLength,
    /// Minimum numeric value.
    Min,
    /// Maximum numeric value.
    Max,
    /// Value must be unique among persisted rows. Emitted as a stub intended
    /// to be extended with a repository dependency.
    Unique,
    /// Value must match a named format.
    Format,
}

/// An aggregate root: a consistency boundary owning child collections.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateRoot {
    /// Physical table name in the relational store.
    pub table: String,
    /// Identifier field name.
    #[serde(default = "default_id_field")]
    pub id: String,
    /// Version column enabling optimistic concurrency on the root.
    #[serde(default)]
    pub version_field: Option<String>,
    /// Root fields keyed by field name.
    #[serde(default)]
    pub fields: IndexMap<String, Field>,
    /// Stamp audit columns on the root.
    #[serde(default)]
    pub audit: bool,
    /// Root deletes become `deleted_at` stamps instead of row removal.
    #[serde(default)]
    pub soft_delete: bool,
    /// Child collections keyed by collection name.
    #[serde(default)]
    pub children: IndexMap<String, ChildCollection>,
}

fn default_id_field() -> String {
    "id".to_string()
}

/// A child collection owned by an aggregate root.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChildCollection {
    /// Name of the child model, which must exist in the same service.
    pub of: String,
    /// Physical child table name.
    pub table: String,
    /// Foreign key tying each child row to its root.
    pub fk: ForeignKey,
    /// Child identifier field name.
    #[serde(default = "default_id_field")]
    pub id: String,
    /// Declared ordering of the collection.
    #[serde(default)]
    pub order: Option<ChildOrder>,
    /// Child fields that may be mutated in place by the save diff. All other
    /// fields are read-only once inserted.
    #[serde(default)]
    pub updatable: Vec<String>,
    /// Stamp audit columns on child rows.
    #[serde(default)]
    pub audit: bool,
    /// Schema constraint hints.
    #[serde(default)]
    pub constraints: Option<Constraints>,
}

/// Foreign key declaration for a child collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKey {
    /// Foreign-key column name on the child table.
    pub name: String,
    /// Reference in `root_table.root_id_column` form.
    #[serde(rename = "ref")]
    pub reference: String,
    /// Delete policy.
    #[serde(default)]
    pub on_delete: OnDelete,
}

impl ForeignKey {
    /// Split `reference` into `(table, column)`; `None` when malformed.
    pub fn target(&self) -> Option<(&str, &str)> {
        let (table, column) = self.reference.split_once('.')?;
        if table.is_empty() || column.is_empty() || column.contains('.') {
            return None;
        }
        Some((table, column))
    }
}

/// Foreign-key delete policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDelete {
    /// Children must be deleted before the root.
    #[default]
    Restrict,
    /// The backend cascades child deletion from the root.
    Cascade,
}

/// Declared ordering of a child collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChildOrder {
    /// Child field holding the position.
    pub field: String,
    /// Columns the order value must be unique within (typically the FK).
    #[serde(default)]
    pub unique_scope: Vec<String>,
}

/// Schema constraint hints for a child table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    /// Unique column groups.
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    /// Plain index column groups.
    #[serde(default)]
    pub indexes: Vec<Vec<String>>,
}

/// A declared HTTP handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Handler {
    /// Stable handler id, unique within the service.
    pub id: String,
    /// Route (method plus path pattern), unique within the service.
    pub route: Route,
    /// Where the handler delegates to.
    #[serde(default)]
    pub source: HandlerSource,
    /// Model (or aggregate) the handler operates on.
    pub model: String,
    /// Operation.
    pub op: Operation,
    /// Name of the custom operation when `op` is `custom`.
    #[serde(default)]
    pub custom_operation: Option<String>,
    /// Overrides for inferred names.
    #[serde(default)]
    pub overrides: Option<HandlerOverrides>,
}

/// Route of a handler. Accepts either a `"METHOD /path"` scalar or a mapping
/// with explicit `method` and `path` keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    /// HTTP method.
    pub method: HttpMethod,
    /// Path pattern, e.g. `/lists/{id}`.
    pub path: String,
}

impl<'de> Deserialize<'de> for Route {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(deny_unknown_fields)]
        struct Full {
            method: HttpMethod,
            path: String,
        }
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shorthand {
            Scalar(String),
            Full(Full),
        }
        match Shorthand::deserialize(deserializer)? {
            Shorthand::Full(full) => Ok(Route {
                method: full.method,
                path: full.path,
            }),
            Shorthand::Scalar(s) => {
                let (method, path) = s
                    .split_once(' ')
                    .ok_or_else(|| de::Error::custom("expected \"METHOD /path\""))?;
                let method = method
                    .to_uppercase()
                    .parse::<HttpMethod>()
                    .map_err(de::Error::custom)?;
                Ok(Route {
                    method,
                    path: path.trim().to_string(),
                })
            }
        }
    }
}

/// HTTP methods accepted in routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

impl HttpMethod {
    /// Canonical uppercase spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            other => Err(format!("unknown HTTP method `{other}`")),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a handler delegates to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerSource {
    /// Straight to the repository.
    #[default]
    Repo,
    /// Through the model's service interface.
    Service,
    /// Through a named use case.
    Usecase,
}

/// Handler operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Create a resource.
    Create,
    /// Fetch one resource by id.
    Get,
    /// List resources.
    List,
    /// Update a resource.
    Update,
    /// Delete a resource.
    Delete,
    /// A named custom operation.
    Custom,
}

/// Overrides for inferred repository/method/handler names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerOverrides {
    /// Repository type name override.
    #[serde(default)]
    pub repository: Option<String>,
    /// Repository method name override.
    #[serde(default)]
    pub method: Option<String>,
    /// Handler type name override.
    #[serde(default)]
    pub handler: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_impl_scalar_normalizes_to_list() {
        let yaml = r#"
kind: atom
repo_impl: sqlite
"#;
        let service: Service = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(service.repo_impl, vec![Backend::Sqlite]);
    }

    #[test]
    fn test_repo_impl_sequence_preserves_order() {
        let yaml = r#"
kind: domain
repo_impl: [mongo, sqlite]
"#;
        let service: Service = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(service.repo_impl, vec![Backend::Mongo, Backend::Sqlite]);
    }

    #[test]
    fn test_unknown_backend_is_a_parse_error() {
        let yaml = r#"
kind: atom
repo_impl: cassandra
"#;
        assert!(serde_yaml::from_str::<Service>(yaml).is_err());
    }

    #[test]
    fn test_route_scalar_shorthand() {
        let route: Route = serde_yaml::from_str("GET /todos/{id}").unwrap();
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.path, "/todos/{id}");
    }

    #[test]
    fn test_route_mapping_form() {
        let route: Route = serde_yaml::from_str("{method: POST, path: /todos}").unwrap();
        assert_eq!(route.method, HttpMethod::Post);
        assert_eq!(route.path, "/todos");
    }

    #[test]
    fn test_validation_shorthand_and_full_form() {
        let field: Field = serde_yaml::from_str(
            r#"
type: text
validations:
  - required
  - name: min_length
    value: 3
"#,
        )
        .unwrap();
        assert_eq!(field.validations.len(), 2);
        assert_eq!(field.validations[0].rule, ValidationRule::Required);
        assert_eq!(field.validations[1].rule, ValidationRule::MinLength);
        assert_eq!(
            field.validations[1].value,
            Some(serde_yaml::Value::from(3u64))
        );
    }

    #[test]
    fn test_fk_target_split() {
        let fk = ForeignKey {
            name: "list_id".into(),
            reference: "lists.id".into(),
            on_delete: OnDelete::Cascade,
        };
        assert_eq!(fk.target(), Some(("lists", "id")));

        let bad = ForeignKey {
            name: "x".into(),
            reference: "nodot".into(),
            on_delete: OnDelete::Restrict,
        };
        assert_eq!(bad.target(), None);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let yaml = r#"
kind: atom
surprise: true
"#;
        assert!(serde_yaml::from_str::<Service>(yaml).is_err());
    }

    #[test]
    fn test_sanitized_name_and_module_root() {
        let spec: Spec = serde_yaml::from_str("{schema_version: 1, name: Todo App}").unwrap();
        assert_eq!(spec.sanitized_name(), "todo_app");
        assert_eq!(spec.module_root(), "example.com/todo_app");

        let spec: Spec =
            serde_yaml::from_str("{schema_version: 1, package_root: github.com/acme/stack}")
                .unwrap();
        assert_eq!(spec.module_root(), "github.com/acme/stack");
    }

    #[test]
    fn test_deployment_merge_prefers_override_scalars() {
        let base = Deployment {
            platform: "nomad".into(),
            datacenters: vec!["dc1".into()],
            namespace: Some("prod".into()),
            count: Some(2),
            cpu: Some(500),
            memory: Some(256),
        };
        let over = Deployment {
            platform: "nomad".into(),
            datacenters: vec![],
            namespace: None,
            count: Some(4),
            cpu: None,
            memory: None,
        };
        let merged = Deployment::merged(Some(&base), Some(&over)).unwrap();
        assert_eq!(merged.count, Some(4));
        assert_eq!(merged.cpu, Some(500));
        assert_eq!(merged.datacenters, vec!["dc1".to_string()]);
        assert_eq!(merged.namespace.as_deref(), Some("prod"));
    }
}
