//! Relational adapter emission (SQLite dialect).
//!
//! This is the hardest emitter in the generator. For every aggregate it
//! shapes the record behind a transactional unit-of-work adapter: the
//! emitted `Save` updates the root (optionally under a version guard), then
//! reconciles each child collection with a deterministic diff applied as
//! deletes, then inserts, then updates. All SQL text, argument lists, scan
//! lists, change comparisons, and chunk sizes are computed here; the
//! template only interpolates.

use serde::Serialize;

use monoforge_core::naming;
use monoforge_core::resolver::{
    AggregateView, ChildView, FieldClass, FieldView, ModelView, ServiceView,
};
use monoforge_core::spec::{Backend, FieldType, OnDelete};

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;
use super::handler::repo_name_for;

/// Parameter ceiling of the SQLite dialect. Batched statements are chunked
/// so no statement ever carries more placeholders than this.
pub(crate) const MAX_PARAMS: usize = 999;

#[derive(Serialize)]
pub(crate) struct NamedSql {
    name: String,
    sql: String,
}

#[derive(Serialize)]
struct QueriesRecord {
    service: String,
    lib_import: String,
    queries: Vec<NamedSql>,
    schemas: Vec<NamedSql>,
}

#[derive(Serialize)]
struct ModelRepoRecord {
    service_package: String,
    service_import: String,
    lib_import: String,
    go_name: String,
    repo_type: String,
    interface: String,
    audit: bool,
    lifecycle: Vec<String>,
    create_const: String,
    get_const: String,
    list_const: String,
    update_const: String,
    delete_const: String,
    insert_args: String,
    scan_args: String,
    update_args: String,
}

#[derive(Serialize)]
struct Carry {
    dst: String,
    src: String,
}

#[derive(Serialize)]
pub(crate) struct ChildRepoRecord {
    go_field: String,
    fn_suffix: String,
    model_go: String,
    model_var: String,
    id_go: String,
    id_column: String,
    fk_go: String,
    table: String,
    audit: bool,
    order_go: Option<String>,
    cascade: bool,
    select_const: String,
    insert_prefix_const: String,
    update_const: String,
    delete_by_fk_const: String,
    placeholder_group: String,
    pub(crate) column_count: usize,
    pub(crate) chunk_rows: usize,
    insert_args: String,
    scan_args: String,
    update_args: String,
    pub(crate) change_checks: String,
    carries: Vec<Carry>,
}

#[derive(Serialize)]
pub(crate) struct AggregateRepoRecord {
    service_package: String,
    service_import: String,
    lib_import: String,
    go_name: String,
    repo_type: String,
    interface: String,
    id_go: String,
    version_go: Option<String>,
    audit: bool,
    soft_delete: bool,
    pub(crate) consts: Vec<NamedSql>,
    insert_const: String,
    select_const: String,
    update_const: String,
    delete_const: String,
    ids_const: String,
    insert_args: String,
    scan_args: String,
    update_args: String,
    pub(crate) children: Vec<ChildRepoRecord>,
}

impl AggregateRepoRecord {
    #[cfg(test)]
    pub(crate) fn const_sql(&self, name: &str) -> Option<&str> {
        self.consts
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.sql.as_str())
    }
}

fn sql_type(ty: FieldType) -> &'static str {
    match ty {
        FieldType::Text | FieldType::String | FieldType::Email | FieldType::Uuid => "TEXT",
        FieldType::Bool | FieldType::Int => "INTEGER",
        FieldType::Decimal => "REAL",
        FieldType::Datetime => "TIMESTAMP",
        FieldType::Json => "TEXT",
    }
}

/// A (column name, Go expression) pair; the unit everything below is built
/// from.
type Column = (String, String);

fn named(recv: &str, field: &FieldView) -> Column {
    (field.column.clone(), format!("{recv}.{}", field.go_name))
}

fn columns(recv: &str, fields: &[FieldView]) -> Vec<Column> {
    fields.iter().map(|f| named(recv, f)).collect()
}

/// The audit columns an UPDATE statement restamps; the creation stamps are
/// immutable once written.
fn is_update_stamp(field: &FieldView) -> bool {
    field.class == FieldClass::Audit
        && (field.column == "updated_at" || field.column == "updated_by")
}

fn names(cols: &[Column]) -> String {
    cols.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>().join(", ")
}

fn exprs(cols: &[Column]) -> String {
    cols.iter().map(|(_, e)| e.as_str()).collect::<Vec<_>>().join(", ")
}

fn scans(cols: &[Column]) -> String {
    cols.iter()
        .map(|(_, e)| format!("&{e}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn qmarks(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn assignments(cols: &[Column]) -> String {
    cols.iter()
        .map(|(n, _)| format!("{n} = ?"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn compare(prev: &str, cur: &str, field: &FieldView) -> String {
    // json documents are byte slices; compare by value, not identity.
    if field.ty == FieldType::Json {
        format!("string({prev}.{go}) != string({cur}.{go})", go = field.go_name)
    } else {
        format!("{prev}.{go} != {cur}.{go}", go = field.go_name)
    }
}

/// Query constants for one standalone model (`QueryCreateItem`, ...).
fn model_query_consts(model: &ModelView) -> Vec<NamedSql> {
    let mut cols = vec![("id".to_string(), "m.ID".to_string())];
    cols.extend(columns("m", &model.columns));
    let col_names = names(&cols);
    let table = &model.table;

    let sets: Vec<Column> = model
        .columns
        .iter()
        .filter(|f| f.class == FieldClass::Owned || is_update_stamp(f))
        .map(|f| named("m", f))
        .collect();

    vec![
        NamedSql {
            name: format!("QueryCreate{}", model.go_name),
            sql: format!(
                "INSERT INTO {table} ({col_names}) VALUES ({})",
                qmarks(cols.len())
            ),
        },
        NamedSql {
            name: format!("QueryGet{}", model.go_name),
            sql: format!("SELECT {col_names} FROM {table} WHERE id = ?"),
        },
        NamedSql {
            name: format!("QueryList{}", model.go_name),
            sql: format!("SELECT {col_names} FROM {table} ORDER BY created_at, id"),
        },
        NamedSql {
            name: format!("QueryUpdate{}", model.go_name),
            sql: format!("UPDATE {table} SET {} WHERE id = ?", assignments(&sets)),
        },
        NamedSql {
            name: format!("QueryDelete{}", model.go_name),
            sql: format!("DELETE FROM {table} WHERE id = ?"),
        },
    ]
}

fn model_repo_record(layout: &Layout, view: &ServiceView, model: &ModelView) -> ModelRepoRecord {
    let mut cols = vec![("id".to_string(), "m.ID".to_string())];
    cols.extend(columns("m", &model.columns));

    let mut update_exprs: Vec<String> = model
        .columns
        .iter()
        .filter(|f| f.class == FieldClass::Owned || is_update_stamp(f))
        .map(|f| format!("m.{}", f.go_name))
        .collect();
    update_exprs.push("m.ID".to_string());

    ModelRepoRecord {
        service_package: view.name.clone(),
        service_import: layout.service_import(&view.name),
        lib_import: layout.lib_module(),
        go_name: model.go_name.clone(),
        repo_type: format!("{}Repository", model.go_name),
        interface: repo_name_for(view, &model.name, &model.go_name),
        audit: model.audit,
        lifecycle: model
            .lifecycle
            .iter()
            .map(|hook| format!("{}.{hook}", model.snake))
            .collect(),
        create_const: format!("QueryCreate{}", model.go_name),
        get_const: format!("QueryGet{}", model.go_name),
        list_const: format!("QueryList{}", model.go_name),
        update_const: format!("QueryUpdate{}", model.go_name),
        delete_const: format!("QueryDelete{}", model.go_name),
        insert_args: exprs(&cols),
        scan_args: scans(&cols),
        update_args: update_exprs.join(", "),
    }
}

fn child_record(aggregate: &AggregateView, child: &ChildView) -> ChildRepoRecord {
    let mut cols = vec![(child.id_column.clone(), format!("c.{}", child.id_go))];
    cols.extend(columns("c", &child.columns));

    let column_count = cols.len();
    let chunk_rows = (MAX_PARAMS / column_count).max(1);
    let prefix = format!("{}{}", aggregate.var_name, child.go_field);
    let order_column = child.order.as_ref().map(|o| o.column.clone());

    // Columns the emitted UPDATE addresses: the updatable list, the order
    // column (reorder), and the update stamps. Only owned columns qualify
    // for the first two; the stamps come from their classification.
    let mut set_cols: Vec<Column> = Vec::new();
    let mut checks: Vec<String> = Vec::new();
    for column in &child.updatable_columns {
        if let Some(field) = child
            .columns
            .iter()
            .find(|f| f.class == FieldClass::Owned && &f.column == column)
        {
            set_cols.push(named("c", field));
            checks.push(compare("prev", "c", field));
        }
    }
    if let Some(order) = &child.order {
        if !child.updatable_columns.contains(&order.column) {
            if let Some(field) = child
                .columns
                .iter()
                .find(|f| f.class == FieldClass::Owned && f.column == order.column)
            {
                set_cols.push(named("c", field));
                checks.push(compare("prev", "c", field));
            }
        }
    }
    set_cols.extend(
        child
            .columns
            .iter()
            .filter(|f| is_update_stamp(f))
            .map(|f| named("c", f)),
    );

    let mut update_exprs: Vec<String> = set_cols.iter().map(|(_, e)| e.clone()).collect();
    update_exprs.push(format!("c.{}", child.id_go));

    // Owned columns outside the updatable list (and the order column) are
    // read-only for the diff; stamps carry over until the diff restamps
    // them. The foreign key is reassigned by the save path itself.
    let mut carries: Vec<Carry> = Vec::new();
    for field in &child.columns {
        let keep = match field.class {
            FieldClass::Owned => {
                !child.updatable_columns.contains(&field.column)
                    && order_column.as_deref() != Some(field.column.as_str())
            }
            FieldClass::Audit => true,
            FieldClass::Version | FieldClass::ForeignKey => false,
        };
        if keep {
            carries.push(Carry {
                dst: format!("c.{}", field.go_name),
                src: format!("prev.{}", field.go_name),
            });
        }
    }

    ChildRepoRecord {
        go_field: child.go_field.clone(),
        fn_suffix: format!("{}{}", aggregate.go_name, child.go_field),
        model_go: child.model_go.clone(),
        model_var: child.model_var.clone(),
        id_go: child.id_go.clone(),
        id_column: child.id_column.clone(),
        fk_go: child.fk_go.clone(),
        table: child.table.clone(),
        audit: child.audit,
        order_go: child.order.as_ref().map(|o| o.go_name.clone()),
        cascade: child.on_delete == OnDelete::Cascade,
        select_const: format!("{prefix}SelectQuery"),
        insert_prefix_const: format!("{prefix}InsertPrefix"),
        update_const: format!("{prefix}UpdateQuery"),
        delete_by_fk_const: format!("{prefix}DeleteByFkQuery"),
        placeholder_group: format!("({})", qmarks(column_count)),
        column_count,
        chunk_rows,
        insert_args: exprs(&cols),
        scan_args: scans(&cols),
        update_args: update_exprs.join(", "),
        change_checks: checks.join(" || "),
        carries,
    }
}

fn child_consts(child: &ChildView, record: &ChildRepoRecord, set_sql: &str) -> Vec<NamedSql> {
    let mut cols = vec![(child.id_column.clone(), String::new())];
    cols.extend(
        child
            .columns
            .iter()
            .map(|f| (f.column.clone(), String::new())),
    );
    let col_names = names(&cols);
    let table = &child.table;
    let order_by = child
        .order
        .as_ref()
        .map(|o| o.column.clone())
        .unwrap_or_else(|| "created_at".to_string());

    vec![
        NamedSql {
            name: record.select_const.clone(),
            sql: format!(
                "SELECT {col_names} FROM {table} WHERE {fk} = ? ORDER BY {order_by}, {id}",
                fk = child.fk_column,
                id = child.id_column,
            ),
        },
        NamedSql {
            name: record.insert_prefix_const.clone(),
            sql: format!("INSERT INTO {table} ({col_names}) VALUES "),
        },
        NamedSql {
            name: record.update_const.clone(),
            sql: format!(
                "UPDATE {table} SET {set_sql} WHERE {id} = ?",
                id = child.id_column
            ),
        },
        NamedSql {
            name: record.delete_by_fk_const.clone(),
            sql: format!("DELETE FROM {table} WHERE {fk} = ?", fk = child.fk_column),
        },
    ]
}

/// Shape the full record behind one aggregate's unit-of-work adapter.
pub(crate) fn aggregate_repo_record(
    layout: &Layout,
    view: &ServiceView,
    aggregate: &AggregateView,
) -> AggregateRepoRecord {
    let version = aggregate
        .columns
        .iter()
        .find(|f| f.class == FieldClass::Version);
    let version_go = version.map(|f| f.go_name.clone());

    let mut cols = vec![(
        aggregate.id_column.clone(),
        format!("agg.{}", aggregate.id_go),
    )];
    cols.extend(columns("agg", &aggregate.columns));

    let col_names = names(&cols);
    let table = &aggregate.table;
    let var = &aggregate.var_name;
    let alive = if aggregate.soft_delete {
        " AND deleted_at IS NULL"
    } else {
        ""
    };

    // Root UPDATE: owned fields, update stamps, and the version guard that
    // both checks and increments in one statement.
    let set_cols: Vec<Column> = aggregate
        .columns
        .iter()
        .filter(|f| f.class == FieldClass::Owned || is_update_stamp(f))
        .map(|f| named("agg", f))
        .collect();
    let mut set_sql = assignments(&set_cols);
    let mut update_exprs: Vec<String> = set_cols.iter().map(|(_, e)| e.clone()).collect();
    update_exprs.push(format!("agg.{}", aggregate.id_go));
    let mut update_where = format!("{} = ?", aggregate.id_column);
    if let Some(version) = version {
        set_sql.push_str(&format!(", {col} = {col} + 1", col = version.column));
        update_where.push_str(&format!(" AND {} = ?", version.column));
        update_exprs.push(format!("agg.{}", version.go_name));
    }

    let insert_const = format!("{var}InsertQuery");
    let select_const = format!("{var}SelectQuery");
    let update_const = format!("{var}UpdateQuery");
    let delete_const = format!("{var}DeleteQuery");
    let ids_const = format!("{var}IDsQuery");

    let mut consts = vec![
        NamedSql {
            name: insert_const.clone(),
            sql: format!(
                "INSERT INTO {table} ({col_names}) VALUES ({})",
                qmarks(cols.len())
            ),
        },
        NamedSql {
            name: select_const.clone(),
            sql: format!(
                "SELECT {col_names} FROM {table} WHERE {id} = ?{alive}",
                id = aggregate.id_column
            ),
        },
        NamedSql {
            name: update_const.clone(),
            sql: format!("UPDATE {table} SET {set_sql} WHERE {update_where}{alive}"),
        },
        NamedSql {
            name: delete_const.clone(),
            sql: if aggregate.soft_delete {
                format!(
                    "UPDATE {table} SET deleted_at = ? WHERE {id} = ? AND deleted_at IS NULL",
                    id = aggregate.id_column
                )
            } else {
                format!("DELETE FROM {table} WHERE {id} = ?", id = aggregate.id_column)
            },
        },
        NamedSql {
            name: ids_const.clone(),
            sql: format!(
                "SELECT {id} FROM {table}{} ORDER BY created_at, {id}",
                if aggregate.soft_delete {
                    " WHERE deleted_at IS NULL"
                } else {
                    ""
                },
                id = aggregate.id_column
            ),
        },
    ];

    let mut children = Vec::with_capacity(aggregate.children.len());
    for child in &aggregate.children {
        let record = child_record(aggregate, child);

        let mut child_set: Vec<Column> = Vec::new();
        for column in &child.updatable_columns {
            child_set.push((column.clone(), String::new()));
        }
        if let Some(order) = &child.order {
            if !child.updatable_columns.contains(&order.column) {
                child_set.push((order.column.clone(), String::new()));
            }
        }
        child_set.extend(
            child
                .columns
                .iter()
                .filter(|f| is_update_stamp(f))
                .map(|f| (f.column.clone(), String::new())),
        );
        consts.extend(child_consts(child, &record, &assignments(&child_set)));
        children.push(record);
    }

    AggregateRepoRecord {
        service_package: view.name.clone(),
        service_import: layout.service_import(&view.name),
        lib_import: layout.lib_module(),
        go_name: aggregate.go_name.clone(),
        repo_type: format!("{}Repository", aggregate.go_name),
        interface: repo_name_for(view, &aggregate.name, &aggregate.go_name),
        id_go: aggregate.id_go.clone(),
        version_go,
        audit: aggregate.audit,
        soft_delete: aggregate.soft_delete,
        consts,
        insert_const,
        select_const,
        update_const,
        delete_const,
        ids_const,
        insert_args: exprs(&cols),
        scan_args: scans(&cols),
        update_args: update_exprs.join(", "),
        children,
    }
}

fn table_ddl(table: &str, body: Vec<String>) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (\n\t{}\n)",
        body.join(",\n\t")
    )
}

fn index_ddl(unique: bool, table: &str, columns: &[String]) -> NamedSql {
    let kind = if unique { "UNIQUE INDEX" } else { "INDEX" };
    let idx = format!("idx_{table}_{}", columns.join("_"));
    NamedSql {
        name: format!("Index{}", naming::pascal_case(&idx.replace("idx_", ""))),
        sql: format!(
            "CREATE {kind} IF NOT EXISTS {idx} ON {table} ({})",
            columns.join(", ")
        ),
    }
}

/// DDL for one classified column. Creation and update stamps are NOT NULL,
/// actor columns stay nullable, the version column carries its default.
fn column_ddl(field: &FieldView) -> String {
    match field.class {
        FieldClass::Version => format!("{} INTEGER NOT NULL DEFAULT 0", field.column),
        FieldClass::Audit if field.ty == FieldType::Datetime => {
            format!("{} TIMESTAMP NOT NULL", field.column)
        }
        _ => format!("{} {}", field.column, sql_type(field.ty)),
    }
}

/// Schema hints for every table the service persists, including the
/// fk-scoped unique order index that the diff's apply order protects.
pub(crate) fn schema_hints(view: &ServiceView) -> Vec<NamedSql> {
    let mut out = Vec::new();

    for model in view.standalone_models() {
        let mut body = vec!["id TEXT PRIMARY KEY".to_string()];
        body.extend(model.columns.iter().map(column_ddl));
        out.push(NamedSql {
            name: format!("Schema{}", naming::pascal_case(&model.table)),
            sql: table_ddl(&model.table, body),
        });
    }

    for aggregate in &view.aggregates {
        let mut body = vec![format!("{} TEXT PRIMARY KEY", aggregate.id_column)];
        body.extend(aggregate.columns.iter().map(column_ddl));
        if aggregate.soft_delete {
            body.push("deleted_at TIMESTAMP".to_string());
        }
        out.push(NamedSql {
            name: format!("Schema{}", naming::pascal_case(&aggregate.table)),
            sql: table_ddl(&aggregate.table, body),
        });

        for child in &aggregate.children {
            let on_delete = match child.on_delete {
                OnDelete::Cascade => "CASCADE",
                OnDelete::Restrict => "RESTRICT",
            };
            let mut body = vec![format!("{} TEXT PRIMARY KEY", child.id_column)];
            for field in &child.columns {
                if field.class == FieldClass::ForeignKey {
                    body.push(format!(
                        "{} TEXT NOT NULL REFERENCES {} ({}) ON DELETE {on_delete}",
                        field.column, child.root_table, child.root_id_column
                    ));
                } else {
                    body.push(column_ddl(field));
                }
            }
            out.push(NamedSql {
                name: format!("Schema{}", naming::pascal_case(&child.table)),
                sql: table_ddl(&child.table, body),
            });

            out.push(index_ddl(false, &child.table, &[child.fk_column.clone()]));
            if let Some(order) = &child.order {
                if !order.unique_scope.is_empty() {
                    out.push(index_ddl(true, &child.table, &order.unique_scope));
                }
            }
            for group in &child.unique {
                out.push(index_ddl(true, &child.table, group));
            }
            for group in &child.indexes {
                out.push(index_ddl(false, &child.table, group));
            }
        }
    }
    out
}

/// Emit the whole relational surface of one service: the package
/// infrastructure and query constants, plain per-model adapters, and
/// aggregate-aware unit-of-work adapters.
pub fn emit_sqlite(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.backend_dir(&view.name, Backend::Sqlite);

    let mut queries = Vec::new();
    for model in view.standalone_models() {
        queries.extend(model_query_consts(model));
    }
    let record = QueriesRecord {
        service: view.name.clone(),
        lib_import: layout.lib_module(),
        queries,
        schemas: schema_hints(view),
    };
    emit(registry, "queries_sqlite", &dir.join("queries.go"), &record)?;

    for model in view.standalone_models() {
        let record = model_repo_record(layout, view, model);
        let path = dir.join(format!("repo_{}.go", model.snake));
        emit(registry, "repo_sqlite", &path, &record)?;
    }

    for aggregate in &view.aggregates {
        let record = aggregate_repo_record(layout, view, aggregate);
        let path = dir.join(format!("repo_{}.go", aggregate.snake));
        emit(registry, "aggregate_repo_sqlite", &path, &record)?;
    }
    Ok(())
}
