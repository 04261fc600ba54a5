//! Validator emission.
//!
//! One pure function per model per operation. Create and update validators
//! accumulate every failed rule; update validators additionally require an
//! identifier, delete validators require only the identifier. Uniqueness is
//! stubbed with a note: enforcing it takes a repository dependency the
//! consumer wires in.

use serde::Serialize;

use monoforge_core::resolver::{FieldView, ServiceView};
use monoforge_core::spec::{FieldType, Validation, ValidationRule};

use crate::error::ForgeError;
use crate::layout::Layout;
use crate::registry::Registry;

use super::emit;

#[derive(Serialize)]
struct CheckRecord {
    condition: String,
    field: String,
    code: String,
    detail: String,
}

#[derive(Serialize)]
struct ValidatorRecord {
    package: String,
    lib_import: String,
    go_name: String,
    id_go: String,
    id_json: String,
    checks: Vec<CheckRecord>,
    unique_fields: Vec<String>,
}

fn number_literal(value: Option<&serde_yaml::Value>) -> String {
    match value {
        Some(v) => v
            .as_i64()
            .map(|n| n.to_string())
            .or_else(|| v.as_f64().map(|f| f.to_string()))
            .unwrap_or_else(|| "0".to_string()),
        None => "0".to_string(),
    }
}

fn rule_check(field: &FieldView, validation: &Validation) -> Option<CheckRecord> {
    let go = &field.go_name;
    let json = field.json_tag.clone();
    match validation.rule {
        ValidationRule::Required => {
            let condition = match field.ty {
                FieldType::Text
                | FieldType::String
                | FieldType::Email
                | FieldType::Uuid => format!("m.{go} == \"\""),
                // a required bool is always present once decoded
                FieldType::Bool => return None,
                FieldType::Int | FieldType::Decimal => format!("m.{go} == 0"),
                FieldType::Datetime => format!("m.{go}.IsZero()"),
                FieldType::Json => format!("len(m.{go}) == 0"),
            };
            Some(CheckRecord {
                condition,
                field: json,
                code: "required".to_string(),
                detail: String::new(),
            })
        }
        ValidationRule::Email => Some(CheckRecord {
            condition: format!("m.{go} != \"\" && !core.IsEmail(m.{go})"),
            field: json,
            code: "email".to_string(),
            detail: String::new(),
        }),
        ValidationRule::MinLength => {
            let n = number_literal(validation.value.as_ref());
            Some(CheckRecord {
                condition: format!("m.{go} != \"\" && len(m.{go}) < {n}"),
                field: json,
                code: "min_length".to_string(),
                detail: format!("minimum length {n}"),
            })
        }
        ValidationRule::MaxLength => {
            let n = number_literal(validation.value.as_ref());
            Some(CheckRecord {
                condition: format!("len(m.{go}) > {n}"),
                field: json,
                code: "max_length".to_string(),
                detail: format!("maximum length {n}"),
            })
        }
        ValidationRule::Min => {
            let n = number_literal(validation.value.as_ref());
            Some(CheckRecord {
                condition: format!("m.{go} < {n}"),
                field: json,
                code: "min".to_string(),
                detail: format!("minimum {n}"),
            })
        }
        ValidationRule::Max => {
            let n = number_literal(validation.value.as_ref());
            Some(CheckRecord {
                condition: format!("m.{go} > {n}"),
                field: json,
                code: "max".to_string(),
                detail: format!("maximum {n}"),
            })
        }
        ValidationRule::Unique => None,
        ValidationRule::Format => {
            let name = validation
                .value
                .as_ref()
                .and_then(|v| v.as_str())
                .unwrap_or("slug")
                .to_string();
            Some(CheckRecord {
                condition: format!("m.{go} != \"\" && !core.MatchesFormat(\"{name}\", m.{go})"),
                field: json,
                code: "format".to_string(),
                detail: format!("expected {name}"),
            })
        }
    }
}

fn checks_for(fields: &[FieldView]) -> (Vec<CheckRecord>, Vec<String>) {
    let mut checks = Vec::new();
    let mut unique = Vec::new();
    for field in fields {
        for validation in &field.validations {
            if validation.rule == ValidationRule::Unique {
                unique.push(field.json_tag.clone());
                continue;
            }
            if let Some(check) = rule_check(field, validation) {
                checks.push(check);
            }
        }
    }
    (checks, unique)
}

/// Emit validators for every model (children included, since nested child
/// handlers validate them) and every aggregate root.
pub fn emit_validators(
    registry: &Registry,
    layout: &Layout,
    view: &ServiceView,
) -> Result<(), ForgeError> {
    let dir = layout.service_internal_dir(&view.name);

    for model in &view.models {
        let (checks, unique_fields) = checks_for(&model.fields);
        let record = ValidatorRecord {
            package: view.name.clone(),
            lib_import: layout.lib_module(),
            go_name: model.go_name.clone(),
            id_go: "ID".to_string(),
            id_json: "id".to_string(),
            checks,
            unique_fields,
        };
        let path = dir.join(format!("validator_{}.go", model.snake));
        emit(registry, "validator", &path, &record)?;
    }

    for aggregate in &view.aggregates {
        let (checks, unique_fields) = checks_for(&aggregate.fields);
        let record = ValidatorRecord {
            package: view.name.clone(),
            lib_import: layout.lib_module(),
            go_name: aggregate.go_name.clone(),
            id_go: aggregate.id_go.clone(),
            id_json: aggregate.id_column.clone(),
            checks,
            unique_fields,
        };
        let path = dir.join(format!("validator_{}.go", aggregate.snake));
        emit(registry, "validator", &path, &record)?;
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
    fn test_required_text_check() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_validators(&registry, &layout, &todo_view()).unwrap();

        let out = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/validator_item.go"),
        )
        .unwrap();
        assert!(out.contains("func ValidateCreateItem(m *Item) core.ValidationErrors"));
        assert!(out.contains("if m.Text == \"\" {"));
        assert!(out.contains(r#"core.FieldError{Field: "text", Code: "required"}"#));
        // delete validator takes only the id
        assert!(out.contains("func ValidateDeleteItem(id string) core.ValidationErrors"));
    }

    #[test]
    fn test_min_length_check_carries_value_and_detail() {
        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_validators(&registry, &layout, &todo_view()).unwrap();

        let out = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/validator_list.go"),
        )
        .unwrap();
        assert!(out.contains("if m.Name != \"\" && len(m.Name) < 3 {"));
        assert!(out.contains(r#"Detail: "minimum length 3""#));
        // update validator requires the identifier first
        assert!(out.contains("func ValidateUpdateList(m *List) core.ValidationErrors"));
        assert!(out.contains("if m.ID == \"\" {"));
    }

    #[test]
    fn test_unique_rule_stubs_note_in_create_and_update() {
        let doc = r#"
schema_version: 1
name: todo
services:
  todo:
    kind: atom
    repo_impl: sqlite
    models:
      Tagname:
        fields:
          slug: {type: string, validations: [required, unique]}
"#;
        let spec = monoforge_core::load(doc.as_bytes()).unwrap();
        let view = monoforge_core::derive(&spec, "todo").unwrap();

        let tmp = TempDir::new().unwrap();
        let layout = Layout::new(tmp.path(), "example.com/todo");
        let registry = Registry::new().unwrap();
        emit_validators(&registry, &layout, &view).unwrap();

        let out = fs::read_to_string(
            tmp.path().join("services/todo/internal/todo/validator_tagname.go"),
        )
        .unwrap();
        let note = "// slug: uniqueness is enforced by storage; extend with a repository lookup.";
        assert_eq!(out.matches(note).count(), 2);
        // one stub per extension point: create, then update
        let create = out.find("func ValidateCreateTagname").unwrap();
        let update = out.find("func ValidateUpdateTagname").unwrap();
        let first = out.find(note).unwrap();
        let second = out.rfind(note).unwrap();
        assert!(create < first && first < update && update < second);
    }

    #[test]
    fn test_required_bool_emits_no_check() {
        let view = todo_view();
        let item = view.models.iter().find(|m| m.name == "Item").unwrap();
        let done = item.fields.iter().find(|f| f.name == "done").unwrap();
        let validation = Validation {
            rule: ValidationRule::Required,
            value: None,
        };
        assert!(rule_check(done, &validation).is_none());
    }
}
