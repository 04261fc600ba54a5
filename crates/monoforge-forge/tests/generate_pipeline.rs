//! End-to-end pipeline scenarios, driven into temporary directories with
//! no external tooling (the collaborators are no-ops or recorders).

use std::cell::Cell;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tempfile::TempDir;

use monoforge_forge::collab::{Collaborator, NoopCollaborators};
use monoforge_forge::error::ForgeError;
use monoforge_forge::pipeline::{GenerateOptions, Pipeline};

const ATOM_SPEC: &str = r#"
schema_version: 1
name: todo
package_root: example.com/todo
services:
  todo:
    kind: atom
    repo_impl: sqlite
    models:
      Item:
        fields:
          text: {type: text, validations: [required]}
          done: {type: bool, default: false}
    api:
      - {id: item-create, route: "POST /items", model: Item, op: create}
      - {id: item-get, route: "GET /items/{id}", model: Item, op: get}
      - {id: item-list, route: "GET /items", model: Item, op: list}
      - {id: item-update, route: "PUT /items/{id}", model: Item, op: update}
      - {id: item-delete, route: "DELETE /items/{id}", model: Item, op: delete}
"#;

const AGGREGATE_SPEC: &str = r#"
schema_version: 1
name: todo
package_root: example.com/todo
services:
  todo:
    kind: domain
    repo_impl: sqlite
    models:
      Item:
        fields:
          text: {type: text, validations: [required]}
          done: {type: bool, default: false}
          position: {type: int}
      Tag:
        fields:
          name: {type: string, validations: [required]}
          color: {type: string}
    aggregates:
      List:
        table: lists
        version_field: version
        audit: true
        fields:
          name: {type: string, validations: [required]}
          description: {type: text}
        children:
          items:
            of: Item
            table: list_items
            fk: {name: list_id, ref: lists.id, on_delete: cascade}
            order: {field: position, unique_scope: [list_id, position]}
            updatable: [text, done]
          tags:
            of: Tag
            table: list_tags
            fk: {name: list_id, ref: lists.id, on_delete: cascade}
            updatable: [name, color]
"#;

const TWO_SERVICES_SPEC: &str = r#"
schema_version: 1
name: duo
package_root: example.com/duo
services:
  alpha:
    kind: atom
    repo_impl: sqlite
    models:
      Note:
        fields:
          body: {type: text, validations: [required]}
    api:
      - {id: note-create, route: "POST /notes", model: Note, op: create}
  beta:
    kind: atom
    repo_impl: sqlite
    models:
      Event:
        fields:
          name: {type: string, validations: [required]}
    api:
      - {id: event-create, route: "POST /events", model: Event, op: create}
"#;

fn generate_into(tmp: &TempDir, doc: &str, dev: bool) {
    let spec = monoforge_core::load(doc.as_bytes()).unwrap();
    let collab = NoopCollaborators;
    let pipeline = Pipeline::new(&collab).unwrap();
    pipeline
        .generate(
            &spec,
            doc.as_bytes(),
            "stack.yaml",
            &GenerateOptions {
                output: tmp.path().to_path_buf(),
                module_root: None,
                dev,
            },
        )
        .unwrap();
}

fn read(tmp: &TempDir, rel: &str) -> String {
    fs::read_to_string(tmp.path().join(rel))
        .unwrap_or_else(|_| panic!("missing {rel}"))
}

fn snapshot_tree(root: &Path) -> BTreeMap<String, Vec<u8>> {
    fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<String, Vec<u8>>) {
        for entry in fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            if path.is_dir() {
                walk(root, &path, out);
            } else {
                let rel = path.strip_prefix(root).unwrap().to_string_lossy().into_owned();
                out.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    let mut out = BTreeMap::new();
    walk(root, root, &mut out);
    out
}

#[test]
fn simple_atom_service_tree() {
    let tmp = TempDir::new().unwrap();
    generate_into(&tmp, ATOM_SPEC, false);

    let repo = read(&tmp, "services/todo/internal/todo/repo_item.go");
    assert!(repo.contains("type ItemRepo interface {"));

    let queries = read(&tmp, "services/todo/internal/sqlite/queries.go");
    for name in [
        "QueryCreateItem",
        "QueryGetItem",
        "QueryUpdateItem",
        "QueryDeleteItem",
        "QueryListItem",
    ] {
        assert!(queries.contains(name), "missing {name}");
    }

    let handler = read(&tmp, "services/todo/internal/todo/handler_item.go");
    assert_eq!(handler.matches("func (h *ItemHandler)").count(), 6); // Routes + 5 ops

    let validator = read(&tmp, "services/todo/internal/todo/validator_item.go");
    assert!(validator.contains(r#"core.FieldError{Field: "text", Code: "required"}"#));
}

#[test]
fn aggregate_with_two_child_collections() {
    let tmp = TempDir::new().unwrap();
    generate_into(&tmp, AGGREGATE_SPEC, false);

    let model = read(&tmp, "services/todo/internal/todo/model_list.go");
    assert!(model.contains("Items []Item `json:\"items\"`"));
    assert!(model.contains("Tags []Tag `json:\"tags\"`"));

    let iface = read(&tmp, "services/todo/internal/todo/repo_list.go");
    for method in ["Create", "Get", "Save", "Delete", "List"] {
        assert!(iface.contains(&format!("{method}(ctx context.Context")), "missing {method}");
    }

    let adapter = read(&tmp, "services/todo/internal/sqlite/repo_list.go");
    // unit-of-work diff, applied as deletes then inserts then updates
    let del = adapter.find("deleteListItems(ctx, tx, deletes)").unwrap();
    let ins = adapter.find("insertListItems(ctx, tx, inserts)").unwrap();
    let upd = adapter.find("updateListItems(ctx, tx, updates)").unwrap();
    assert!(del < ins && ins < upd);
    // optimistic concurrency on the root only
    assert!(adapter.contains("AND version = ?"));
    assert!(adapter.contains("core.ErrConcurrentModification"));

    let handler = read(&tmp, "services/todo/internal/todo/handler_list.go");
    assert!(handler.contains(r#"r.Post("/lists", h.Create)"#));
    assert!(handler.contains(r#"r.Post("/lists/{id}/items", h.AddItem)"#));
    assert!(handler.contains(r#"r.Delete("/lists/{id}/tags/{childId}", h.RemoveTag)"#));

    // children are aggregate-owned: no top-level handler or repository
    assert!(!tmp.path().join("services/todo/internal/todo/handler_item.go").exists());
    assert!(!tmp.path().join("services/todo/internal/todo/repo_item.go").exists());
}

#[test]
fn empty_collection_save_structure() {
    let tmp = TempDir::new().unwrap();
    generate_into(&tmp, AGGREGATE_SPEC, false);

    // The batch helpers skip zero-row groups entirely, so saving an empty
    // desired collection produces only the deletes for the current rows.
    let adapter = read(&tmp, "services/todo/internal/sqlite/repo_list.go");
    assert_eq!(adapter.matches("if len(rows) == 0 {\n\t\treturn nil\n\t}").count(), 4);
    assert!(adapter.contains("if len(ids) == 0 {"));
}

#[test]
fn document_backend_replaces_whole_aggregate() {
    let tmp = TempDir::new().unwrap();
    let doc = AGGREGATE_SPEC.replace("repo_impl: sqlite", "repo_impl: mongo");
    generate_into(&tmp, &doc, false);

    let adapter = read(&tmp, "services/todo/internal/mongo/repo_list.go");
    assert!(adapter.contains("r.col.InsertOne(ctx, agg)"));
    assert!(adapter.contains("r.col.ReplaceOne(ctx, bson.M{\"_id\": agg.ID}, agg)"));
    assert!(adapter.contains("if res.MatchedCount == 0 {"));
    assert!(adapter.contains("r.col.DeleteOne(ctx, bson.M{\"_id\": id})"));
    // no diff code path for the document store
    assert!(!adapter.contains("currentByID"));
    assert!(!tmp.path().join("services/todo/internal/sqlite").exists());

    // models carry bson tags so the root id is the document key
    let model = read(&tmp, "services/todo/internal/todo/model_list.go");
    assert!(model.contains("bson:\"_id\""));
}

struct RecordingCollaborators {
    formats: Cell<usize>,
    tidies: Cell<usize>,
    syncs: Cell<usize>,
}

impl Collaborator for RecordingCollaborators {
    fn format(&self, _dir: &Path) -> Result<(), ForgeError> {
        self.formats.set(self.formats.get() + 1);
        Ok(())
    }

    fn tidy(&self, _dir: &Path) -> Result<(), ForgeError> {
        self.tidies.set(self.tidies.get() + 1);
        Ok(())
    }

    fn work_sync(&self, _root: &Path) -> Result<(), ForgeError> {
        self.syncs.set(self.syncs.get() + 1);
        Ok(())
    }
}

#[test]
fn workspace_assembly_in_dev_mode() {
    let tmp = TempDir::new().unwrap();
    let spec = monoforge_core::load(TWO_SERVICES_SPEC.as_bytes()).unwrap();
    let collab = RecordingCollaborators {
        formats: Cell::new(0),
        tidies: Cell::new(0),
        syncs: Cell::new(0),
    };
    let pipeline = Pipeline::new(&collab).unwrap();
    pipeline
        .generate(
            &spec,
            TWO_SERVICES_SPEC.as_bytes(),
            "stack.yaml",
            &GenerateOptions {
                output: tmp.path().to_path_buf(),
                module_root: None,
                dev: true,
            },
        )
        .unwrap();

    let work = read(&tmp, "go.work");
    assert!(work.contains("./pkg/lib/core"));
    assert!(work.contains("./services/alpha"));
    assert!(work.contains("./services/beta"));

    for service in ["alpha", "beta"] {
        let go_mod = read(&tmp, &format!("services/{service}/go.mod"));
        assert!(go_mod.contains("replace example.com/duo/pkg/lib/core => ../../pkg/lib/core"));
    }

    // formatter and tidy once per service, workspace sync exactly once
    assert_eq!(collab.formats.get(), 2);
    assert_eq!(collab.tidies.get(), 2);
    assert_eq!(collab.syncs.get(), 1);
}

#[test]
fn rerun_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    generate_into(&tmp, AGGREGATE_SPEC, false);
    let first = snapshot_tree(tmp.path());
    generate_into(&tmp, AGGREGATE_SPEC, false);
    let second = snapshot_tree(tmp.path());
    assert_eq!(first, second);

    // and a fresh directory produces the same bytes as an overwrite run
    let other = TempDir::new().unwrap();
    generate_into(&other, AGGREGATE_SPEC, false);
    assert_eq!(first, snapshot_tree(other.path()));
}

#[test]
fn spec_is_copied_verbatim() {
    let tmp = TempDir::new().unwrap();
    generate_into(&tmp, ATOM_SPEC, false);
    assert_eq!(read(&tmp, "stack.yaml"), ATOM_SPEC);
}

#[test]
fn module_path_override_rewrites_imports() {
    let tmp = TempDir::new().unwrap();
    let spec = monoforge_core::load(ATOM_SPEC.as_bytes()).unwrap();
    let collab = NoopCollaborators;
    let pipeline = Pipeline::new(&collab).unwrap();
    pipeline
        .generate(
            &spec,
            ATOM_SPEC.as_bytes(),
            "stack.yaml",
            &GenerateOptions {
                output: tmp.path().to_path_buf(),
                module_root: Some("github.com/acme/stack".to_string()),
                dev: false,
            },
        )
        .unwrap();

    let go_mod = read(&tmp, "services/todo/go.mod");
    assert!(go_mod.contains("module github.com/acme/stack/services/todo"));
    let main_go = read(&tmp, "services/todo/main.go");
    assert!(main_go.contains("github.com/acme/stack/services/todo/internal/todo"));
}
