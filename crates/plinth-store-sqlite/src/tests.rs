//! Integration tests against an in-memory catalog and tenant databases in a
//! temporary directory.

use plinth_core::{
  catalog::{Catalog, MembershipDirectory},
  project::NewProject,
  request::{AlterColumn, CreateIndex},
  row::Pagination,
  schema::{Column, ColumnType, ForeignKey, NewTable},
  value::Value,
};
use serde_json::json;
use tempfile::{TempDir, tempdir};
use uuid::Uuid;

use crate::{Error, Provisioner, SqliteCatalog, TenantConnection, provision::role_token};

async fn catalog() -> SqliteCatalog {
  SqliteCatalog::open_in_memory()
    .await
    .expect("in-memory catalog")
}

/// A fresh tenant database. The directory must outlive the connection.
async fn tenant() -> (TempDir, TenantConnection) {
  let dir = tempdir().unwrap();
  let provisioner = Provisioner::new(dir.path());
  provisioner.create("tenant", None).await.unwrap();
  let conn = provisioner.connect("tenant").await.unwrap();
  (dir, conn)
}

fn customers() -> Vec<Column> {
  vec![
    Column::new("id", ColumnType::Integer).primary(),
    Column::new("name", ColumnType::Text).not_null(),
  ]
}

fn new_project(org: Uuid, name: &str) -> NewProject {
  NewProject {
    organization_id: org,
    name:            name.into(),
    db_name:         plinth_core::project::generate_db_name(),
    created_by:      Uuid::new_v4(),
  }
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn project_names_are_unique_per_organization() {
  let c = catalog().await;
  let org = Uuid::new_v4();

  let project = c.create_project(new_project(org, "Shop")).await.unwrap();
  assert!(c.project_exists_by_name(org, "shop").await.unwrap());

  let err = c.create_project(new_project(org, "shop")).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateProjectName(_)));

  // Another organization may reuse the name.
  c.create_project(new_project(Uuid::new_v4(), "Shop")).await.unwrap();

  let listed = c.list_projects(org).await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].id, project.id);
  assert_eq!(c.get_project(project.id).await.unwrap().unwrap().db_name, project.db_name);
}

#[tokio::test]
async fn table_entries_round_trip_columns() {
  let c = catalog().await;
  let project = c.create_project(new_project(Uuid::new_v4(), "shop")).await.unwrap();

  let created = c
    .create_table(NewTable {
      project_id: project.id,
      name:       "customers".into(),
      columns:    customers(),
      created_by: project.created_by,
    })
    .await
    .unwrap();

  let fetched = c.get_table_by_name(project.id, "CUSTOMERS").await.unwrap().unwrap();
  assert_eq!(fetched.id, created.id);
  assert_eq!(fetched.columns, customers());
  assert!(c.table_exists_by_name(project.id, "customers").await.unwrap());
}

#[tokio::test]
async fn duplicate_table_names_are_rejected_by_the_catalog() {
  let c = catalog().await;
  let project = c.create_project(new_project(Uuid::new_v4(), "shop")).await.unwrap();
  let input = NewTable {
    project_id: project.id,
    name:       "customers".into(),
    columns:    customers(),
    created_by: project.created_by,
  };

  c.create_table(input.clone()).await.unwrap();
  let err = c.create_table(input).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateTableName(_)));
  assert_eq!(c.list_tables(project.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn rename_and_update_columns() {
  let c = catalog().await;
  let project = c.create_project(new_project(Uuid::new_v4(), "shop")).await.unwrap();
  let table = c
    .create_table(NewTable {
      project_id: project.id,
      name:       "customers".into(),
      columns:    customers(),
      created_by: project.created_by,
    })
    .await
    .unwrap();

  let editor = Uuid::new_v4();
  let renamed = c.rename_table(table.id, "clients", editor).await.unwrap();
  assert_eq!(renamed.name, "clients");
  assert_eq!(renamed.updated_by, editor);
  assert!(c.get_table_by_name(project.id, "customers").await.unwrap().is_none());

  let mut columns = customers();
  columns.push(Column::new("email", ColumnType::Text));
  let updated = c.update_columns(table.id, columns.clone(), editor).await.unwrap();
  assert_eq!(updated.columns, columns);

  let err = c.rename_table(Uuid::new_v4(), "ghosts", editor).await.unwrap_err();
  assert!(matches!(err, Error::EntryNotFound(_)));
}

#[tokio::test]
async fn deleting_a_project_removes_its_tables() {
  let c = catalog().await;
  let project = c.create_project(new_project(Uuid::new_v4(), "shop")).await.unwrap();
  let table = c
    .create_table(NewTable {
      project_id: project.id,
      name:       "customers".into(),
      columns:    customers(),
      created_by: project.created_by,
    })
    .await
    .unwrap();

  assert!(c.delete_project(project.id).await.unwrap());
  assert!(c.get_table(table.id).await.unwrap().is_none());
  assert!(!c.delete_project(project.id).await.unwrap());
}

#[tokio::test]
async fn membership_lookup() {
  let c = catalog().await;
  let (org, user) = (Uuid::new_v4(), Uuid::new_v4());
  assert!(!c.is_organization_member(org, user).await.unwrap());
  c.add_organization_member(org, user).await.unwrap();
  c.add_organization_member(org, user).await.unwrap();
  assert!(c.is_organization_member(org, user).await.unwrap());
}

// ─── Provisioner ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_list_and_drop_databases() {
  let dir = tempdir().unwrap();
  let p = Provisioner::new(dir.path().join("data"));

  assert!(p.list().await.unwrap().is_empty());
  p.create("beta", None).await.unwrap();
  p.create("alpha", None).await.unwrap();
  assert_eq!(p.list().await.unwrap(), vec!["alpha", "beta"]);
  assert!(p.exists("alpha").await.unwrap());

  let err = p.create("alpha", None).await.unwrap_err();
  assert!(matches!(err, Error::DatabaseExists(_)));

  p.drop_if_exists("alpha").await.unwrap();
  p.drop_if_exists("alpha").await.unwrap();
  assert!(!p.exists("alpha").await.unwrap());
  assert_eq!(p.list().await.unwrap(), vec!["beta"]);
}

#[tokio::test]
async fn connect_never_creates() {
  let dir = tempdir().unwrap();
  let p = Provisioner::new(dir.path());
  let err = p.connect("missing").await.err().unwrap();
  assert!(matches!(err, Error::DatabaseNotFound(_)));
  assert!(!p.exists("missing").await.unwrap());
}

#[tokio::test]
async fn recreate_empties_the_database() {
  let (dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  drop(conn);

  let p = Provisioner::new(dir.path());
  p.recreate("tenant").await.unwrap();
  let conn = p.connect("tenant").await.unwrap();
  assert!(!conn.tables().exists("customers").await.unwrap());
}

#[tokio::test]
async fn seed_failures_are_recorded_and_skipped() {
  let dir = tempdir().unwrap();
  let seeds = dir.path().join("seeds");
  std::fs::create_dir_all(&seeds).unwrap();
  std::fs::write(
    seeds.join("01_roles.sql"),
    "CREATE TABLE grants (role TEXT);\nINSERT INTO grants VALUES ('{{USER_ROLE}}');",
  )
  .unwrap();
  std::fs::write(
    seeds.join("02_broken.sql"),
    "INSERT INTO nowhere VALUES (1);\nCREATE TABLE audit (entry TEXT);",
  )
  .unwrap();
  std::fs::write(seeds.join("notes.txt"), "not a script").unwrap();

  let owner = Uuid::new_v4();
  let p = Provisioner::new(dir.path().join("data")).with_seed_dir(&seeds);
  let outcome = p.create("seeded", Some(owner)).await.unwrap();

  assert_eq!(outcome.applied, 3);
  assert_eq!(outcome.skipped, 1);
  assert_eq!(outcome.errors[0].file, "02_broken.sql");
  assert!(outcome.errors[0].message.contains("nowhere"));

  let conn = p.connect("seeded").await.unwrap();
  let role: String = conn
    .run(|conn| Ok(conn.query_row("SELECT role FROM grants", [], |row| row.get(0))?))
    .await
    .unwrap();
  assert_eq!(role, role_token(owner));
}

#[tokio::test]
async fn seeds_need_a_role_owner() {
  let dir = tempdir().unwrap();
  let seeds = dir.path().join("seeds");
  std::fs::create_dir_all(&seeds).unwrap();
  std::fs::write(seeds.join("01.sql"), "CREATE TABLE grants (role TEXT);").unwrap();

  let p = Provisioner::new(dir.path().join("data")).with_seed_dir(&seeds);
  let outcome = p.create("plain", None).await.unwrap();
  assert_eq!(outcome.applied, 0);
}

// ─── Table DDL ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_rename_and_drop_table() {
  let (_dir, conn) = tenant().await;
  let tables = conn.tables();

  tables.create("customers", &customers()).await.unwrap();
  assert!(tables.exists("customers").await.unwrap());

  tables.rename("customers", "clients").await.unwrap();
  assert!(!tables.exists("customers").await.unwrap());
  assert_eq!(conn.columns().list("clients").await.unwrap(), vec!["id", "name"]);

  let listed = tables.list().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].name, "clients");
  assert_eq!(listed[0].schema, "main");

  let physical = tables.get_by_name_in_schema("main", "clients").await.unwrap();
  assert_eq!(physical.name, "clients");

  tables.drop_if_exists("clients").await.unwrap();
  tables.drop_if_exists("clients").await.unwrap();
  assert!(tables.list().await.unwrap().is_empty());
  assert!(matches!(
    tables.get_by_name_in_schema("main", "clients").await.unwrap_err(),
    Error::TableNotFound(_)
  ));
}

#[tokio::test]
async fn duplicate_copies_rows_but_not_constraints() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  conn
    .rows()
    .create("customers", vec![("id".into(), Value::Integer(1)), ("name".into(), "A".into())])
    .await
    .unwrap();

  conn.tables().duplicate("customers", "customers_copy").await.unwrap();
  let row = conn.rows().get_by_id("customers_copy", &customers(), 1).await.unwrap();
  assert_eq!(row.get("name"), Some(&Value::Text("A".into())));

  // No primary key on the copy: the same id may be inserted twice.
  conn
    .rows()
    .create("customers_copy", vec![("id".into(), Value::Integer(1)), ("name".into(), "B".into())])
    .await
    .unwrap();

  let err = conn.tables().duplicate("ghosts", "ghosts_copy").await.unwrap_err();
  assert!(matches!(err, Error::TableNotFound(_)));
}

#[tokio::test]
async fn quoted_names_cannot_break_out() {
  let (_dir, conn) = tenant().await;
  let hostile = r#"x"; DROP TABLE victims; --"#;
  conn.tables().create("victims", &customers()).await.unwrap();

  conn.tables().create(hostile, &customers()).await.unwrap();
  assert!(conn.tables().exists("victims").await.unwrap());
  assert!(conn.tables().exists(hostile).await.unwrap());
}

#[tokio::test]
async fn foreign_keys_are_added_after_the_table_exists() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();

  let orders = vec![
    Column::new("id", ColumnType::Integer).primary(),
    Column::new("customer_id", ColumnType::Integer).references("customers", "id"),
  ];
  conn.tables().create("orders", &orders).await.unwrap();

  let err = conn
    .rows()
    .create("orders", vec![("id".into(), Value::Integer(1)), ("customer_id".into(), Value::Integer(99))])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Sqlite(_)));
}

#[tokio::test]
async fn forward_reference_fails_at_constraint_time() {
  let (_dir, conn) = tenant().await;
  let columns = vec![
    Column::new("id", ColumnType::Integer).primary(),
    Column::new("vendor_id", ColumnType::Integer).references("vendors", "id"),
  ];

  let err = conn.tables().create("products", &columns).await.unwrap_err();
  assert!(matches!(err, Error::ForeignKeyTarget { .. }));
  // The table itself was created before the reference was attempted.
  assert!(conn.tables().exists("products").await.unwrap());
}

#[tokio::test]
async fn self_reference_is_accepted() {
  let (_dir, conn) = tenant().await;
  let columns = vec![
    Column::new("id", ColumnType::Integer).primary(),
    Column::new("parent_id", ColumnType::Integer).references("nodes", "id"),
  ];
  conn.tables().create("nodes", &columns).await.unwrap();

  let rows = conn.rows();
  rows.create("nodes", vec![("id".into(), Value::Integer(1))]).await.unwrap();
  rows
    .create("nodes", vec![("id".into(), Value::Integer(2)), ("parent_id".into(), Value::Integer(1))])
    .await
    .unwrap();
  assert!(
    rows
      .create("nodes", vec![("id".into(), Value::Integer(3)), ("parent_id".into(), Value::Integer(7))])
      .await
      .is_err()
  );
}

#[tokio::test]
async fn adding_a_reference_to_violating_rows_is_rolled_back() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  conn
    .tables()
    .create("orders", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("customer_id", ColumnType::Integer),
    ])
    .await
    .unwrap();
  conn
    .rows()
    .create("orders", vec![("id".into(), Value::Integer(1)), ("customer_id".into(), Value::Integer(5))])
    .await
    .unwrap();

  let fk = ForeignKey { table: "customers".into(), column: "id".into() };
  let err = conn.tables().add_foreign_key("orders", "customer_id", &fk).await.unwrap_err();
  assert!(matches!(err, Error::ForeignKeyViolation(_)));

  let kept = conn.rows().get_by_id("orders", &[], 1).await.unwrap();
  assert_eq!(kept.get("customer_id"), Some(&Value::Integer(5)));
}

// ─── Column DDL ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn column_introspection() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  let columns = conn.columns();

  assert!(columns.has("customers", "NAME").await.unwrap());
  assert!(columns.has_any("customers", &["email", "name"]).await.unwrap());
  assert!(!columns.has_all("customers", &["email", "name"]).await.unwrap());
  assert!(matches!(columns.list("ghosts").await.unwrap_err(), Error::TableNotFound(_)));
}

#[tokio::test]
async fn added_unique_column_is_enforced() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("clients", &customers()).await.unwrap();
  conn
    .columns()
    .create_many("clients", &[
      Column::new("email", ColumnType::Text).unique(),
      Column::new("tier", ColumnType::Text).not_null().with_default(json!("free")),
    ])
    .await
    .unwrap();

  let rows = conn.rows();
  let id = rows
    .create("clients", vec![
      ("id".into(), Value::Integer(1)),
      ("name".into(), "A".into()),
      ("email".into(), "a@x.com".into()),
    ])
    .await
    .unwrap();
  assert_eq!(id, 1);
  assert_eq!(
    rows.get_by_id("clients", &[], 1).await.unwrap().get("tier"),
    Some(&Value::Text("free".into()))
  );

  let dup = rows
    .create("clients", vec![
      ("id".into(), Value::Integer(2)),
      ("name".into(), "B".into()),
      ("email".into(), "a@x.com".into()),
    ])
    .await
    .unwrap_err();
  assert!(crate::error::is_unique_violation(match &dup {
    Error::Sqlite(e) => e,
    other => panic!("unexpected error: {other}"),
  }));
  assert!(matches!(rows.get_by_id("clients", &[], 2).await.unwrap_err(), Error::RowNotFound { .. }));
}

#[tokio::test]
async fn alter_converts_compatible_values() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("scores", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("points", ColumnType::Text),
    ])
    .await
    .unwrap();
  conn
    .rows()
    .create("scores", vec![("id".into(), Value::Integer(1)), ("points".into(), "42".into())])
    .await
    .unwrap();
  conn
    .indexes()
    .create("scores", &CreateIndex {
      name:      "ix_points".into(),
      columns:   vec!["points".into()],
      is_unique: false,
    })
    .await
    .unwrap();

  conn.columns().alter("scores", "points", ColumnType::Integer).await.unwrap();

  let types = [Column::new("points", ColumnType::Integer)];
  let row = conn.rows().get_by_id("scores", &types, 1).await.unwrap();
  assert_eq!(row.get("points"), Some(&Value::Integer(42)));
  // Indexes survive the rebuild.
  assert_eq!(conn.indexes().list("scores").await.unwrap().len(), 1);
}

#[tokio::test]
async fn incompatible_alter_leaves_the_column_untouched() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("scores", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("points", ColumnType::Text),
    ])
    .await
    .unwrap();
  conn
    .rows()
    .create("scores", vec![("id".into(), Value::Integer(1)), ("points".into(), "lots".into())])
    .await
    .unwrap();

  let err = conn
    .columns()
    .alter_many("scores", &[AlterColumn { name: "points".into(), column_type: ColumnType::Integer }])
    .await
    .unwrap_err();
  assert!(matches!(err, Error::IncompatibleType { to: ColumnType::Integer, .. }));

  let declared: String = conn
    .run(|conn| {
      Ok(conn.query_row(
        "SELECT type FROM pragma_table_info('scores') WHERE name = 'points'",
        [],
        |row| row.get(0),
      )?)
    })
    .await
    .unwrap();
  assert_eq!(declared, "TEXT");
  let row = conn.rows().get_by_id("scores", &[], 1).await.unwrap();
  assert_eq!(row.get("points"), Some(&Value::Text("lots".into())));
}

#[tokio::test]
async fn uuid_conversion_requires_the_hyphenated_hex_form() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("tokens", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("token", ColumnType::Text),
    ])
    .await
    .unwrap();
  let token = Uuid::new_v4().hyphenated().to_string();
  conn
    .rows()
    .create("tokens", vec![("id".into(), Value::Integer(1)), ("token".into(), token.clone().into())])
    .await
    .unwrap();
  conn
    .rows()
    .create("tokens", vec![
      ("id".into(), Value::Integer(2)),
      ("token".into(), "zzzzzzzz-zzzz-zzzz-zzzz-zzzzzzzzzzzz".into()),
    ])
    .await
    .unwrap();

  let err = conn.columns().alter("tokens", "token", ColumnType::Uuid).await.unwrap_err();
  assert!(matches!(err, Error::IncompatibleType { to: ColumnType::Uuid, .. }));

  conn.rows().delete("tokens", 2).await.unwrap();
  conn.columns().alter("tokens", "token", ColumnType::Uuid).await.unwrap();
  let types = [Column::new("token", ColumnType::Uuid)];
  let row = conn.rows().get_by_id("tokens", &types, 1).await.unwrap();
  assert_eq!(row.get("token"), Some(&Value::Uuid(Uuid::parse_str(&token).unwrap())));
}

#[tokio::test]
async fn rename_and_drop_column() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("clients", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("mail", ColumnType::Text),
      Column::new("legacy", ColumnType::Text),
    ])
    .await
    .unwrap();
  let columns = conn.columns();

  columns.rename("clients", "mail", "email").await.unwrap();
  columns.drop("clients", "legacy").await.unwrap();
  assert_eq!(columns.list("clients").await.unwrap(), vec!["id", "email"]);

  let err = columns.drop("clients", "legacy").await.unwrap_err();
  assert!(matches!(err, Error::ColumnNotFound { .. }));
}

// ─── Index DDL ───────────────────────────────────────────────────────────────

fn index(name: &str, columns: &[&str], is_unique: bool) -> CreateIndex {
  CreateIndex {
    name: name.into(),
    columns: columns.iter().map(|c| c.to_string()).collect(),
    is_unique,
  }
}

#[tokio::test]
async fn index_lifecycle() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("clients", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("email", ColumnType::Text).unique(),
      Column::new("city", ColumnType::Text),
    ])
    .await
    .unwrap();
  let indexes = conn.indexes();

  // Constraint-backed indexes are not listed.
  assert!(indexes.list("clients").await.unwrap().is_empty());

  indexes.create("clients", &index("ix_city_email", &["city", "email"], true)).await.unwrap();
  let view = indexes.get_by_name("clients", "ix_city_email").await.unwrap();
  assert_eq!(view.columns, vec!["city", "email"]);
  assert!(view.is_unique);

  indexes.delete("clients", "ix_city_email").await.unwrap();
  assert!(matches!(
    indexes.delete("clients", "ix_city_email").await.unwrap_err(),
    Error::IndexNotFound { .. }
  ));
}

#[tokio::test]
async fn index_rejections() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("clients", &customers()).await.unwrap();
  let indexes = conn.indexes();

  let reserved = indexes.create("clients", &index("PRIMARY", &["name"], false)).await.unwrap_err();
  assert!(matches!(reserved, Error::Core(_)));

  let unknown = indexes.create("clients", &index("ix_email", &["email"], false)).await.unwrap_err();
  assert!(matches!(unknown, Error::IndexColumnNotFound(_)));

  let missing = indexes.create("ghosts", &index("ix_name", &["name"], false)).await.unwrap_err();
  assert!(matches!(missing, Error::TableNotFound(_)));
}

#[tokio::test]
async fn index_names_share_the_table_namespace() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("clients", &customers()).await.unwrap();
  conn.tables().create("customers", &customers()).await.unwrap();
  let indexes = conn.indexes();

  indexes.create("clients", &index("ix_name", &["name"], false)).await.unwrap();
  let again = indexes.create("customers", &index("IX_NAME", &["name"], false)).await.unwrap_err();
  assert!(matches!(again, Error::DuplicateIndexName(_)));

  let table = indexes.create("clients", &index("customers", &["name"], false)).await.unwrap_err();
  assert!(matches!(table, Error::DuplicateIndexName(_)));
  assert_eq!(indexes.list("clients").await.unwrap().len(), 1);
  assert!(indexes.list("customers").await.unwrap().is_empty());
}

#[tokio::test]
async fn unique_columns_look_the_same_however_they_were_added() {
  let (_dir, conn) = tenant().await;
  conn
    .tables()
    .create("clients", &[
      Column::new("id", ColumnType::Integer).primary(),
      Column::new("email", ColumnType::Text).unique(),
    ])
    .await
    .unwrap();
  conn
    .rows()
    .create("clients", vec![("id".into(), Value::Integer(1)), ("email".into(), "a@x.com".into())])
    .await
    .unwrap();
  conn.columns().create("clients", &Column::new("phone", ColumnType::Text).unique()).await.unwrap();

  assert!(conn.indexes().list("clients").await.unwrap().is_empty());
  let origins: Vec<String> = conn
    .run(|conn| {
      let mut stmt = conn.prepare("SELECT origin FROM pragma_index_list('clients') ORDER BY name")?;
      let origins = stmt.query_map([], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
      Ok(origins)
    })
    .await
    .unwrap();
  assert_eq!(origins, vec!["u", "u"]);

  // The existing row survives the rebuild and the new column is enforced.
  let row = conn.rows().get_by_id("clients", &[], 1).await.unwrap();
  assert_eq!(row.get("email"), Some(&Value::Text("a@x.com".into())));
  conn
    .rows()
    .update("clients", 1, vec![("phone".into(), "555".into())])
    .await
    .unwrap();
  let dup = conn
    .rows()
    .create("clients", vec![
      ("id".into(), Value::Integer(2)),
      ("email".into(), "b@x.com".into()),
      ("phone".into(), "555".into()),
    ])
    .await
    .unwrap_err();
  assert!(matches!(dup, Error::Sqlite(ref e) if crate::error::is_unique_violation(e)));
}

// ─── Rows ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn rows_are_listed_newest_first_by_page() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  let rows = conn.rows();
  for i in 1..=5 {
    rows
      .create("customers", vec![("name".into(), Value::Text(format!("c{i}")))])
      .await
      .unwrap();
  }

  let page = |page| Pagination { page, limit: 2, sort: "id".into() };
  let first = rows.list("customers", &customers(), &page(1)).await.unwrap();
  let ids: Vec<_> = first.iter().map(|r| r.get("id").cloned()).collect();
  assert_eq!(ids, vec![Some(Value::Integer(5)), Some(Value::Integer(4))]);

  let last = rows.list("customers", &customers(), &page(3)).await.unwrap();
  assert_eq!(last.len(), 1);
  assert_eq!(last[0].names().collect::<Vec<_>>(), vec!["id", "name"]);
}

#[tokio::test]
async fn typed_values_round_trip() {
  let (_dir, conn) = tenant().await;
  let columns = vec![
    Column::new("id", ColumnType::Integer).primary(),
    Column::new("active", ColumnType::Boolean),
    Column::new("joined", ColumnType::Timestamp),
    Column::new("external", ColumnType::Uuid),
    Column::new("meta", ColumnType::Json),
  ];
  conn.tables().create("members", &columns).await.unwrap();

  let joined = Value::from_json(ColumnType::Timestamp, json!("2024-03-01T10:00:00Z")).unwrap();
  let external = Value::Uuid(Uuid::new_v4());
  let id = conn
    .rows()
    .create("members", vec![
      ("active".into(), Value::Boolean(true)),
      ("joined".into(), joined.clone()),
      ("external".into(), external.clone()),
      ("meta".into(), Value::Json(json!({"tags": ["a"]}))),
    ])
    .await
    .unwrap();

  let row = conn.rows().get_by_id("members", &columns, id).await.unwrap();
  assert_eq!(row.get("active"), Some(&Value::Boolean(true)));
  assert_eq!(row.get("joined"), Some(&joined));
  assert_eq!(row.get("external"), Some(&external));
  assert_eq!(row.get("meta"), Some(&Value::Json(json!({"tags": ["a"]}))));
}

#[tokio::test]
async fn update_and_delete_need_an_existing_row() {
  let (_dir, conn) = tenant().await;
  conn.tables().create("customers", &customers()).await.unwrap();
  let rows = conn.rows();
  let id = rows.create("customers", vec![("name".into(), "A".into())]).await.unwrap();

  rows.update("customers", id, vec![("name".into(), "B".into())]).await.unwrap();
  let row = rows.get_by_id("customers", &customers(), id).await.unwrap();
  assert_eq!(row.get("name"), Some(&Value::Text("B".into())));

  assert!(matches!(rows.update("customers", id, vec![]).await.unwrap_err(), Error::EmptyFields));
  assert!(matches!(rows.create("customers", vec![]).await.unwrap_err(), Error::EmptyFields));

  rows.delete("customers", id).await.unwrap();
  assert!(matches!(rows.delete("customers", id).await.unwrap_err(), Error::RowNotFound { .. }));
  assert!(matches!(
    rows.update("customers", id, vec![("name".into(), "C".into())]).await.unwrap_err(),
    Error::RowNotFound { .. }
  ));
}

#[tokio::test]
async fn rows_of_a_missing_table_are_not_found() {
  let (_dir, conn) = tenant().await;
  let err = conn.rows().get_by_id("ghosts", &[], 1).await.unwrap_err();
  assert!(err.is_missing_table());
  assert_eq!(plinth_core::Error::from(err).kind(), plinth_core::ErrorKind::NotFound);
}
