//! Column-level DDL and column introspection.
//!
//! Batch operations run one column at a time and stop at the first failure;
//! columns already processed stay changed.

use plinth_core::{request::AlterColumn, schema::{Column, ColumnType}};
use tracing::info;

use super::{
  column_names, contains_name,
  shape::{Shape, ShapeColumn, TypeCheck},
  table_exists,
};
use crate::{
  Error, Result, TenantConnection,
  sql::{column_definition, literal, quote_ident, type_name},
};

pub struct ColumnDdl<'c> {
  conn: &'c TenantConnection,
}

impl<'c> ColumnDdl<'c> {
  pub(crate) fn new(conn: &'c TenantConnection) -> Self { Self { conn } }

  /// Column names of `table` in declaration order.
  pub async fn list(&self, table: &str) -> Result<Vec<String>> {
    let table = table.to_owned();
    self
      .conn
      .run(move |conn| {
        let names = column_names(conn, &table)?;
        if names.is_empty() {
          return Err(Error::TableNotFound(table));
        }
        Ok(names)
      })
      .await
  }

  pub async fn has(&self, table: &str, name: &str) -> Result<bool> {
    Ok(contains_name(&self.list(table).await?, name))
  }

  pub async fn has_any(&self, table: &str, names: &[&str]) -> Result<bool> {
    let existing = self.list(table).await?;
    Ok(names.iter().any(|n| contains_name(&existing, n)))
  }

  pub async fn has_all(&self, table: &str, names: &[&str]) -> Result<bool> {
    let existing = self.list(table).await?;
    Ok(names.iter().all(|n| contains_name(&existing, n)))
  }

  /// Add `column` to `table`. A unique column is added by rebuilding the
  /// table with a `UNIQUE` constraint, the same shape a unique column
  /// declared at creation has; its backing index is not listed.
  pub async fn create(&self, table: &str, column: &Column) -> Result<()> {
    let mut add = format!("ALTER TABLE {} ADD COLUMN {}", quote_ident(table), column_definition(column)?);
    if let Some(fk) = &column.foreign_key {
      add.push_str(&format!(" REFERENCES {} ({})", quote_ident(&fk.table), quote_ident(&fk.column)));
    }
    let added = ShapeColumn {
      name:      column.name.clone(),
      decl_type: type_name(column.column_type).to_owned(),
      not_null:  !column.nullable,
      default:   column.default_value()?.map(|value| literal(&value)),
      pk:        0,
    };

    let table_name = table.to_owned();
    let fk = column.foreign_key.clone();
    let unique = column.unique;
    self
      .conn
      .run(move |conn| {
        if !table_exists(conn, &table_name)? {
          return Err(Error::TableNotFound(table_name));
        }
        if let Some(fk) = &fk
          && !contains_name(&column_names(conn, &fk.table)?, &fk.column)
        {
          return Err(Error::ForeignKeyTarget { table: fk.table.clone(), column: fk.column.clone() });
        }

        if !unique {
          conn.execute_batch(&add)?;
          return Ok(());
        }
        let mut shape = Shape::read(conn, &table_name)?;
        shape.uniques.push(vec![added.name.clone()]);
        if let Some(fk) = &fk {
          shape.add_foreign_key(&added.name, &fk.table, &fk.column);
        }
        shape.add_column(added);
        shape.rebuild(conn, None)
      })
      .await?;
    info!(database = self.conn.database(), table, column = %column.name, "column added");
    Ok(())
  }

  pub async fn create_many(&self, table: &str, columns: &[Column]) -> Result<()> {
    for column in columns {
      self.create(table, column).await?;
    }
    Ok(())
  }

  /// Change the declared type of `column`. Fails with
  /// [`Error::IncompatibleType`], leaving the table as it was, when a stored
  /// value cannot be read as `to`.
  pub async fn alter(&self, table: &str, column: &str, to: ColumnType) -> Result<()> {
    let table_name = table.to_owned();
    let column_name = column.to_owned();

    self
      .conn
      .run(move |conn| {
        let mut shape = Shape::read(conn, &table_name)?;
        let Some(target) = shape.column_mut(&column_name) else {
          return Err(Error::ColumnNotFound { table: table_name, column: column_name });
        };
        target.decl_type = type_name(to).to_owned();
        let check = TypeCheck { column: target.name.clone(), to };
        shape.rebuild(conn, Some(&check))
      })
      .await?;
    info!(database = self.conn.database(), table, column, to = %to, "column type changed");
    Ok(())
  }

  pub async fn alter_many(&self, table: &str, changes: &[AlterColumn]) -> Result<()> {
    for change in changes {
      self.alter(table, &change.name, change.column_type).await?;
    }
    Ok(())
  }

  pub async fn rename(&self, table: &str, old: &str, new: &str) -> Result<()> {
    let sql = format!(
      "ALTER TABLE {} RENAME COLUMN {} TO {}",
      quote_ident(table),
      quote_ident(old),
      quote_ident(new)
    );
    self.require_then(table, old, sql).await?;
    info!(database = self.conn.database(), table, from = old, to = new, "column renamed");
    Ok(())
  }

  /// Irreversible: the column's data is lost.
  pub async fn drop(&self, table: &str, column: &str) -> Result<()> {
    let sql = format!("ALTER TABLE {} DROP COLUMN {}", quote_ident(table), quote_ident(column));
    self.require_then(table, column, sql).await?;
    info!(database = self.conn.database(), table, column, "column dropped");
    Ok(())
  }

  /// Run `sql` once `table.column` is known to exist.
  async fn require_then(&self, table: &str, column: &str, sql: String) -> Result<()> {
    let table = table.to_owned();
    let column = column.to_owned();
    self
      .conn
      .run(move |conn| {
        let names = column_names(conn, &table)?;
        if names.is_empty() {
          return Err(Error::TableNotFound(table));
        }
        if !contains_name(&names, &column) {
          return Err(Error::ColumnNotFound { table, column });
        }
        conn.execute_batch(&sql)?;
        Ok(())
      })
      .await
  }
}
