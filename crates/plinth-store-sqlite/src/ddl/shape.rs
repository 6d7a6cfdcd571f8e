//! Introspected table structure and the rebuild procedure.
//!
//! SQLite cannot change a column's type or add a constraint to an existing
//! table. Both are done by rebuilding: create a shadow table with the new
//! shape, copy the rows, swap it in, restore the indexes. The whole swap runs
//! in one transaction, so a failed check leaves the table untouched.

use plinth_core::schema::ColumnType;
use tracing::debug;

use crate::{
  Error, Result,
  sql::{conversion_violation, ident_list, quote_ident},
};

const SHADOW_SUFFIX: &str = "__plinth_rebuild";

/// First-column strings of a single-parameter query.
fn strings(conn: &rusqlite::Connection, sql: &str, arg: &str) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt.query_map([arg], |row| row.get(0))?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

#[derive(Debug, Clone)]
pub struct ShapeColumn {
  pub name:      String,
  pub decl_type: String,
  pub not_null:  bool,
  /// Default expression as stored in the schema.
  pub default:   Option<String>,
  /// 1-based position in the primary key, 0 when not part of it.
  pub pk:        i64,
}

#[derive(Debug, Clone)]
pub struct ShapeForeignKey {
  pub from:  Vec<String>,
  pub table: String,
  /// Empty when the reference targets the other table's primary key.
  pub to:    Vec<String>,
}

/// Values of `column` must be readable as `to` after the rebuild.
#[derive(Debug, Clone)]
pub struct TypeCheck {
  pub column: String,
  pub to:     ColumnType,
}

#[derive(Debug, Clone)]
pub struct Shape {
  pub table:        String,
  pub columns:      Vec<ShapeColumn>,
  pub uniques:      Vec<Vec<String>>,
  pub foreign_keys: Vec<ShapeForeignKey>,
  /// `CREATE INDEX` statements of explicitly created indexes.
  pub index_sql:    Vec<String>,
  /// Columns appended by [`Shape::add_column`]; they have no rows to copy.
  added:            Vec<String>,
}

impl Shape {
  /// Read the current structure of `table`.
  pub fn read(conn: &rusqlite::Connection, table: &str) -> Result<Self> {
    let mut stmt = conn.prepare(
      r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
    )?;
    let columns = stmt
      .query_map([table], |row| {
        Ok(ShapeColumn {
          name:      row.get(0)?,
          decl_type: row.get(1)?,
          not_null:  row.get(2)?,
          default:   row.get(3)?,
          pk:        row.get(4)?,
        })
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;
    if columns.is_empty() {
      return Err(Error::TableNotFound(table.to_owned()));
    }

    let unique_indexes = strings(
      conn,
      "SELECT name FROM pragma_index_list(?1) WHERE origin = 'u' ORDER BY name",
      table,
    )?;
    let uniques = unique_indexes
      .iter()
      .map(|index| strings(conn, "SELECT name FROM pragma_index_info(?1) ORDER BY seqno", index))
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut stmt = conn.prepare(
      r#"SELECT id, "table", "from", "to" FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
    )?;
    let references = stmt
      .query_map([table], |row| {
        Ok((
          row.get::<_, i64>(0)?,
          row.get::<_, String>(1)?,
          row.get::<_, String>(2)?,
          row.get::<_, Option<String>>(3)?,
        ))
      })?
      .collect::<rusqlite::Result<Vec<_>>>()?;

    let mut foreign_keys: Vec<(i64, ShapeForeignKey)> = Vec::new();
    for (id, target, from, to) in references {
      match foreign_keys.last_mut() {
        Some((last, fk)) if *last == id => {
          fk.from.push(from);
          fk.to.extend(to);
        }
        _ => foreign_keys.push((id, ShapeForeignKey {
          from:  vec![from],
          table: target,
          to:    to.into_iter().collect(),
        })),
      }
    }

    let index_sql = strings(
      conn,
      "SELECT sql FROM sqlite_schema
       WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL
       ORDER BY name",
      table,
    )?;

    Ok(Self {
      table: table.to_owned(),
      columns,
      uniques,
      foreign_keys: foreign_keys.into_iter().map(|(_, fk)| fk).collect(),
      index_sql,
      added: Vec::new(),
    })
  }

  pub fn column_mut(&mut self, name: &str) -> Option<&mut ShapeColumn> {
    self.columns.iter_mut().find(|c| c.name.eq_ignore_ascii_case(name))
  }

  /// Append a column that the rebuild creates empty, filled by its default.
  pub fn add_column(&mut self, column: ShapeColumn) {
    self.added.push(column.name.clone());
    self.columns.push(column);
  }

  pub fn add_foreign_key(&mut self, column: &str, table: &str, target: &str) {
    self.foreign_keys.push(ShapeForeignKey {
      from:  vec![column.to_owned()],
      table: table.to_owned(),
      to:    vec![target.to_owned()],
    });
  }

  /// `CREATE TABLE` for this shape under the name `name`.
  fn create_sql(&self, name: &str) -> String {
    let mut parts: Vec<String> = self
      .columns
      .iter()
      .map(|c| {
        let mut def = quote_ident(&c.name);
        if !c.decl_type.is_empty() {
          def.push(' ');
          def.push_str(&c.decl_type);
        }
        if c.not_null {
          def.push_str(" NOT NULL");
        }
        if let Some(default) = &c.default {
          def.push_str(" DEFAULT ");
          def.push_str(default);
        }
        def
      })
      .collect();

    let mut pk: Vec<&ShapeColumn> = self.columns.iter().filter(|c| c.pk > 0).collect();
    pk.sort_by_key(|c| c.pk);
    if !pk.is_empty() {
      parts.push(format!("PRIMARY KEY ({})", ident_list(pk.iter().map(|c| c.name.as_str()))));
    }
    for unique in &self.uniques {
      parts.push(format!("UNIQUE ({})", ident_list(unique.iter().map(String::as_str))));
    }
    for fk in &self.foreign_keys {
      let mut clause = format!(
        "FOREIGN KEY ({}) REFERENCES {}",
        ident_list(fk.from.iter().map(String::as_str)),
        quote_ident(&fk.table)
      );
      if !fk.to.is_empty() {
        clause.push_str(&format!(" ({})", ident_list(fk.to.iter().map(String::as_str))));
      }
      parts.push(clause);
    }

    format!("CREATE TABLE {} ({})", quote_ident(name), parts.join(", "))
  }

  /// Replace the table with one of this shape, keeping its rows.
  ///
  /// Foreign key enforcement is switched off for the swap and back on
  /// afterwards; references are verified with `foreign_key_check` before
  /// the commit.
  pub fn rebuild(&self, conn: &mut rusqlite::Connection, check: Option<&TypeCheck>) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", false)?;
    let outcome = self.swap(conn, check);
    conn.pragma_update(None, "foreign_keys", true)?;
    outcome
  }

  fn swap(&self, conn: &mut rusqlite::Connection, check: Option<&TypeCheck>) -> Result<()> {
    let table = quote_ident(&self.table);
    let shadow = quote_ident(&format!("{}{SHADOW_SUFFIX}", self.table));
    let columns = ident_list(
      self
        .columns
        .iter()
        .filter(|c| !self.added.contains(&c.name))
        .map(|c| c.name.as_str()),
    );

    let tx = conn.transaction()?;

    let create = self.create_sql(&format!("{}{SHADOW_SUFFIX}", self.table));
    debug!(sql = %create, "rebuilding table");
    tx.execute_batch(&create)?;
    tx.execute(&format!("INSERT INTO {shadow} ({columns}) SELECT {columns} FROM {table}"), [])?;

    if let Some(check) = check
      && let Some(predicate) = conversion_violation(&check.column, check.to)
    {
      let offending: i64 =
        tx.query_row(&format!("SELECT COUNT(*) FROM {shadow} WHERE {predicate}"), [], |row| {
          row.get(0)
        })?;
      if offending > 0 {
        return Err(Error::IncompatibleType { column: check.column.clone(), to: check.to });
      }
    }

    tx.execute(&format!("DROP TABLE {table}"), [])?;
    tx.execute(&format!("ALTER TABLE {shadow} RENAME TO {table}"), [])?;
    for sql in &self.index_sql {
      tx.execute_batch(sql)?;
    }

    let violations: i64 = tx.query_row(
      "SELECT COUNT(*) FROM pragma_foreign_key_check(?1)",
      [&self.table],
      |row| row.get(0),
    )?;
    if violations > 0 {
      return Err(Error::ForeignKeyViolation(self.table.clone()));
    }

    tx.commit()?;
    Ok(())
  }
}
