//! Row operations. Field values are decoded against the catalog's column
//! types before the row engine sees them; the catalog is never written.

use plinth_core::{
  Error, Result,
  catalog::{Catalog, MembershipDirectory},
  name,
  policy::Capability,
  project::Principal,
  request::RowFields,
  row::{Pagination, Row},
  schema::{ColumnType, Table},
  value::Value,
};
use plinth_store_sqlite::rows::ID_COLUMN;
use uuid::Uuid;

use crate::Services;

/// Largest page a listing may ask for.
pub const MAX_PAGE_LIMIT: u32 = 1_000;

impl<C> Services<C>
where
  C: Catalog + MembershipDirectory,
{
  /// One page of rows, newest `page.sort` first. The sort column must be a
  /// catalog column of the table.
  pub async fn list_rows(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    page: Pagination,
  ) -> Result<Vec<Row>> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let table = self.require_table(&project, table).await?;

    if !(1..=MAX_PAGE_LIMIT).contains(&page.limit) {
      return Err(Error::unprocessable(format!("row.error.pageLimit: {}", page.limit)));
    }
    let sort = table
      .column(&page.sort)
      .ok_or_else(|| Error::unprocessable(format!("row.error.unknownSortColumn: {}", page.sort)))?;
    let page = Pagination { sort: sort.name.clone(), ..page };

    let conn = self.connect(&project).await?;
    Ok(conn.rows().list(&table.name, &table.columns, &page).await?)
  }

  pub async fn get_row(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    id: i64,
  ) -> Result<Row> {
    let project = self.authorize(project_id, principal, Capability::Access).await?;
    let table = self.require_table(&project, table).await?;
    require_integer_id(&table)?;
    let conn = self.connect(&project).await?;
    Ok(conn.rows().get_by_id(&table.name, &table.columns, id).await?)
  }

  /// Insert a row and return it as stored.
  pub async fn create_row(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    fields: RowFields,
  ) -> Result<Row> {
    let project = self.authorize(project_id, principal, Capability::Create).await?;
    let table = self.require_table(&project, table).await?;
    require_integer_id(&table)?;
    let fields = decode_fields(&table, fields)?;

    let conn = self.connect(&project).await?;
    let id = conn.rows().create(&table.name, fields).await?;
    Ok(conn.rows().get_by_id(&table.name, &table.columns, id).await?)
  }

  pub async fn update_row(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    id: i64,
    fields: RowFields,
  ) -> Result<Row> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;
    require_integer_id(&table)?;
    let fields = decode_fields(&table, fields)?;
    if fields.iter().any(|(field, _)| name::same(field, ID_COLUMN)) {
      return Err(Error::unprocessable("row.error.idImmutable"));
    }

    let conn = self.connect(&project).await?;
    conn.rows().update(&table.name, id, fields).await?;
    Ok(conn.rows().get_by_id(&table.name, &table.columns, id).await?)
  }

  pub async fn delete_row(
    &self,
    principal: &Principal,
    project_id: Uuid,
    table: &str,
    id: i64,
  ) -> Result<()> {
    let project = self.authorize(project_id, principal, Capability::Update).await?;
    let table = self.require_table(&project, table).await?;
    require_integer_id(&table)?;
    let conn = self.connect(&project).await?;
    Ok(conn.rows().delete(&table.name, id).await?)
  }
}

/// Rows are addressed by an integer `id` column; tables without one only
/// support listing.
fn require_integer_id(table: &Table) -> Result<()> {
  match table.column(ID_COLUMN) {
    Some(column) if column.column_type == ColumnType::Integer => Ok(()),
    _ => Err(Error::unprocessable(format!("row.error.idColumn: {}", table.name))),
  }
}

/// Decode request fields by the catalog type of their column. Field names
/// are replaced by the catalog's spelling; two keys naming the same column
/// are rejected.
fn decode_fields(table: &Table, fields: RowFields) -> Result<Vec<(String, Value)>> {
  if fields.is_empty() {
    return Err(Error::unprocessable("row.error.emptyFields"));
  }
  let mut decoded: Vec<(String, Value)> = Vec::with_capacity(fields.0.len());
  for (name, json) in fields.0 {
    let column = table
      .column(&name)
      .ok_or_else(|| Error::unprocessable(format!("row.error.unknownColumn: {name}")))?;
    if decoded.iter().any(|(seen, _)| *seen == column.name) {
      return Err(Error::unprocessable(format!("row.error.duplicateColumn: {name}")));
    }
    let value = Value::from_json(column.column_type, json)
      .ok_or_else(|| Error::unprocessable(format!("row.error.invalidValue: {name}")))?;
    decoded.push((column.name.clone(), value));
  }
  Ok(decoded)
}
