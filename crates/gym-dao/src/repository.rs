//! Generic data access shared by every entity repository.

use rusqlite::{Connection, Params, Row};

use crate::error::{DaoError, DaoResult};

/// A domain record stored as one row, keyed by an integer `id` column.
pub trait Entity {
    fn id(&self) -> i32;
}

/// Per-entity data access. Implementors supply the table and row mapping
/// plus the writes; reads by id and deletes come for free.
///
/// Every method takes the connection to run on. Pool guards and
/// transactions both deref to [`Connection`].
pub trait Repository: Send + Sync {
    type Entity: Entity;

    fn table_name(&self) -> &'static str;

    fn map_row(&self, row: &Row<'_>) -> DaoResult<Self::Entity>;

    /// Insert `entity` and store the generated id back into it.
    fn insert(&self, conn: &Connection, entity: &mut Self::Entity) -> DaoResult<()>;

    fn update(&self, conn: &Connection, entity: &Self::Entity) -> DaoResult<()>;

    fn find_all(&self, conn: &Connection) -> DaoResult<Vec<Self::Entity>> {
        let sql = format!("SELECT * FROM {}", self.table_name());
        log::debug!("Executing FindAll: {}", sql);
        query_all(conn, &sql, [], |row| self.map_row(row))
    }

    /// `Ok(None)` when no row has this id.
    fn find_by_id(&self, conn: &Connection, id: i32) -> DaoResult<Option<Self::Entity>> {
        let sql = format!("SELECT * FROM {} WHERE id = ?1", self.table_name());
        log::debug!("Executing FindById: {} | id: {}", sql, id);
        query_first(conn, &sql, [id], |row| self.map_row(row))
    }

    /// Delete the row with this id. Fails unless exactly one row went away.
    fn delete_by_id(&self, conn: &Connection, id: i32) -> DaoResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1", self.table_name());
        log::debug!("Executing Delete: {} | id: {}", sql, id);
        let affected = conn.execute(&sql, [id])?;
        expect_affected("delete", self.table_name(), 1, affected)
    }
}

/// Run `sql` and map every row.
pub(crate) fn query_all<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    mut map: F,
) -> DaoResult<Vec<T>>
where
    P: Params,
    F: FnMut(&Row<'_>) -> DaoResult<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        out.push(map(row)?);
    }
    Ok(out)
}

/// Run `sql` and map the first row, if any.
pub(crate) fn query_first<T, P, F>(
    conn: &Connection,
    sql: &str,
    params: P,
    map: F,
) -> DaoResult<Option<T>>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> DaoResult<T>,
{
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => map(row).map(Some),
        None => Ok(None),
    }
}

pub(crate) fn expect_affected(
    operation: &'static str,
    table: &'static str,
    expected: usize,
    actual: usize,
) -> DaoResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(DaoError::AffectedRows {
            operation,
            table,
            expected,
            actual,
        })
    }
}
