//! Users of the gym and the queries run against them.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;

use crate::catalog::QueryCatalog;
use crate::error::{DaoError, DaoResult};
use crate::page::{Page, PageRequest};
use crate::repository::{Entity, Repository, expect_affected, query_all, query_first};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Client,
    Trainer,
    Admin,
}

impl UserRole {
    /// The value stored in the `role` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Client => "CLIENT",
            UserRole::Trainer => "TRAINER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = DaoError;

    fn from_str(s: &str) -> DaoResult<Self> {
        match s {
            "CLIENT" => Ok(UserRole::Client),
            "TRAINER" => Ok(UserRole::Trainer),
            "ADMIN" => Ok(UserRole::Admin),
            other => Err(DaoError::UnknownRole(other.to_string())),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of `users`. `password` holds the already hashed secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct User {
    pub id: i32,
    pub login: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    /// A user that has not been stored yet (`id == 0`).
    pub fn new(
        login: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            login: login.into(),
            password: password.into(),
            role,
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    pub fn full_name(&self) -> String {
        full_name(&self.first_name, &self.last_name)
    }
}

impl Entity for User {
    fn id(&self) -> i32 {
        self.id
    }
}

fn full_name(first: &str, last: &str) -> String {
    format!("{first} {last}")
}

/// Data access for [`User`].
///
/// Holds only its query catalog, so one instance can be shared across
/// threads. Each call runs on the connection it is given.
#[derive(Debug, Clone)]
pub struct UserRepository {
    catalog: Arc<QueryCatalog>,
}

impl UserRepository {
    /// Repository backed by the built-in statements.
    pub fn new() -> DaoResult<Self> {
        Ok(Self::with_catalog(Arc::new(QueryCatalog::users()?)))
    }

    pub fn with_catalog(catalog: Arc<QueryCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    fn sql(&self, key: &str) -> DaoResult<&str> {
        let sql = self.catalog.get(key)?;
        log::debug!("Executing {}: {}", key, sql.trim());
        Ok(sql)
    }

    /// The user with this login and password hash, if any.
    pub fn find_by_credentials(
        &self,
        conn: &Connection,
        login: &str,
        password_hash: &str,
    ) -> DaoResult<Option<User>> {
        let sql = self.sql("find_by_credentials")?;
        query_first(conn, sql, params![login, password_hash], |row| self.map_row(row))
    }

    /// `true` when no user has registered `login` yet.
    pub fn is_login_unique(&self, conn: &Connection, login: &str) -> DaoResult<bool> {
        let sql = self.sql("find_by_login")?;
        let taken = conn
            .query_row(sql, [login], |row| row.get::<_, i32>(0))
            .optional()?;
        Ok(taken.is_none())
    }

    /// Clients whose first and last name both match exactly.
    pub fn find_by_name(&self, conn: &Connection, first: &str, last: &str) -> DaoResult<Vec<User>> {
        let sql = self.sql("find_clients_by_name")?;
        query_all(conn, sql, [first, last], |row| self.map_row(row))
    }

    /// One page of clients plus the number of clients in total.
    ///
    /// Both reads run in one transaction so the total describes the same
    /// snapshot as the page. When `conn` is already inside a transaction the
    /// reads join it.
    pub fn find_page_of_clients(
        &self,
        conn: &Connection,
        request: PageRequest,
    ) -> DaoResult<Page<User>> {
        let page_sql = self.sql("find_clients_page")?;
        let count_sql = self.sql("count_clients")?;

        let read = |conn: &Connection| -> DaoResult<Page<User>> {
            let items = query_all(conn, page_sql, [request.offset, request.limit], |row| {
                self.map_row(row)
            })?;
            let total: i64 = conn.query_row(count_sql, [], |row| row.get(0))?;
            let total = u64::try_from(total).map_err(|_| DaoError::InvalidValue {
                column: "COUNT(*)",
                value: total,
            })?;
            Ok(Page::new(items, request, total))
        };

        if !conn.is_autocommit() {
            return read(conn);
        }
        let tx = conn.unchecked_transaction()?;
        let page = read(&*tx)?;
        tx.commit()?;
        Ok(page)
    }

    /// Every client the trainer personally coaches, with the id of the
    /// client's training program.
    ///
    /// Runs one program lookup per client (N+1 queries). Fine for a
    /// trainer's handful of clients; a join is the way out if that stops
    /// being true. A client without a program is reported as
    /// [`DaoError::MissingRow`].
    pub fn find_trainer_clients_with_program_id(
        &self,
        conn: &Connection,
        trainer_id: i32,
    ) -> DaoResult<HashMap<User, i32>> {
        let clients_sql = self.sql("find_trainer_clients")?;
        let program_sql = self.sql("find_client_program_id")?;

        let clients = query_all(conn, clients_sql, [trainer_id], |row| self.map_row(row))?;
        let mut program_stmt = conn.prepare(program_sql)?;
        let mut result = HashMap::with_capacity(clients.len());

        for client in clients {
            let program_id: Option<i32> = program_stmt
                .query_row([client.id], |row| row.get(0))
                .optional()?;
            let program_id = program_id.ok_or_else(|| {
                DaoError::MissingRow(format!("training program for client {}", client.id))
            })?;
            result.insert(client, program_id);
        }
        Ok(result)
    }

    /// "First Last" of the trainer who wrote the program.
    pub fn find_author_full_name(&self, conn: &Connection, program_id: i32) -> DaoResult<String> {
        let sql = self.sql("find_program_author_name")?;
        let names: Option<(String, String)> = conn
            .query_row(sql, [program_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .optional()?;
        match names {
            Some((first, last)) => Ok(full_name(&first, &last)),
            None => Err(DaoError::MissingRow(format!(
                "author of training program {program_id}"
            ))),
        }
    }

    /// Client id to "First Last", for every client.
    pub fn find_client_id_and_name_index(
        &self,
        conn: &Connection,
    ) -> DaoResult<HashMap<i32, String>> {
        let sql = self.sql("find_client_names")?;
        let pairs = query_all(conn, sql, [], |row| {
            let id: i32 = row.get("id")?;
            let first: String = row.get("first_name")?;
            let last: String = row.get("last_name")?;
            Ok((id, full_name(&first, &last)))
        })?;
        Ok(pairs.into_iter().collect())
    }

    /// Whether the client asked for a personal trainer. The column must
    /// hold 0 or 1.
    pub fn is_personal_trainer_needed(&self, conn: &Connection, client_id: i32) -> DaoResult<bool> {
        let sql = self.sql("find_personal_trainer_need")?;
        let value: Option<i64> = conn
            .query_row(sql, [client_id], |row| row.get(0))
            .optional()?;
        match value {
            Some(1) => Ok(true),
            Some(0) => Ok(false),
            Some(value) => Err(DaoError::InvalidValue {
                column: "is_personal_trainer_need",
                value,
            }),
            None => Err(DaoError::MissingRow(format!("user {client_id}"))),
        }
    }
}

impl Repository for UserRepository {
    type Entity = User;

    fn table_name(&self) -> &'static str {
        "users"
    }

    fn map_row(&self, row: &Row<'_>) -> DaoResult<User> {
        let role: String = row.get("role")?;
        Ok(User {
            id: row.get("id")?,
            login: row.get("login")?,
            password: row.get("password")?,
            role: role.parse()?,
            first_name: row.get("first_name")?,
            last_name: row.get("last_name")?,
        })
    }

    fn insert(&self, conn: &Connection, user: &mut User) -> DaoResult<()> {
        let sql = self.sql("insert")?;
        let affected = conn.execute(
            sql,
            params![
                user.login,
                user.password,
                user.role.as_str(),
                user.first_name,
                user.last_name
            ],
        )?;
        expect_affected("insert", self.table_name(), 1, affected)?;

        let id = conn.last_insert_rowid();
        user.id = i32::try_from(id).map_err(|_| DaoError::InvalidValue {
            column: "id",
            value: id,
        })?;
        Ok(())
    }

    fn update(&self, conn: &Connection, user: &User) -> DaoResult<()> {
        let sql = self.sql("update")?;
        let affected = conn.execute(
            sql,
            params![
                user.login,
                user.password,
                user.role.as_str(),
                user.first_name,
                user.last_name,
                user.id
            ],
        )?;
        expect_affected("update", self.table_name(), 1, affected)
    }
}
