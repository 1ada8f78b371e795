//! # gym-dao
//!
//! Repository layer for the gym database.
//!
//! [`Repository`] gives every entity `find_all`, `find_by_id` and
//! `delete_by_id` once it names its table and maps a row. [`UserRepository`]
//! adds the user queries on top, with its SQL kept in a [`QueryCatalog`].
//!
//! Repositories never own a connection. Borrow one from a
//! [`gym_pool::Pool`] and pass it in:
//!
//! ```no_run
//! use gym_dao::{DaoError, Repository, UserRepository};
//! use gym_pool::DbConfig;
//!
//! # fn main() -> Result<(), DaoError> {
//! let pool = DbConfig::from_env()?.connect_sqlite()?;
//! let users = UserRepository::new()?;
//! let alice = pool.with_connection(|conn| users.find_by_id(conn, 1))?;
//! # let _ = alice;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod page;
pub mod repository;
pub mod schema;
pub mod user;

pub use catalog::QueryCatalog;
pub use error::{DaoError, DaoResult};
pub use page::{Page, PageRequest};
pub use repository::{Entity, Repository};
pub use schema::{SeedReport, migrate, seed_demo};
pub use user::{User, UserRepository, UserRole};
