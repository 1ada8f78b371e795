//! Connection managers: how the pool opens and closes one driver session.

/// Opens and closes connections on behalf of a [`Pool`](crate::Pool).
///
/// The pool never inspects a connection; it only hands it out and takes it back.
pub trait ManageConnection: Send + Sync + 'static {
    type Connection: Send + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a new session.
    fn connect(&self) -> Result<Self::Connection, Self::Error>;

    /// Close a session. Called for idle connections at shutdown and for
    /// connections that come back after the pool was closed.
    fn close(&self, conn: Self::Connection) -> Result<(), Self::Error>;
}

#[cfg(feature = "sqlite")]
pub use self::sqlite::SqliteManager;

#[cfg(feature = "sqlite")]
mod sqlite {
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use rusqlite::{Connection, OpenFlags};

    use super::ManageConnection;

    /// SQLite sessions backed by `rusqlite`, one file shared by every connection.
    #[derive(Debug, Clone)]
    pub struct SqliteManager {
        path: PathBuf,
        flags: OpenFlags,
        busy_timeout: Duration,
    }

    impl SqliteManager {
        pub fn file(path: impl Into<PathBuf>) -> Self {
            Self {
                path: path.into(),
                flags: OpenFlags::default(),
                busy_timeout: Duration::from_secs(5),
            }
        }

        pub fn with_flags(mut self, flags: OpenFlags) -> Self {
            self.flags = flags;
            self
        }

        pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
            self.busy_timeout = timeout;
            self
        }

        pub fn path(&self) -> &Path {
            &self.path
        }
    }

    impl ManageConnection for SqliteManager {
        type Connection = Connection;
        type Error = rusqlite::Error;

        fn connect(&self) -> Result<Connection, rusqlite::Error> {
            let conn = Connection::open_with_flags(&self.path, self.flags)?;
            conn.busy_timeout(self.busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            log::debug!("opened sqlite connection to {}", self.path.display());
            Ok(conn)
        }

        fn close(&self, conn: Connection) -> Result<(), rusqlite::Error> {
            conn.close().map_err(|(_, err)| err)
        }
    }
}
