//! Table definitions and demo data.

use rusqlite::{Connection, params};

use crate::error::{DaoError, DaoResult};
use crate::repository::Repository;
use crate::user::{User, UserRepository, UserRole};

const SCHEMA: &str = include_str!("../sql/schema.sql");

/// Stored in `PRAGMA user_version` once the tables exist.
pub const SCHEMA_VERSION: i32 = 1;

/// SHA-256 of `password`, used for every demo account.
pub const DEMO_PASSWORD_HASH: &str =
    "5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8";

/// Create the tables if this database has not been migrated yet.
///
/// Returns `true` when the schema was created, `false` when it was already
/// current.
pub fn migrate(conn: &Connection) -> DaoResult<bool> {
    let version: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|source| schema_error("read user_version", source))?;
    if version >= SCHEMA_VERSION {
        log::debug!("schema already at version {}", version);
        return Ok(false);
    }

    let tx = conn
        .unchecked_transaction()
        .map_err(|source| schema_error("begin", source))?;
    tx.execute_batch(SCHEMA)
        .map_err(|source| schema_error("create tables", source))?;
    tx.pragma_update(None, "user_version", SCHEMA_VERSION)
        .map_err(|source| schema_error("set user_version", source))?;
    tx.commit().map_err(|source| schema_error("commit", source))?;

    log::info!("database schema migrated to version {}", SCHEMA_VERSION);
    Ok(true)
}

fn schema_error(step: &'static str, source: rusqlite::Error) -> DaoError {
    DaoError::Schema { step, source }
}

/// Rows written by [`seed_demo`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub programs: usize,
}

const DEMO_TRAINERS: [(&str, &str, &str); 2] =
    [("anna", "Anna", "Petrova"), ("ivan", "Ivan", "Sidorov")];

/// login, first name, last name, index into `DEMO_TRAINERS`, wants a trainer
type DemoClient = (&'static str, &'static str, &'static str, Option<usize>, bool);

const DEMO_CLIENTS: [DemoClient; 5] = [
    ("alice", "Alice", "Smith", Some(0), true),
    ("bob", "Bob", "Brown", Some(0), true),
    ("carol", "Carol", "White", None, false),
    ("dave", "Dave", "Black", Some(1), true),
    ("erin", "Erin", "Green", None, false),
];

/// Fill an empty database with one admin, two trainers and five clients.
/// Clients with a personal trainer also get a training program written by
/// that trainer. Does nothing when `users` already has rows.
pub fn seed_demo(conn: &Connection, users: &UserRepository) -> DaoResult<SeedReport> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if existing > 0 {
        log::info!("users table holds {} rows; skipping demo data", existing);
        return Ok(SeedReport::default());
    }

    let tx = conn.unchecked_transaction()?;
    let mut report = SeedReport::default();

    let mut admin = User::new("admin", DEMO_PASSWORD_HASH, UserRole::Admin, "Olga", "Ivanova");
    users.insert(&tx, &mut admin)?;
    report.users += 1;

    let mut trainer_ids = Vec::with_capacity(DEMO_TRAINERS.len());
    for (login, first, last) in DEMO_TRAINERS {
        let mut trainer = User::new(login, DEMO_PASSWORD_HASH, UserRole::Trainer, first, last);
        users.insert(&tx, &mut trainer)?;
        trainer_ids.push(trainer.id);
        report.users += 1;
    }

    for (login, first, last, trainer, wants_trainer) in DEMO_CLIENTS {
        let mut client = User::new(login, DEMO_PASSWORD_HASH, UserRole::Client, first, last);
        users.insert(&tx, &mut client)?;
        report.users += 1;

        let trainer_id = trainer.and_then(|index| trainer_ids.get(index).copied());
        tx.execute(
            "UPDATE users SET is_personal_trainer_need = ?1, personal_trainer_id = ?2
             WHERE id = ?3",
            params![i32::from(wants_trainer), trainer_id, client.id],
        )?;

        if let Some(trainer_id) = trainer_id {
            tx.execute(
                "INSERT INTO training_programs (author_id, client_id, diet, start_date, end_date)
                 VALUES (?1, ?2, 'balanced', date('now'), date('now', '+30 days'))",
                params![trainer_id, client.id],
            )?;
            report.programs += 1;
        }
    }

    tx.commit()?;
    log::info!(
        "seeded {} users and {} training programs",
        report.users,
        report.programs
    );
    Ok(report)
}
