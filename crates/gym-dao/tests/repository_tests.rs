mod common;

use std::error::Error;

use common::{ALICE, CAROL};
use gym_dao::schema::DEMO_PASSWORD_HASH;
use gym_dao::{DaoError, Repository, User, UserRole};

#[test]
fn test_find_all_empty_table() {
    let fx = common::empty(1);
    let conn = fx.pool.acquire().unwrap();

    assert!(fx.users.find_all(&conn).unwrap().is_empty());
}

#[test]
fn test_find_all_returns_every_row() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let all = fx.users.find_all(&conn).unwrap();
    assert_eq!(all.len(), 8);
    assert_eq!(all.iter().filter(|u| u.role == UserRole::Client).count(), 5);
    assert_eq!(all.iter().filter(|u| u.role == UserRole::Trainer).count(), 2);
}

#[test]
fn test_find_by_id() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let alice = fx.users.find_by_id(&conn, ALICE).unwrap().unwrap();
    assert_eq!(alice.login, "alice");
    assert_eq!(alice.role, UserRole::Client);
    assert_eq!(alice.full_name(), "Alice Smith");

    assert!(fx.users.find_by_id(&conn, 999).unwrap().is_none());
}

#[test]
fn test_delete_by_id() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    fx.users.delete_by_id(&conn, CAROL).unwrap();
    assert!(fx.users.find_by_id(&conn, CAROL).unwrap().is_none());

    // Gone already: nothing to delete.
    let err = fx.users.delete_by_id(&conn, CAROL).unwrap_err();
    assert!(matches!(
        err,
        DaoError::AffectedRows {
            operation: "delete",
            table: "users",
            expected: 1,
            actual: 0,
        }
    ));
}

#[test]
fn test_delete_nonexistent_id_fails() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let err = fx.users.delete_by_id(&conn, 999).unwrap_err();
    assert!(matches!(err, DaoError::AffectedRows { actual: 0, .. }));
    assert_eq!(fx.users.find_all(&conn).unwrap().len(), 8);
}

#[test]
fn test_insert_assigns_id_and_update_persists() {
    let fx = common::empty(1);
    let conn = fx.pool.acquire().unwrap();

    let mut zoe = User::new("zoe", "hash", UserRole::Client, "Zoe", "Adams");
    fx.users.insert(&conn, &mut zoe).unwrap();
    assert!(zoe.id > 0);

    zoe.last_name = "Baker".to_string();
    zoe.role = UserRole::Trainer;
    fx.users.update(&conn, &zoe).unwrap();

    let stored = fx.users.find_by_id(&conn, zoe.id).unwrap().unwrap();
    assert_eq!(stored, zoe);
}

#[test]
fn test_update_missing_row_fails() {
    let fx = common::empty(1);
    let conn = fx.pool.acquire().unwrap();

    let mut ghost = User::new("ghost", "hash", UserRole::Client, "No", "One");
    ghost.id = 42;
    let err = fx.users.update(&conn, &ghost).unwrap_err();
    assert!(matches!(err, DaoError::AffectedRows { operation: "update", actual: 0, .. }));
}

#[test]
fn test_driver_error_keeps_source() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let mut duplicate = User::new("alice", DEMO_PASSWORD_HASH, UserRole::Client, "A", "S");
    let err = fx.users.insert(&conn, &mut duplicate).unwrap_err();

    assert!(matches!(err, DaoError::Sql(_)));
    assert!(err.source().is_some());
    assert_eq!(duplicate.id, 0);
}

#[test]
fn test_unknown_role_in_row() {
    let fx = common::empty(1);
    let conn = fx.pool.acquire().unwrap();
    conn.execute(
        "INSERT INTO users (login, password, role, first_name, last_name)
         VALUES ('guest', 'x', 'GUEST', 'G', 'U')",
        [],
    )
    .unwrap();
    let id = conn.last_insert_rowid() as i32;

    let err = fx.users.find_by_id(&conn, id).unwrap_err();
    assert!(matches!(err, DaoError::UnknownRole(ref role) if role == "GUEST"));
}

#[test]
fn test_scoped_connection_released_on_error() {
    let fx = common::seeded(2);

    let result = fx.pool.with_connection(|conn| fx.users.delete_by_id(conn, 999));

    assert!(matches!(result, Err(DaoError::AffectedRows { .. })));
    assert_eq!(fx.pool.state().idle, 2);
    assert_eq!(fx.pool.state().lent, 0);
}

#[test]
fn test_pool_errors_convert() {
    let fx = common::seeded(1);
    fx.pool.shutdown();

    let result = fx.pool.with_connection(|conn| fx.users.find_all(conn));
    assert!(matches!(result, Err(DaoError::Pool(gym_pool::PoolError::Closed))));
}
