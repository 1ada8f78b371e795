mod common;

use common::{ADMIN, ALICE, ANNA, BOB, CAROL, CLIENT_COUNT, DAVE, IVAN};
use gym_dao::schema::DEMO_PASSWORD_HASH;
use gym_dao::{DaoError, PageRequest, Repository, UserRepository, UserRole, migrate, seed_demo};

#[test]
fn test_find_by_credentials() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let alice = fx
        .users
        .find_by_credentials(&conn, "alice", DEMO_PASSWORD_HASH)
        .unwrap()
        .unwrap();
    assert_eq!(alice.id, ALICE);

    assert!(fx.users.find_by_credentials(&conn, "alice", "wrong").unwrap().is_none());
    assert!(
        fx.users
            .find_by_credentials(&conn, "nobody", DEMO_PASSWORD_HASH)
            .unwrap()
            .is_none()
    );
}

#[test]
fn test_is_login_unique() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    assert!(!fx.users.is_login_unique(&conn, "alice").unwrap());
    assert!(!fx.users.is_login_unique(&conn, "anna").unwrap());
    assert!(fx.users.is_login_unique(&conn, "zoe").unwrap());
}

#[test]
fn test_find_by_name_matches_clients_only() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let found = fx.users.find_by_name(&conn, "Alice", "Smith").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ALICE);

    assert!(fx.users.find_by_name(&conn, "Anna", "Petrova").unwrap().is_empty());
    assert!(fx.users.find_by_name(&conn, "Alice", "Brown").unwrap().is_empty());
}

#[test]
fn test_page_of_clients() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let first = fx.users.find_page_of_clients(&conn, PageRequest::new(0, 2)).unwrap();
    assert_eq!(first.total, CLIENT_COUNT);
    let ids: Vec<i32> = first.items.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![ALICE, BOB]);
    assert!(first.items.iter().all(|u| u.role == UserRole::Client));
    assert!(first.has_next());
    assert_eq!(first.total_pages(), 3);

    let last = fx
        .users
        .find_page_of_clients(&conn, PageRequest::new(4, 2))
        .unwrap();
    assert_eq!(last.len(), 1);
    assert!(!last.has_next());

    let beyond = fx
        .users
        .find_page_of_clients(&conn, PageRequest::new(10, 2))
        .unwrap();
    assert!(beyond.is_empty());
    assert_eq!(beyond.total, CLIENT_COUNT);
}

#[test]
fn test_page_totals_are_stable() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let request = PageRequest::new(1, 3);
    let a = fx.users.find_page_of_clients(&conn, request).unwrap();
    let b = fx.users.find_page_of_clients(&conn, request).unwrap();

    assert_eq!(a.total, b.total);
    assert_eq!(a, b);
    assert!(a.total >= a.len() as u64);
}

#[test]
fn test_page_inside_caller_transaction() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let tx = conn.unchecked_transaction().unwrap();
    tx.execute("DELETE FROM users WHERE id = ?1", [CAROL]).unwrap();
    let page = fx.users.find_page_of_clients(&tx, PageRequest::new(0, 10)).unwrap();
    assert_eq!(page.total, CLIENT_COUNT - 1);
    assert_eq!(page.len(), 4);
    tx.rollback().unwrap();

    let page = fx.users.find_page_of_clients(&conn, PageRequest::new(0, 10)).unwrap();
    assert_eq!(page.total, CLIENT_COUNT);
}

#[test]
fn test_trainer_clients_with_program_id() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let anna_clients = fx
        .users
        .find_trainer_clients_with_program_id(&conn, ANNA)
        .unwrap();
    assert_eq!(anna_clients.len(), 2);
    let alice = fx.users.find_by_id(&conn, ALICE).unwrap().unwrap();
    let bob = fx.users.find_by_id(&conn, BOB).unwrap().unwrap();
    assert_eq!(anna_clients.get(&alice), Some(&1));
    assert_eq!(anna_clients.get(&bob), Some(&2));

    let ivan_clients = fx
        .users
        .find_trainer_clients_with_program_id(&conn, IVAN)
        .unwrap();
    assert_eq!(ivan_clients.len(), 1);
    assert!(ivan_clients.keys().all(|u| u.id == DAVE));

    assert!(
        fx.users
            .find_trainer_clients_with_program_id(&conn, ADMIN)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn test_trainer_client_without_program_fails() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();
    conn.execute(
        "UPDATE users SET personal_trainer_id = ?1 WHERE id = ?2",
        [ANNA, CAROL],
    )
    .unwrap();

    let err = fx
        .users
        .find_trainer_clients_with_program_id(&conn, ANNA)
        .unwrap_err();
    assert!(matches!(err, DaoError::MissingRow(ref what) if what.contains(&CAROL.to_string())));
}

#[test]
fn test_author_full_name() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    assert_eq!(fx.users.find_author_full_name(&conn, 1).unwrap(), "Anna Petrova");
    assert_eq!(fx.users.find_author_full_name(&conn, 3).unwrap(), "Ivan Sidorov");
    assert!(matches!(
        fx.users.find_author_full_name(&conn, 99),
        Err(DaoError::MissingRow(_))
    ));
}

#[test]
fn test_client_id_and_name_index() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    let index = fx.users.find_client_id_and_name_index(&conn).unwrap();
    assert_eq!(index.len() as u64, CLIENT_COUNT);
    assert_eq!(index.get(&ALICE).map(String::as_str), Some("Alice Smith"));
    assert!(!index.contains_key(&ANNA));
}

#[test]
fn test_is_personal_trainer_needed() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    assert!(fx.users.is_personal_trainer_needed(&conn, ALICE).unwrap());
    assert!(!fx.users.is_personal_trainer_needed(&conn, CAROL).unwrap());

    conn.execute(
        "UPDATE users SET is_personal_trainer_need = 2 WHERE id = ?1",
        [CAROL],
    )
    .unwrap();
    assert!(matches!(
        fx.users.is_personal_trainer_needed(&conn, CAROL),
        Err(DaoError::InvalidValue {
            column: "is_personal_trainer_need",
            value: 2,
        })
    ));

    assert!(matches!(
        fx.users.is_personal_trainer_needed(&conn, 999),
        Err(DaoError::MissingRow(_))
    ));
}

#[test]
fn test_migrate_and_seed_are_idempotent() {
    let fx = common::seeded(1);
    let conn = fx.pool.acquire().unwrap();

    assert!(!migrate(&conn).unwrap());
    let again = seed_demo(&conn, &UserRepository::new().unwrap()).unwrap();
    assert_eq!(again.users, 0);
    assert_eq!(fx.users.find_all(&conn).unwrap().len(), 8);
}
