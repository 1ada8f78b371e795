#![allow(dead_code)]

use gym_dao::{UserRepository, migrate, seed_demo};
use gym_pool::{Pool, PoolConfig, SqliteManager};
use tempfile::TempDir;

// Ids handed out by `seed_demo` on a fresh database.
pub const ADMIN: i32 = 1;
pub const ANNA: i32 = 2;
pub const IVAN: i32 = 3;
pub const ALICE: i32 = 4;
pub const BOB: i32 = 5;
pub const CAROL: i32 = 6;
pub const DAVE: i32 = 7;
pub const ERIN: i32 = 8;

pub const CLIENT_COUNT: u64 = 5;

pub struct Fixture {
    pub pool: Pool<SqliteManager>,
    pub users: UserRepository,
    _dir: TempDir,
}

/// Migrated, empty database behind a pool of `capacity` connections.
pub fn empty(capacity: usize) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let manager = SqliteManager::file(dir.path().join("gym.db"));
    let pool = Pool::connect(manager, PoolConfig::new(capacity)).unwrap();
    {
        let conn = pool.acquire().unwrap();
        assert!(migrate(&conn).unwrap());
    }
    Fixture {
        pool,
        users: UserRepository::new().unwrap(),
        _dir: dir,
    }
}

/// Like [`empty`], with the demo data loaded.
pub fn seeded(capacity: usize) -> Fixture {
    let fixture = empty(capacity);
    {
        let conn = fixture.pool.acquire().unwrap();
        let report = seed_demo(&conn, &fixture.users).unwrap();
        assert_eq!(report.users, 8);
        assert_eq!(report.programs, 3);
    }
    fixture
}
