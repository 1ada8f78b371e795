use std::error::Error;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Instant;

use gym_dao::{DaoResult, PageRequest, Repository, SeedReport, User, UserRepository, UserRole};
use gym_pool::{Pool, SqliteManager};

pub type CliResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

pub fn migrate(pool: &Pool<SqliteManager>, out: &mut impl Write) -> CliResult<()> {
    let created = pool.with_connection(|conn| gym_dao::migrate(conn))?;
    if created {
        writeln!(out, "schema created")?;
    } else {
        writeln!(out, "schema already up to date")?;
    }
    Ok(())
}

pub fn seed(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    out: &mut impl Write,
) -> CliResult<()> {
    let report = pool.with_connection(|conn| -> DaoResult<SeedReport> {
        gym_dao::migrate(conn)?;
        gym_dao::seed_demo(conn, users)
    })?;
    if report.users == 0 {
        writeln!(out, "database already has users; nothing seeded")?;
    } else {
        writeln!(
            out,
            "seeded {} users and {} training programs",
            report.users, report.programs
        )?;
    }
    Ok(())
}

pub fn clients(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    request: PageRequest,
    out: &mut impl Write,
) -> CliResult<()> {
    let page = pool.with_connection(|conn| users.find_page_of_clients(conn, request))?;
    for user in &page.items {
        writeln!(out, "{:>5}  {:<12} {}", user.id, user.login, user.full_name())?;
    }
    writeln!(
        out,
        "{} of {} clients (offset {}, page {} of {})",
        page.len(),
        page.total,
        page.offset,
        u64::from(page.offset / page.limit.max(1)) + 1,
        page.total_pages().max(1)
    )?;
    Ok(())
}

pub fn client_names(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    out: &mut impl Write,
) -> CliResult<()> {
    let index = pool.with_connection(|conn| users.find_client_id_and_name_index(conn))?;
    let mut entries: Vec<_> = index.into_iter().collect();
    entries.sort_unstable();
    for (id, name) in entries {
        writeln!(out, "{id:>5}  {name}")?;
    }
    Ok(())
}

pub fn check_login(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    login: &str,
    out: &mut impl Write,
) -> CliResult<()> {
    if pool.with_connection(|conn| users.is_login_unique(conn, login))? {
        writeln!(out, "login '{login}' is available")?;
    } else {
        writeln!(out, "login '{login}' is taken")?;
    }
    Ok(())
}

pub fn login(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    login: &str,
    password_hash: &str,
    out: &mut impl Write,
) -> CliResult<()> {
    let found = pool.with_connection(|conn| -> DaoResult<Option<(User, Option<bool>)>> {
        let Some(user) = users.find_by_credentials(conn, login, password_hash)? else {
            return Ok(None);
        };
        let wants_trainer = match user.role {
            UserRole::Client => Some(users.is_personal_trainer_needed(conn, user.id)?),
            _ => None,
        };
        Ok(Some((user, wants_trainer)))
    })?;

    let Some((user, wants_trainer)) = found else {
        return Err(format!("invalid login or password for '{login}'").into());
    };
    writeln!(out, "{} {} ({}) id={}", user.role, user.full_name(), user.login, user.id)?;
    if let Some(wants_trainer) = wants_trainer {
        writeln!(out, "personal trainer requested: {}", if wants_trainer { "yes" } else { "no" })?;
    }
    Ok(())
}

pub fn delete_user(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    id: i32,
    out: &mut impl Write,
) -> CliResult<()> {
    pool.with_connection(|conn| users.delete_by_id(conn, id))?;
    writeln!(out, "deleted user {id}")?;
    Ok(())
}

pub fn trainer_clients(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    trainer_id: i32,
    out: &mut impl Write,
) -> CliResult<()> {
    let rows = pool.with_connection(|conn| -> DaoResult<Vec<(User, i32, String)>> {
        let clients = users.find_trainer_clients_with_program_id(conn, trainer_id)?;
        let mut rows = Vec::with_capacity(clients.len());
        for (client, program_id) in clients {
            let author = users.find_author_full_name(conn, program_id)?;
            rows.push((client, program_id, author));
        }
        rows.sort_by_key(|(client, ..)| client.id);
        Ok(rows)
    })?;

    if rows.is_empty() {
        writeln!(out, "trainer {trainer_id} has no personal clients")?;
    }
    for (client, program_id, author) in rows {
        writeln!(
            out,
            "{:>5}  {:<24} program {} by {}",
            client.id,
            client.full_name(),
            program_id,
            author
        )?;
    }
    Ok(())
}

/// Hammer the pool from `threads` threads, each running `iterations` page
/// queries, and check the pool never lends more than its capacity.
pub fn pool_stress(
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    threads: usize,
    iterations: usize,
    out: &mut impl Write,
) -> CliResult<()> {
    let peak = AtomicUsize::new(0);
    let peak_seen = &peak;
    let started = Instant::now();

    thread::scope(|scope| -> CliResult<()> {
        let mut workers = Vec::with_capacity(threads);
        for _ in 0..threads {
            workers.push(scope.spawn(move || -> DaoResult<()> {
                for i in 0..iterations {
                    pool.with_connection(|conn| {
                        peak_seen.fetch_max(pool.state().lent, Ordering::Relaxed);
                        users
                            .find_page_of_clients(conn, PageRequest::new((i % 5) as u32, 5))
                            .map(|_| ())
                    })?;
                }
                Ok(())
            }));
        }

        for worker in workers {
            worker.join().map_err(|_| "stress worker panicked")??;
        }
        Ok(())
    })?;

    let elapsed = started.elapsed();
    let operations = threads * iterations;
    let peak = peak.load(Ordering::Relaxed);
    let state = pool.state();
    tracing::info!(operations, ?elapsed, peak, "pool stress finished");

    writeln!(
        out,
        "{} operations on {} threads in {:?} ({:.0} ops/s)",
        operations,
        threads,
        elapsed,
        operations as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    )?;
    writeln!(
        out,
        "peak lent {} of {}; now idle {}, lent {}, waiting {}",
        peak, state.capacity, state.idle, state.lent, state.waiters
    )?;

    if peak > state.capacity {
        return Err(format!("pool lent {peak} connections with capacity {}", state.capacity).into());
    }
    Ok(())
}
