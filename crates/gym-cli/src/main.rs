mod commands;
mod logging;

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gym_dao::{PageRequest, UserRepository};
use gym_pool::{DbConfig, Pool, SqliteManager};

use crate::commands::CliResult;
use crate::logging::{LogFormat, init_logging};

#[derive(Parser, Debug)]
#[command(name = "gym")]
#[command(about = "Query and maintain the gym database through its connection pool")]
#[command(version)]
struct Cli {
    /// Read database settings from this TOML file instead of the environment
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Database file; overrides DATABASE_URL
    #[arg(long, global = true)]
    database: Option<String>,

    /// Number of pooled connections; overrides DB_POOL_SIZE
    #[arg(long, global = true)]
    pool_size: Option<usize>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the tables if they do not exist yet
    Migrate,
    /// Create the tables and load demo users into an empty database
    Seed,
    /// List one page of clients
    Clients {
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },
    /// Print every client id with its full name
    ClientNames,
    /// Tell whether a login is still free
    CheckLogin { login: String },
    /// Look a user up by login and password hash
    Login {
        login: String,
        /// Hex-encoded SHA-256 of the password
        password_hash: String,
    },
    /// Delete one user by id
    DeleteUser { id: i32 },
    /// List a trainer's personal clients with their training programs
    TrainerClients { trainer_id: i32 },
    /// Run concurrent queries against the pool and report throughput
    PoolStress {
        #[arg(long, default_value_t = 8)]
        threads: usize,
        #[arg(long, default_value_t = 100)]
        iterations: usize,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    let config = load_config(&cli)?;
    tracing::info!(
        url = %config.url,
        pool_size = config.pool_size,
        "opening database"
    );
    let pool = config.connect_sqlite()?;
    let users = UserRepository::new()?;

    let mut stdout = io::stdout().lock();
    let result = execute(cli.command, &pool, &users, &mut stdout);
    stdout.flush()?;

    let report = pool.shutdown();
    if report.failed > 0 || report.still_lent > 0 {
        tracing::warn!(
            failed = report.failed,
            still_lent = report.still_lent,
            "pool did not shut down cleanly"
        );
    }
    result
}

fn load_config(cli: &Cli) -> CliResult<DbConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let source = fs::read_to_string(path)
                .map_err(|err| format!("cannot read {}: {}", path.display(), err))?;
            DbConfig::from_toml_str(&source)?
        }
        None => DbConfig::from_env()?,
    };

    if let Some(url) = &cli.database {
        config.url = url.clone();
    }
    if let Some(size) = cli.pool_size {
        config.pool_size = size;
    }
    config.validate()?;
    Ok(config)
}

fn execute(
    command: Commands,
    pool: &Pool<SqliteManager>,
    users: &UserRepository,
    out: &mut impl Write,
) -> CliResult<()> {
    match command {
        Commands::Migrate => commands::migrate(pool, out),
        Commands::Seed => commands::seed(pool, users, out),
        Commands::Clients { offset, limit } => {
            commands::clients(pool, users, PageRequest::new(offset, limit), out)
        }
        Commands::ClientNames => commands::client_names(pool, users, out),
        Commands::CheckLogin { login } => commands::check_login(pool, users, &login, out),
        Commands::Login {
            login,
            password_hash,
        } => commands::login(pool, users, &login, &password_hash, out),
        Commands::DeleteUser { id } => commands::delete_user(pool, users, id, out),
        Commands::TrainerClients { trainer_id } => {
            commands::trainer_clients(pool, users, trainer_id, out)
        }
        Commands::PoolStress {
            threads,
            iterations,
        } => commands::pool_stress(pool, users, threads, iterations, out),
    }
}
