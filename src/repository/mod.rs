mod embedded;
#[cfg(test)]
pub mod memory;

use embedded::migrations;

use async_trait::async_trait;
use deadpool_postgres::{
    Config, ManagerConfig, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime, SslMode,
    Timeouts,
};
use tokio_postgres::{NoTls, Row};

use std::time::Duration;

use crate::{
    config::DatabaseConfig,
    models::{NewNote, Note},
};

/// Any failure executing or decoding a statement. Surfaces to clients as 500.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Failed to acquire database connection: {0}")]
    Pool(#[from] PoolError),

    #[error("Database statement failed: {0}")]
    Query(#[from] tokio_postgres::Error),
}

/// Startup failures. All of them abort the process.
#[derive(Debug, thiserror::Error)]
pub enum ConnectivityError {
    #[error("Unsupported sslmode '{0}'")]
    SslMode(String),

    #[error("Failed to build connection pool: {0}")]
    CreatePool(#[from] deadpool_postgres::CreatePoolError),

    #[error("Database liveness probe failed: {0}")]
    Probe(#[from] PersistenceError),

    #[error("Database liveness probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    #[error("Failed to acquire connection for migrations: {0}")]
    MigrationConnection(PoolError),

    #[error("Failed to migrate database: {0}")]
    Migration(#[from] refinery::Error),
}

/// All database access goes through this trait, so handlers can be driven
/// against any store.
#[async_trait]
pub trait NoteGateway: Send + Sync {
    /// Persists a note with database-assigned id and timestamps, handing back
    /// the submitted fields unchanged.
    async fn insert(&self, note: NewNote) -> Result<NewNote, PersistenceError>;

    /// Every row, in whatever order the database yields them. Soft-deleted
    /// rows are not filtered.
    async fn list_all(&self) -> Result<Vec<Note>, PersistenceError>;
}

const INSERT_NOTE: &str = "INSERT INTO notes(title, description, created_at, updated_at, deleted_at) \
                           VALUES($1, $2, now(), now(), null)";

// Casts let tables created with SERIAL/TIMESTAMP columns decode as well.
const SELECT_NOTES: &str = "SELECT id::bigint AS id, title, description, \
                            created_at::timestamptz AS created_at, \
                            updated_at::timestamptz AS updated_at, \
                            deleted_at::timestamptz AS deleted_at FROM notes";

/// `PostgreSQL` gateway backed by a connection pool shared by all requests.
#[derive(Clone)]
pub struct Repository {
    pool: Pool,
    probe_timeout: Duration,
}

impl Repository {
    /// Builds the pool and verifies it with a liveness probe.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectivityError> {
        let repo = Self {
            pool: build_pool(config)?,
            probe_timeout: config.connect_timeout,
        };
        repo.ping().await?;

        tracing::info!(
            "Database pool created and verified: {}@{}:{}/{}, max_size={}",
            config.user,
            config.host,
            config.port,
            config.dbname,
            config.pool_size
        );

        Ok(repo)
    }

    /// Round-trips `SELECT 1` on a pooled connection.
    pub async fn ping(&self) -> Result<(), ConnectivityError> {
        let probe = async {
            let client = self.pool.get().await?;
            client.simple_query("SELECT 1").await?;
            Ok::<(), PersistenceError>(())
        };

        match tokio::time::timeout(self.probe_timeout, probe).await {
            Ok(result) => result.map_err(Into::into),
            Err(_) => Err(ConnectivityError::ProbeTimeout(self.probe_timeout)),
        }
    }

    pub async fn migrate(&self) -> Result<(), ConnectivityError> {
        let mut client = self
            .pool
            .get()
            .await
            .map_err(ConnectivityError::MigrationConnection)?;
        let migrations_report = migrations::runner().run_async(&mut **client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }

    pub fn close(&self) {
        self.pool.close();
    }
}

#[async_trait]
impl NoteGateway for Repository {
    async fn insert(&self, note: NewNote) -> Result<NewNote, PersistenceError> {
        let client = self.pool.get().await?;
        client
            .execute(INSERT_NOTE, &[&note.title, &note.description])
            .await?;

        Ok(note)
    }

    async fn list_all(&self) -> Result<Vec<Note>, PersistenceError> {
        let client = self.pool.get().await?;
        let rows = client.query(SELECT_NOTES, &[]).await?;

        rows.iter()
            .map(note_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

/// Pool construction is lazy; nothing connects until the first `get`.
fn build_pool(config: &DatabaseConfig) -> Result<Pool, ConnectivityError> {
    let ssl_mode = ssl_mode(&config.sslmode)
        .ok_or_else(|| ConnectivityError::SslMode(config.sslmode.clone()))?;
    if !matches!(ssl_mode, SslMode::Disable) {
        tracing::warn!(
            "sslmode '{}' requested but no TLS connector is configured, connecting without TLS where allowed",
            config.sslmode
        );
    }

    let mut timeouts = Timeouts::default();
    timeouts.wait = Some(config.connect_timeout);
    timeouts.create = Some(config.connect_timeout);
    timeouts.recycle = Some(config.connect_timeout);

    let mut pool_config = PoolConfig::new(config.pool_size);
    pool_config.timeouts = timeouts;

    let mut cfg = Config::new();
    cfg.host = Some(config.host.clone());
    cfg.port = Some(config.port);
    cfg.user = Some(config.user.clone());
    cfg.password = Some(config.password.clone());
    cfg.dbname = Some(config.dbname.clone());
    cfg.options = config
        .schema
        .as_ref()
        .map(|schema| format!("-c search_path={schema}"));
    cfg.ssl_mode = Some(ssl_mode);
    cfg.connect_timeout = Some(config.connect_timeout);
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.pool = Some(pool_config);

    Ok(cfg.create_pool(Some(Runtime::Tokio1), NoTls)?)
}

fn note_from_row(row: &Row) -> Result<Note, tokio_postgres::Error> {
    Ok(Note {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// Maps a libpq `sslmode` onto the driver's modes.
fn ssl_mode(value: &str) -> Option<SslMode> {
    match value {
        "disable" => Some(SslMode::Disable),
        "allow" | "prefer" => Some(SslMode::Prefer),
        "require" | "verify-ca" | "verify-full" => Some(SslMode::Require),
        _ => None,
    }
}
