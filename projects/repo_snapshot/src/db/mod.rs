pub mod owner;
pub mod repository;
pub mod schema;
pub mod snapshot;

use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::PgConnection;
use thiserror::Error;

use crate::config::DatabaseConfig;

pub type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Idempotent DDL for both tables. Mirrors `schema.rs`.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS owner (
    owner_id    BIGINT PRIMARY KEY,
    owner_name  TEXT NOT NULL,
    owner_email TEXT
);

CREATE TABLE IF NOT EXISTS repository (
    repo_id     BIGINT PRIMARY KEY,
    owner_id    BIGINT NOT NULL REFERENCES owner (owner_id),
    repo_name   TEXT NOT NULL,
    repo_status TEXT NOT NULL CHECK (repo_status IN ('public', 'private')),
    repo_stars  INTEGER NOT NULL CHECK (repo_stars >= 0)
);

CREATE INDEX IF NOT EXISTS repository_owner_id_idx ON repository (owner_id);
"#;

#[derive(Debug, Error)]
pub enum BuildPoolError {
    #[error("BuildPool: {source}")]
    BuildPool {
        #[from]
        source: r2d2::Error,
    },
}

pub fn build_pool(config: &DatabaseConfig) -> Result<PgPool, BuildPoolError> {
    let manager = ConnectionManager::<PgConnection>::new(config.url.expose());
    Pool::builder()
        .max_size(config.pool_size)
        .connection_timeout(config.connection_timeout)
        .build(manager)
        .map_err(|source| BuildPoolError::BuildPool { source })
}

#[derive(Debug, Error)]
pub enum EnsureSchemaError {
    #[error("GetConnectionFromPool: {source}")]
    GetConnectionFromPool {
        #[from]
        source: r2d2::Error,
    },
    #[error("CreateTables: {source}")]
    CreateTables {
        #[from]
        source: diesel::result::Error,
    },
}

pub fn ensure_schema(conn: &mut PgConnection) -> Result<(), EnsureSchemaError> {
    conn.batch_execute(SCHEMA_SQL)
        .map_err(|source| EnsureSchemaError::CreateTables { source })
}

pub fn prepare_database(pool: &PgPool) -> Result<(), EnsureSchemaError> {
    let mut conn = pool
        .get()
        .map_err(|source| EnsureSchemaError::GetConnectionFromPool { source })?;
    ensure_schema(&mut conn)
}
