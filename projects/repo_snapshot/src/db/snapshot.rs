use diesel::prelude::*;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::db::{
    owner::{models::NewOwner, queries::*},
    repository::{
        models::{NewRepository, OwnerRepositoryRow},
        queries::*,
    },
    PgPool,
};
use crate::utils::normalize::Snapshot;

#[derive(Debug, Error)]
pub enum StoreSnapshotError {
    #[error("UpsertOwner: {source}")]
    UpsertOwner {
        #[from]
        source: UpsertOwnerError,
    },
    #[error("UpsertRepository {repo_id}: {source}")]
    UpsertRepository {
        repo_id: i64,
        source: UpsertRepositoryError,
    },
    #[error("GetOwnerRepositories: {source}")]
    GetOwnerRepositories {
        #[from]
        source: GetOwnerRepositoriesError,
    },
    #[error("Transaction: {source}")]
    Transaction {
        #[from]
        source: diesel::result::Error,
    },
}

/// Upserts the owner and every repository, then reads back the owner's
/// joined rows, all in one transaction. Any error rolls back both tables.
pub fn store_snapshot(
    conn: &mut PgConnection,
    snapshot: &Snapshot,
) -> Result<Vec<OwnerRepositoryRow>, StoreSnapshotError> {
    conn.transaction::<_, StoreSnapshotError, _>(|conn| {
        let owner = upsert_owner(
            conn,
            &NewOwner {
                owner_id: snapshot.owner.id,
                owner_name: &snapshot.owner.name,
                owner_email: snapshot.owner.email.as_deref(),
            },
        )?;

        for repo in &snapshot.repositories {
            let new = NewRepository {
                repo_id: repo.id,
                owner_id: owner.owner_id,
                repo_name: &repo.name,
                repo_status: repo.visibility.as_str(),
                repo_stars: repo.star_count,
            };
            upsert_repository(conn, &new).map_err(|source| {
                StoreSnapshotError::UpsertRepository {
                    repo_id: repo.id,
                    source,
                }
            })?;
        }

        let rows = get_owner_repositories(conn, owner.owner_id)?;
        debug!(
            owner_id = owner.owner_id,
            upserted = snapshot.repositories.len(),
            joined = rows.len(),
            "stored snapshot"
        );
        Ok(rows)
    })
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("GetConnectionFromPool: {source}")]
    GetConnectionFromPool {
        #[from]
        source: r2d2::Error,
    },
    #[error("StoreSnapshot: {source}")]
    StoreSnapshot {
        #[from]
        source: StoreSnapshotError,
    },
    #[error("BlockingTask: {source}")]
    BlockingTask {
        #[from]
        source: tokio::task::JoinError,
    },
}

#[instrument(skip_all, fields(owner_id = snapshot.owner.id))]
pub async fn persist_snapshot(
    pool: &PgPool,
    snapshot: Snapshot,
) -> Result<Vec<OwnerRepositoryRow>, PersistenceError> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool
            .get()
            .map_err(|source| PersistenceError::GetConnectionFromPool { source })?;
        store_snapshot(&mut conn, &snapshot)
            .map_err(|source| PersistenceError::StoreSnapshot { source })
    })
    .await
    .map_err(|source| PersistenceError::BlockingTask { source })?
}
