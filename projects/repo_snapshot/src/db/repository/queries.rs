use diesel::prelude::*;
use diesel::upsert::excluded;
use thiserror::Error;
use crate::db::{
    repository::models::*,
    schema::{owner, repository},
};

#[derive(Debug, Error)]
pub enum UpsertRepositoryError {
    #[error("UpsertRepository: {source}")]
    UpsertRepository {
        #[from]
        source: diesel::result::Error,
    },
}

pub fn upsert_repository(
    conn: &mut PgConnection,
    new: &NewRepository,
) -> Result<RepositoryRow, UpsertRepositoryError> {
    diesel::insert_into(repository::table)
        .values(new)
        .on_conflict(repository::repo_id)
        .do_update()
        .set((
            repository::owner_id.eq(excluded(repository::owner_id)),
            repository::repo_name.eq(excluded(repository::repo_name)),
            repository::repo_status.eq(excluded(repository::repo_status)),
            repository::repo_stars.eq(excluded(repository::repo_stars)),
        ))
        .returning(RepositoryRow::as_returning())
        .get_result(conn)
        .map_err(|source| UpsertRepositoryError::UpsertRepository { source })
}

#[derive(Debug, Error)]
pub enum GetOwnerRepositoriesError {
    #[error("GetOwnerRepositories: {source}")]
    GetOwnerRepositories {
        #[from]
        source: diesel::result::Error,
    },
}

pub fn get_owner_repositories(
    conn: &mut PgConnection,
    owner_id_val: i64,
) -> Result<Vec<OwnerRepositoryRow>, GetOwnerRepositoriesError> {
    repository::table
        .inner_join(owner::table)
        .filter(owner::owner_id.eq(owner_id_val))
        .order(repository::repo_id.asc())
        .select((
            owner::owner_id,
            owner::owner_name,
            owner::owner_email,
            repository::repo_id,
            repository::repo_name,
            repository::repo_status,
            repository::repo_stars,
        ))
        .load::<OwnerRepositoryRow>(conn)
        .map_err(|source| GetOwnerRepositoriesError::GetOwnerRepositories { source })
}
