use diesel::prelude::*;
use diesel::upsert::excluded;
use thiserror::Error;
use crate::db::{owner::models::*, schema::owner};

#[derive(Debug, Error)]
pub enum UpsertOwnerError {
    #[error("UpsertOwner: {source}")]
    UpsertOwner {
        #[from]
        source: diesel::result::Error,
    },
}

pub fn upsert_owner(
    conn: &mut PgConnection,
    new: &NewOwner,
) -> Result<OwnerRow, UpsertOwnerError> {
    diesel::insert_into(owner::table)
        .values(new)
        .on_conflict(owner::owner_id)
        .do_update()
        .set((
            owner::owner_name.eq(excluded(owner::owner_name)),
            owner::owner_email.eq(excluded(owner::owner_email)),
        ))
        .returning(OwnerRow::as_returning())
        .get_result(conn)
        .map_err(|source| UpsertOwnerError::UpsertOwner { source })
}

#[derive(Debug, Error)]
pub enum GetOwnerError {
    #[error("GetOwner: {source}")]
    GetOwner {
        #[from]
        source: diesel::result::Error,
    },
}

pub fn get_owner(
    conn: &mut PgConnection,
    owner_id_val: i64,
) -> Result<Option<OwnerRow>, GetOwnerError> {
    owner::table
        .find(owner_id_val)
        .select(OwnerRow::as_select())
        .first(conn)
        .optional()
        .map_err(|source| GetOwnerError::GetOwner { source })
}
