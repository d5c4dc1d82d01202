use diesel::prelude::*;
use crate::db::schema::repository;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = repository)]
#[diesel(primary_key(repo_id))]
pub struct RepositoryRow {
    pub repo_id: i64,
    pub owner_id: i64,
    pub repo_name: String,
    pub repo_status: String,
    pub repo_stars: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = repository)]
pub struct NewRepository<'a> {
    pub repo_id: i64,
    pub owner_id: i64,
    pub repo_name: &'a str,
    pub repo_status: &'a str,
    pub repo_stars: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Queryable)]
pub struct OwnerRepositoryRow {
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_email: Option<String>,
    pub repo_id: i64,
    pub repo_name: String,
    pub repo_status: String,
    pub repo_stars: i32,
}
