use diesel::prelude::*;
use crate::db::schema::owner;

#[derive(Debug, Clone, PartialEq, Eq, Queryable, Selectable, Identifiable)]
#[diesel(table_name = owner)]
#[diesel(primary_key(owner_id))]
pub struct OwnerRow {
    pub owner_id: i64,
    pub owner_name: String,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = owner)]
#[diesel(treat_none_as_default_value = false)]
pub struct NewOwner<'a> {
    pub owner_id: i64,
    pub owner_name: &'a str,
    pub owner_email: Option<&'a str>,
}
