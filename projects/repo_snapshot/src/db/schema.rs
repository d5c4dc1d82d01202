// Kept in sync by hand with `SCHEMA_SQL` in `db/mod.rs`.

diesel::table! {
    owner (owner_id) {
        owner_id -> Int8,
        owner_name -> Text,
        owner_email -> Nullable<Text>,
    }
}

diesel::table! {
    repository (repo_id) {
        repo_id -> Int8,
        owner_id -> Int8,
        repo_name -> Text,
        repo_status -> Text,
        repo_stars -> Int4,
    }
}

diesel::joinable!(repository -> owner (owner_id));

diesel::allow_tables_to_appear_in_same_query!(
    owner,
    repository,
);
