//! Authenticated GitHub REST reads: the current user and the repositories
//! they own.

pub mod index;

pub use index::{
    fetch_identity, fetch_owned_repositories, fetch_user_resources, FetchCall, FetchError,
    FetchErrorKind, GitHubApiConfig, RetryPolicy, UserResources,
};
